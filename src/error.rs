//! Error types for the logging pipeline.
use thiserror::Error;

/// Errors surfaced by the logging pipeline.
///
/// Only sink construction reports errors to the caller; steady-state
/// emit failures are contained by the dispatch worker and never reach
/// the log-call site.
#[derive(Error, Debug)]
pub enum LogError {
    /// I/O failure while creating, opening or writing a log target.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A sink was configured with values it cannot operate on.
    #[error("Sink configuration error: {0}")]
    Config(String),

    /// A log event could not be serialized for output.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias used throughout the crate.
pub type LogResult<T> = Result<T, LogError>;

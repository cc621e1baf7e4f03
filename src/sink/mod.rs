//! This module defines the sink contract and the built-in sink
//! implementations: rolling file, in-process debug and OS event log.
pub mod debug;
pub mod event_log;
pub mod rolling_file;

pub use debug::DebugSink;
pub use event_log::EventLogSink;
pub use rolling_file::{RollingFileConfig, RollingFileSink};

use async_trait::async_trait;

use crate::error::LogResult;
use crate::event::{LogEvent, LogLevel};

/// A destination capable of durably or visibly recording log events.
///
/// Emits arrive serialized from the single dispatch worker, so sinks
/// need no internal synchronization for `emit` ordering; state is still
/// kept behind a lock because the owning application may call `flush`
/// or `close` directly while the worker is running.
#[async_trait]
pub trait Sink: Send + Sync {
    /// The sink's own severity floor, applied inside `emit` before any
    /// other work so a sink can carry a stricter threshold than the
    /// dispatcher it is attached to.
    fn min_level(&self) -> LogLevel;

    /// Records one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be written; the dispatch
    /// worker isolates such failures per sink.
    async fn emit(&self, event: &LogEvent) -> LogResult<()>;

    /// Forces any buffered output to durable/visible state.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered output could not be written out.
    async fn flush(&self) -> LogResult<()>;

    /// Releases owned resources. Safe to call multiple times.
    ///
    /// # Errors
    ///
    /// Returns an error if final buffered output could not be written.
    async fn close(&self) -> LogResult<()>;
}

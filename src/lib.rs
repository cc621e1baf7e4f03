//! Structured asynchronous logging pipeline.
//!
//! Producers call [`Logger`] synchronously from any task or thread;
//! events are enriched from ambient [`scope`]s and registered
//! [`Enricher`]s, rendered from their message template, then queued for
//! a single background worker that fans them out to the configured
//! [`Sink`]s. Slow or failing sinks never block or crash a log call.
//!
//! ```no_run
//! use logpipe::{Logger, LogLevel, RollingFileConfig};
//! use serde_json::json;
//!
//! # async fn demo() -> logpipe::LogResult<()> {
//! let logger = Logger::builder()
//!     .minimum_level(LogLevel::Debug)
//!     .source_context("App")
//!     .write_to_file(RollingFileConfig::new("logs"))
//!     .build()?;
//!
//! let _scope = logger.begin_scope(&[("requestId", json!("abc-123"))]);
//! logger.info("Loaded {Count} item(s)", &[("Count", json!(3))]);
//!
//! logger.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod enrich;
pub mod error;
pub mod event;
pub mod logger;
pub mod scope;
pub mod sink;

pub use enrich::{Enricher, StandardEnricher};
pub use error::{LogError, LogResult};
pub use event::{EventId, LogEvent, LogLevel, PropertyMap};
pub use logger::{Logger, LoggerBuilder};
pub use scope::ScopeGuard;
pub use sink::{DebugSink, EventLogSink, RollingFileConfig, RollingFileSink, Sink};

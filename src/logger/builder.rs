//! Fluent assembly of a [`Logger`] from a declarative list of sink and
//! enricher registrations.
use std::sync::Arc;

use super::Logger;
use crate::enrich::{Enricher, StandardEnricher};
use crate::error::LogResult;
use crate::event::LogLevel;
use crate::sink::{DebugSink, EventLogSink, RollingFileConfig, RollingFileSink, Sink};

enum SinkConfig {
    RollingFile(RollingFileConfig),
    Debug(LogLevel),
    EventLog {
        source: String,
        min_level: LogLevel,
        auto_register: bool,
    },
    Custom(Arc<dyn Sink>),
}

/// Builder for a [`Logger`].
///
/// Sinks are described declaratively and constructed in [`build`], so
/// configuration errors (an unreachable log directory, for instance)
/// surface there and nowhere else.
///
/// [`build`]: LoggerBuilder::build
pub struct LoggerBuilder {
    min_level: LogLevel,
    source_context: Option<String>,
    enrichers: Vec<Arc<dyn Enricher>>,
    sinks: Vec<SinkConfig>,
    standard_enricher: bool,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Info,
            source_context: None,
            enrichers: Vec::new(),
            sinks: Vec::new(),
            standard_enricher: true,
        }
    }

    /// Sets the dispatcher-wide severity floor (default `Info`).
    pub fn minimum_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Sets the default source context attached to events that do not
    /// carry their own.
    pub fn source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    /// Registers an enricher; enrichers run in registration order.
    pub fn enrich_with(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    /// Skips the process-identity enricher that is otherwise appended
    /// automatically.
    pub fn without_standard_enricher(mut self) -> Self {
        self.standard_enricher = false;
        self
    }

    pub fn write_to_file(mut self, config: RollingFileConfig) -> Self {
        self.sinks.push(SinkConfig::RollingFile(config));
        self
    }

    pub fn write_to_debug(mut self, min_level: LogLevel) -> Self {
        self.sinks.push(SinkConfig::Debug(min_level));
        self
    }

    pub fn write_to_event_log(
        mut self,
        source: impl Into<String>,
        min_level: LogLevel,
        auto_register: bool,
    ) -> Self {
        self.sinks.push(SinkConfig::EventLog {
            source: source.into(),
            min_level,
            auto_register,
        });
        self
    }

    /// Registers a caller-constructed sink.
    pub fn add_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(SinkConfig::Custom(sink));
        self
    }

    /// Constructs every configured sink and starts the dispatcher.
    ///
    /// Must be called within a Tokio runtime; the dispatch worker is
    /// spawned immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if any sink fails to open its target resource.
    pub fn build(self) -> LogResult<Logger> {
        let mut sinks: Vec<Arc<dyn Sink>> = Vec::with_capacity(self.sinks.len());
        for config in self.sinks {
            sinks.push(match config {
                SinkConfig::RollingFile(config) => Arc::new(RollingFileSink::new(config)?),
                SinkConfig::Debug(min_level) => Arc::new(DebugSink::new(min_level)),
                SinkConfig::EventLog {
                    source,
                    min_level,
                    auto_register,
                } => Arc::new(EventLogSink::new(source, min_level, auto_register)),
                SinkConfig::Custom(sink) => sink,
            });
        }

        let mut enrichers = self.enrichers;
        if self.standard_enricher {
            enrichers.push(Arc::new(StandardEnricher::new()));
        }

        Ok(Logger::start(
            sinks,
            enrichers,
            self.min_level,
            self.source_context,
        ))
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

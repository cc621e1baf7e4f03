//! In-process debug sink: forwards events into the `tracing` ecosystem
//! so they show up in whatever subscriber the host application installs.
use async_trait::async_trait;

use super::Sink;
use crate::error::LogResult;
use crate::event::{LogEvent, LogLevel};

const TARGET: &str = "logpipe::debug";

/// Sink that mirrors events to the host's diagnostic stream.
pub struct DebugSink {
    min_level: LogLevel,
}

impl DebugSink {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for DebugSink {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

#[async_trait]
impl Sink for DebugSink {
    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    async fn emit(&self, event: &LogEvent) -> LogResult<()> {
        if event.level < self.min_level {
            return Ok(());
        }
        let mut text = format!("[{}] {}", event.level, event.rendered_message);
        if let Some(error) = &event.error {
            text.push('\n');
            text.push_str(error);
        }
        match event.level {
            LogLevel::Trace => tracing::trace!(target: TARGET, "{}", text),
            LogLevel::Debug => tracing::debug!(target: TARGET, "{}", text),
            LogLevel::Info => tracing::info!(target: TARGET, "{}", text),
            LogLevel::Warn => tracing::warn!(target: TARGET, "{}", text),
            LogLevel::Error | LogLevel::Fatal => tracing::error!(target: TARGET, "{}", text),
        }
        Ok(())
    }

    async fn flush(&self) -> LogResult<()> {
        Ok(())
    }

    async fn close(&self) -> LogResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PropertyMap;
    use chrono::Local;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedWriter {
        type Writer = SharedWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn event(level: LogLevel, message: &str) -> LogEvent {
        LogEvent {
            timestamp: Local::now(),
            level,
            source_context: None,
            message_template: message.to_string(),
            rendered_message: message.to_string(),
            error: None,
            event_id: None,
            properties: PropertyMap::new(),
        }
    }

    #[tokio::test]
    async fn test_forwards_events_at_or_above_min_level() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(SharedWriter(buffer.clone()))
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let sink = DebugSink::new(LogLevel::Warn);
        sink.emit(&event(LogLevel::Info, "too quiet")).await.unwrap();
        sink.emit(&event(LogLevel::Warn, "loud enough")).await.unwrap();

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(output.contains("[Warn] loud enough"));
        assert!(!output.contains("too quiet"));
    }
}

//! The dispatcher: accepts log calls from any task, enriches and
//! renders synchronously, then hands events to a queue drained by one
//! dedicated background worker that fans out to every sink.
mod builder;
mod worker;

pub use builder::LoggerBuilder;

use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::enrich::Enricher;
use crate::event::{render_template, EventId, LogEvent, LogLevel, PropertyMap};
use crate::scope::{self, ScopeGuard};
use crate::sink::Sink;
use worker::WorkerItem;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle to a running logging pipeline.
///
/// Cheap to clone; all clones feed the same queue and worker. Logging
/// calls are synchronous and fire-and-forget: enrichment and rendering
/// happen on the calling task, only the enqueue crosses into the worker.
/// Sink failures never propagate back to the call site.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
    source_context: Option<String>,
}

struct Inner {
    min_level: LogLevel,
    enrichers: Vec<Arc<dyn Enricher>>,
    sinks: Vec<Arc<dyn Sink>>,
    queue: Mutex<Option<mpsc::UnboundedSender<WorkerItem>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub(crate) fn start(
        sinks: Vec<Arc<dyn Sink>>,
        enrichers: Vec<Arc<dyn Enricher>>,
        min_level: LogLevel,
        source_context: Option<String>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(worker::run(queue_rx, sinks.clone()));
        Self {
            inner: Arc::new(Inner {
                min_level,
                enrichers,
                sinks,
                queue: Mutex::new(Some(queue_tx)),
                worker: Mutex::new(Some(handle)),
            }),
            source_context,
        }
    }

    pub fn min_level(&self) -> LogLevel {
        self.inner.min_level
    }

    /// Returns a handle sharing this pipeline but stamping events with a
    /// different default source context. Intended for per-component
    /// loggers handed out by the application root.
    pub fn for_source(&self, context: impl Into<String>) -> Logger {
        Logger {
            inner: self.inner.clone(),
            source_context: Some(context.into()),
        }
    }

    /// Core log call.
    ///
    /// Returns immediately when the level is below the dispatcher's
    /// floor, before any property allocation. Otherwise the event is
    /// built, enriched from active scopes then registered enrichers,
    /// rendered, and queued. Calls after shutdown are dropped silently.
    pub fn log(
        &self,
        level: LogLevel,
        template: &str,
        error: Option<&dyn Display>,
        event_id: Option<EventId>,
        properties: Option<PropertyMap>,
        source_context: Option<&str>,
    ) {
        if level < self.inner.min_level {
            return;
        }

        let mut event = LogEvent {
            timestamp: Local::now(),
            level,
            source_context: source_context
                .map(str::to_string)
                .or_else(|| self.source_context.clone()),
            message_template: template.to_string(),
            rendered_message: String::new(),
            error: error.map(|e| e.to_string()),
            event_id,
            properties: properties.unwrap_or_default(),
        };

        scope::enrich_into(&mut event);
        for enricher in &self.inner.enrichers {
            enricher.enrich(&mut event);
        }
        event.rendered_message = render_template(&event.message_template, &event.properties);

        self.enqueue(WorkerItem::Event(event));
    }

    pub fn trace(&self, template: &str, properties: &[(&str, Value)]) {
        self.log(LogLevel::Trace, template, None, None, pairs(properties), None);
    }

    pub fn debug(&self, template: &str, properties: &[(&str, Value)]) {
        self.log(LogLevel::Debug, template, None, None, pairs(properties), None);
    }

    pub fn info(&self, template: &str, properties: &[(&str, Value)]) {
        self.log(LogLevel::Info, template, None, None, pairs(properties), None);
    }

    pub fn warn(&self, template: &str, properties: &[(&str, Value)]) {
        self.log(LogLevel::Warn, template, None, None, pairs(properties), None);
    }

    pub fn error(&self, template: &str, error: Option<&dyn Display>, properties: &[(&str, Value)]) {
        self.log(LogLevel::Error, template, error, None, pairs(properties), None);
    }

    pub fn fatal(&self, template: &str, error: Option<&dyn Display>, properties: &[(&str, Value)]) {
        self.log(LogLevel::Fatal, template, error, None, pairs(properties), None);
    }

    /// Pushes name/value pairs onto the ambient scope stack for the
    /// current call chain; every event emitted while the returned guard
    /// lives carries them.
    pub fn begin_scope(&self, properties: &[(&str, Value)]) -> ScopeGuard {
        scope::push(PropertyMap::from_pairs(properties))
    }

    /// Like [`begin_scope`](Logger::begin_scope) but takes a prepared map.
    pub fn begin_scope_map(&self, properties: PropertyMap) -> ScopeGuard {
        scope::push(properties)
    }

    /// Best-effort flush: waits for the queue to drain up to a bounded
    /// timeout, then makes sure every sink has flushed. Never blocks
    /// forever.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        let sent = {
            let queue = self.inner.queue.lock().unwrap();
            match queue.as_ref() {
                Some(tx) => tx.send(WorkerItem::Flush(ack_tx)).is_ok(),
                None => false,
            }
        };

        let drained = sent && matches!(timeout(FLUSH_TIMEOUT, ack_rx).await, Ok(Ok(())));
        if !drained {
            // The worker is gone or wedged; flush the sinks directly.
            for sink in &self.inner.sinks {
                let _ = sink.flush().await;
            }
        }
    }

    /// Stops accepting new events, drains the worker up to a bounded
    /// timeout, then flushes and closes every sink. Idempotent, and
    /// teardown failures are swallowed: a logging pipeline must not
    /// crash its host on the way out.
    pub async fn shutdown(&self) {
        let queue = self.inner.queue.lock().unwrap().take();
        drop(queue);

        let handle = self.inner.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = timeout(SHUTDOWN_TIMEOUT, handle).await;
        }

        for sink in &self.inner.sinks {
            let _ = sink.flush().await;
            let _ = sink.close().await;
        }
    }

    fn enqueue(&self, item: WorkerItem) {
        let queue = self.inner.queue.lock().unwrap();
        if let Some(tx) = queue.as_ref() {
            // A closed queue means shutdown already ran; drop the event.
            let _ = tx.send(item);
        }
    }
}

fn pairs(properties: &[(&str, Value)]) -> Option<PropertyMap> {
    if properties.is_empty() {
        None
    } else {
        Some(PropertyMap::from_pairs(properties))
    }
}

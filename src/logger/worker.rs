//! Single-consumer fan-out loop draining the dispatch queue.
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::error;

use crate::event::LogEvent;
use crate::sink::Sink;

/// Items flowing through the dispatch queue. Flush markers ride the
/// same channel as events, so reaching one proves every earlier event
/// has already been fanned out.
pub(crate) enum WorkerItem {
    Event(LogEvent),
    Flush(oneshot::Sender<()>),
}

/// Runs until the queue is closed and drained, then flushes every sink
/// so buffered output survives an implicit teardown.
///
/// A sink failure is contained to that sink and that event: it is
/// reported to the diagnostic stream and delivery continues with the
/// remaining sinks.
pub(crate) async fn run(mut queue: mpsc::UnboundedReceiver<WorkerItem>, sinks: Vec<Arc<dyn Sink>>) {
    while let Some(item) = queue.recv().await {
        match item {
            WorkerItem::Event(event) => {
                for sink in &sinks {
                    if let Err(e) = sink.emit(&event).await {
                        error!("Log sink failed to emit event: {}", e);
                    }
                }
            }
            WorkerItem::Flush(ack) => {
                for sink in &sinks {
                    if let Err(e) = sink.flush().await {
                        error!("Log sink failed to flush: {}", e);
                    }
                }
                let _ = ack.send(());
            }
        }
    }

    for sink in &sinks {
        if let Err(e) = sink.flush().await {
            error!("Log sink failed to flush during teardown: {}", e);
        }
    }
}

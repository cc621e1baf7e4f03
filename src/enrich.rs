//! Enrichers attach derived or contextual properties to an event before
//! it is queued for dispatch.
use serde_json::json;

use crate::event::LogEvent;

/// A capability that mutates an event's property map before dispatch.
///
/// Enrichers run on the producing task, after scope enrichment and in
/// registration order, so later enrichers may overwrite keys set by
/// earlier ones or by active scopes.
pub trait Enricher: Send + Sync {
    fn enrich(&self, event: &mut LogEvent);
}

/// Attaches static process identity facts to every event: machine name,
/// user name, process id and the producing thread's id. Useful for
/// correlating logs across multiple processes or instances.
pub struct StandardEnricher {
    machine: String,
    user: String,
    process_id: u32,
}

impl StandardEnricher {
    pub fn new() -> Self {
        Self {
            machine: env_or("HOSTNAME", "COMPUTERNAME"),
            user: env_or("USER", "USERNAME"),
            process_id: std::process::id(),
        }
    }
}

impl Default for StandardEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl Enricher for StandardEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        event.properties.insert("machine", json!(self.machine));
        event.properties.insert("user", json!(self.user));
        event.properties.insert("processId", json!(self.process_id));
        event
            .properties
            .insert("threadId", json!(thread_id_text()));
    }
}

fn env_or(primary: &str, fallback: &str) -> String {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn thread_id_text() -> String {
    // ThreadId has no stable numeric accessor; its Debug form
    // ("ThreadId(N)") is reduced to the bare number.
    let raw = format!("{:?}", std::thread::current().id());
    raw.trim_start_matches("ThreadId(")
        .trim_end_matches(')')
        .to_string()
}

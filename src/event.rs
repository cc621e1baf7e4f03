//! Core log event primitives: severity levels, event identifiers, the
//! insertion-ordered property map and the log event record itself.
use chrono::{DateTime, Local};
use serde_json::Value;
use std::fmt;

/// Severity of a log event, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        };
        f.write_str(name)
    }
}

/// Optional numeric identifier attached to a log event, with an
/// optional symbolic name for readability in rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventId {
    pub id: u32,
    pub name: Option<String>,
}

impl EventId {
    pub fn new(id: u32) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if !name.is_empty() => write!(f, "{}:{}", self.id, name),
            _ => write!(f, "{}", self.id),
        }
    }
}

/// An insertion-ordered string-to-value map with case-insensitive keys.
///
/// Later inserts with an existing key overwrite the value but keep the
/// position and casing of the first insertion, so output formats see
/// properties in the order callers (and scopes/enrichers) supplied them.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: Vec<(String, Value)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from name/value pairs, applying last-write-wins on
    /// duplicate keys.
    pub fn from_pairs(pairs: &[(&str, Value)]) -> Self {
        let mut map = Self::new();
        for (key, value) in pairs {
            map.insert(*key, value.clone());
        }
        map
    }

    /// Inserts a value, replacing any existing entry whose key matches
    /// case-insensitively.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&key))
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

/// A single log event, immutable once it leaves the producing call.
///
/// Events are built, enriched and rendered synchronously on the caller
/// side, then handed by value to the dispatch queue.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    /// Logical component that produced the event, e.g. `"ServerList"`.
    pub source_context: Option<String>,
    /// Raw message template with `{Key}` placeholders.
    pub message_template: String,
    /// Template with placeholders substituted from the properties,
    /// computed once before the event is queued.
    pub rendered_message: String,
    /// Full text of a captured error, opaque to the pipeline.
    pub error: Option<String>,
    pub event_id: Option<EventId>,
    pub properties: PropertyMap,
}

/// Substitutes `{Key}` placeholders in `template` from `properties`.
///
/// Placeholders are matched against the stored key text exactly; tokens
/// with no matching property are left untouched.
pub(crate) fn render_template(template: &str, properties: &PropertyMap) -> String {
    if template.is_empty() || properties.is_empty() {
        return template.to_string();
    }
    let mut rendered = template.to_string();
    for (key, value) in properties.iter() {
        let token = format!("{{{}}}", key);
        if rendered.contains(&token) {
            rendered = rendered.replace(&token, &format_value(value));
        }
    }
    rendered
}

/// Renders a property value as bare text: strings unquoted, null empty,
/// everything else as compact JSON.
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_event_id_display() {
        assert_eq!(EventId::new(7).to_string(), "7");
        assert_eq!(EventId::named(7, "Connect").to_string(), "7:Connect");
    }

    #[test]
    fn test_property_map_last_write_wins_case_insensitive() {
        let mut map = PropertyMap::new();
        map.insert("Count", json!(1));
        map.insert("user", json!("alice"));
        map.insert("COUNT", json!(2));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("count"), Some(&json!(2)));

        // The first-inserted key keeps its position and casing.
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Count", "user"]);
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let mut props = PropertyMap::new();
        props.insert("Count", json!(3));
        let rendered = render_template("Loaded {Count} item(s)", &props);
        assert_eq!(rendered, "Loaded 3 item(s)");
    }

    #[test]
    fn test_render_leaves_unmatched_placeholder() {
        let mut props = PropertyMap::new();
        props.insert("Other", json!("x"));
        let rendered = render_template("Loaded {Count} item(s)", &props);
        assert_eq!(rendered, "Loaded {Count} item(s)");
    }

    #[test]
    fn test_render_value_formatting() {
        let mut props = PropertyMap::new();
        props.insert("name", json!("alice"));
        props.insert("ok", json!(true));
        props.insert("none", json!(null));
        let rendered = render_template("{name} {ok} [{none}]", &props);
        assert_eq!(rendered, "alice true []");
    }
}

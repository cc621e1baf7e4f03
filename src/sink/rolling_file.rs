//! Rolling file sink: line-oriented text or single-line JSON records in
//! day- and size-partitioned files with retention pruning.
//!
//! Files are named `{prefix}-{YYYYMMDD}.log`; when a file reaches the
//! configured size cap, writing continues in `{prefix}-{YYYYMMDD}_{seq:03}.log`
//! with the next unused sequence number. Day and size partitioning keep
//! individual files bounded for tailing and shipping, while retention
//! pruning bounds total disk usage.
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{Local, SecondsFormat};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::Sink;
use crate::error::LogResult;
use crate::event::{format_value, LogEvent, LogLevel};

const DATE_TOKEN_FORMAT: &str = "%Y%m%d";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration for a [`RollingFileSink`].
#[derive(Debug, Clone)]
pub struct RollingFileConfig {
    /// Directory receiving the log files; created if missing.
    pub directory: PathBuf,
    /// File name prefix, e.g. `"app"`.
    pub prefix: String,
    pub min_level: LogLevel,
    /// Write one compact JSON object per line instead of text.
    pub json: bool,
    /// Size threshold that triggers a sequence roll; 0 disables
    /// size-based rolling.
    pub max_bytes: u64,
    /// Files older than this horizon are deleted at construction; <= 0
    /// disables pruning.
    pub retention_days: i64,
}

impl RollingFileConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: "app".to_string(),
            min_level: LogLevel::Info,
            json: false,
            max_bytes: 5 * 1024 * 1024,
            retention_days: 14,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }
}

struct OpenFile {
    file: File,
    path: PathBuf,
    date_token: String,
}

struct State {
    open: Option<OpenFile>,
    closed: bool,
}

/// Sink that appends formatted events to rolling files.
pub struct RollingFileSink {
    config: RollingFileConfig,
    state: Mutex<State>,
}

impl RollingFileSink {
    /// Creates the target directory, applies retention pruning and opens
    /// (or reuses) today's file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or today's
    /// file cannot be opened; a sink that cannot reach its target is
    /// useless and must not silently no-op.
    pub fn new(config: RollingFileConfig) -> LogResult<Self> {
        fs::create_dir_all(&config.directory)?;
        if config.retention_days > 0 {
            let horizon = Duration::from_secs(config.retention_days as u64 * SECONDS_PER_DAY);
            let cutoff = SystemTime::now()
                .checked_sub(horizon)
                .unwrap_or(SystemTime::UNIX_EPOCH);
            prune_older_than(&config.directory, &config.prefix, cutoff);
        }

        let sink = Self {
            config,
            state: Mutex::new(State {
                open: None,
                closed: false,
            }),
        };
        let today = sink.open_for_today(false)?;
        sink.state.lock().unwrap().open = Some(today);
        Ok(sink)
    }

    /// Finds today's write target: the existing unsuffixed (or lowest
    /// sequence) file while it is under the size cap, otherwise the next
    /// unused sequence number. With `force_new_sequence` an existing
    /// file is never reused, so a just-filled file is left behind.
    fn open_for_today(&self, force_new_sequence: bool) -> LogResult<OpenFile> {
        let date_token = Local::now().format(DATE_TOKEN_FORMAT).to_string();
        let mut sequence: u32 = 0;
        loop {
            let path = self.make_path(&date_token, sequence);
            match fs::metadata(&path) {
                Err(_) => break self.open_at(path, date_token),
                Ok(meta) => {
                    let under_cap =
                        self.config.max_bytes == 0 || meta.len() < self.config.max_bytes;
                    if under_cap && !force_new_sequence {
                        break self.open_at(path, date_token);
                    }
                    sequence += 1;
                }
            }
        }
    }

    fn open_at(&self, path: PathBuf, date_token: String) -> LogResult<OpenFile> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(OpenFile {
            file,
            path,
            date_token,
        })
    }

    fn make_path(&self, date_token: &str, sequence: u32) -> PathBuf {
        let suffix = if sequence > 0 {
            format!("_{:03}", sequence)
        } else {
            String::new()
        };
        self.config
            .directory
            .join(format!("{}-{}{}.log", self.config.prefix, date_token, suffix))
    }

    fn to_text_line(&self, event: &LogEvent) -> String {
        let mut line = String::with_capacity(256);
        line.push_str(&event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string());
        line.push_str(&format!(" [{}]", event.level));
        if let Some(source) = event.source_context.as_deref() {
            if !source.is_empty() {
                line.push_str(&format!(" {{{}}}", source));
            }
        }
        if let Some(event_id) = &event.event_id {
            line.push_str(&format!(" (Event:{})", event_id));
        }
        if !event.properties.is_empty() {
            line.push_str(" |");
            for (key, value) in event.properties.iter() {
                line.push_str(&format!(" {}={}", key, format_value(value)));
            }
            line.push_str(" |");
        }
        line.push(' ');
        line.push_str(&event.rendered_message);
        if let Some(error) = &event.error {
            line.push('\n');
            line.push_str(error);
        }
        line
    }

    fn to_json_line(&self, event: &LogEvent) -> LogResult<String> {
        #[derive(Serialize)]
        struct JsonLine<'a> {
            ts: String,
            level: String,
            source: Option<&'a str>,
            message: &'a str,
            #[serde(rename = "eventId", skip_serializing_if = "Option::is_none")]
            event_id: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            props: Option<Value>,
            #[serde(skip_serializing_if = "Option::is_none")]
            exception: Option<&'a str>,
        }

        let props = if event.properties.is_empty() {
            None
        } else {
            let map: serde_json::Map<String, Value> = event
                .properties
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect();
            Some(Value::Object(map))
        };

        let line = JsonLine {
            ts: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            level: event.level.to_string(),
            source: event.source_context.as_deref(),
            message: &event.rendered_message,
            event_id: event.event_id.as_ref().map(|id| id.to_string()),
            props,
            exception: event.error.as_deref(),
        };
        Ok(serde_json::to_string(&line)?)
    }
}

#[async_trait]
impl Sink for RollingFileSink {
    fn min_level(&self) -> LogLevel {
        self.config.min_level
    }

    async fn emit(&self, event: &LogEvent) -> LogResult<()> {
        if event.level < self.config.min_level {
            return Ok(());
        }

        let line = if self.config.json {
            self.to_json_line(event)?
        } else {
            self.to_text_line(event)
        };

        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Ok(());
        }

        // Day roll: the open file's date token decides whether it still
        // belongs to "today".
        let today = Local::now().format(DATE_TOKEN_FORMAT).to_string();
        let needs_reopen = match state.open.as_ref() {
            Some(open) => open.date_token != today,
            None => true,
        };
        if needs_reopen {
            state.open = Some(self.open_for_today(false)?);
        }

        // Size roll happens after the write, so a single event may push
        // a file past the cap before the next one lands in a fresh file.
        let mut roll_by_size = false;
        if let Some(open) = state.open.as_mut() {
            writeln!(open.file, "{}", line)?;
            open.file.flush()?;
            if self.config.max_bytes > 0 {
                let written = open.file.metadata()?.len();
                roll_by_size = written >= self.config.max_bytes;
            }
        }
        if roll_by_size {
            state.open = Some(self.open_for_today(true)?);
        }
        Ok(())
    }

    async fn flush(&self) -> LogResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(open) = state.open.as_mut() {
            open.file.flush()?;
        }
        Ok(())
    }

    async fn close(&self) -> LogResult<()> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        if let Some(mut open) = state.open.take() {
            open.file.flush()?;
        }
        Ok(())
    }
}

/// Deletes files matching `{prefix}-*.log` whose last-write time is
/// older than the cutoff. Individual failures are reported to the
/// diagnostic stream and skipped; pruning must never abort construction.
fn prune_older_than(directory: &Path, prefix: &str, cutoff: SystemTime) {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let pattern = format!("{}-", prefix);
    for entry in entries.flatten() {
        let path = entry.path();
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if !name.starts_with(&pattern) || !name.ends_with(".log") {
            continue;
        }
        let modified = match entry.metadata().and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified < cutoff {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to prune old log file {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventId, PropertyMap};
    use serde_json::json;
    use tempfile::TempDir;

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

    fn log_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".log"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_text_line_includes_all_segments() {
        let temp = TempDir::new().unwrap();
        let sink = RollingFileSink::new(RollingFileConfig::new(temp.path())).unwrap();

        let mut ev = event(LogLevel::Info, "Opened");
        ev.source_context = Some("Db".to_string());
        ev.event_id = Some(EventId::named(7, "Open"));
        ev.properties.insert("a", json!(1));
        ev.error = Some("boom".to_string());

        let line = sink.to_text_line(&ev);
        assert!(line.contains(" [Info] {Db} (Event:7:Open) | a=1 | Opened\nboom"));
    }

    #[test]
    fn test_text_line_omits_empty_segments() {
        let temp = TempDir::new().unwrap();
        let sink = RollingFileSink::new(RollingFileConfig::new(temp.path())).unwrap();

        let line = sink.to_text_line(&event(LogLevel::Warn, "plain"));
        assert!(line.ends_with(" [Warn] plain"));
        assert!(!line.contains('{'));
        assert!(!line.contains("(Event:"));
        assert!(!line.contains('|'));
    }

    #[test]
    fn test_json_line_keys() {
        let temp = TempDir::new().unwrap();
        let sink =
            RollingFileSink::new(RollingFileConfig::new(temp.path()).json(true)).unwrap();

        let mut ev = event(LogLevel::Error, "failed");
        ev.properties.insert("count", json!(3));
        ev.error = Some("io error".to_string());
        ev.event_id = Some(EventId::new(42));

        let line = sink.to_json_line(&ev).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], json!("Error"));
        assert_eq!(parsed["source"], json!(null));
        assert_eq!(parsed["message"], json!("failed"));
        assert_eq!(parsed["eventId"], json!("42"));
        assert_eq!(parsed["props"]["count"], json!(3));
        assert_eq!(parsed["exception"], json!("io error"));

        let bare = sink.to_json_line(&event(LogLevel::Info, "ok")).unwrap();
        let parsed: Value = serde_json::from_str(&bare).unwrap();
        assert!(parsed.get("eventId").is_none());
        assert!(parsed.get("props").is_none());
        assert!(parsed.get("exception").is_none());
    }

    #[tokio::test]
    async fn test_size_roll_moves_to_next_sequence() {
        let temp = TempDir::new().unwrap();
        let config = RollingFileConfig::new(temp.path()).max_bytes(64).retention_days(0);
        let sink = RollingFileSink::new(config).unwrap();

        for i in 0..4 {
            sink.emit(&event(
                LogLevel::Info,
                &format!("event number {} with some padding text", i),
            ))
            .await
            .unwrap();
        }

        let names = log_files(temp.path());
        assert!(names.len() >= 2, "expected a size roll, got {:?}", names);
        let date_token = Local::now().format(DATE_TOKEN_FORMAT).to_string();
        assert_eq!(names[0], format!("app-{}.log", date_token));
        assert_eq!(names[1], format!("app-{}_001.log", date_token));
    }

    #[tokio::test]
    async fn test_day_roll_reopens_for_today() {
        let temp = TempDir::new().unwrap();
        let sink =
            RollingFileSink::new(RollingFileConfig::new(temp.path()).retention_days(0)).unwrap();

        // Pretend the open file belongs to an earlier day.
        sink.state
            .lock()
            .unwrap()
            .open
            .as_mut()
            .unwrap()
            .date_token = "19990101".to_string();

        sink.emit(&event(LogLevel::Info, "first of the day"))
            .await
            .unwrap();

        let state = sink.state.lock().unwrap();
        let open = state.open.as_ref().unwrap();
        let date_token = Local::now().format(DATE_TOKEN_FORMAT).to_string();
        assert_eq!(open.date_token, date_token);
        assert!(open
            .path
            .to_string_lossy()
            .ends_with(&format!("app-{}.log", date_token)));
    }

    #[tokio::test]
    async fn test_partial_file_is_reused_across_restarts() {
        let temp = TempDir::new().unwrap();
        let config = RollingFileConfig::new(temp.path()).retention_days(0);

        let sink = RollingFileSink::new(config.clone()).unwrap();
        sink.emit(&event(LogLevel::Info, "before restart")).await.unwrap();
        sink.close().await.unwrap();

        let sink = RollingFileSink::new(config).unwrap();
        sink.emit(&event(LogLevel::Info, "after restart")).await.unwrap();
        sink.close().await.unwrap();

        let names = log_files(temp.path());
        assert_eq!(names.len(), 1);
        let content = fs::read_to_string(temp.path().join(&names[0])).unwrap();
        assert!(content.contains("before restart"));
        assert!(content.contains("after restart"));
    }

    #[tokio::test]
    async fn test_emit_below_min_level_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let config = RollingFileConfig::new(temp.path()).min_level(LogLevel::Warn);
        let sink = RollingFileSink::new(config).unwrap();

        sink.emit(&event(LogLevel::Info, "filtered")).await.unwrap();
        sink.flush().await.unwrap();

        let names = log_files(temp.path());
        let content = fs::read_to_string(temp.path().join(&names[0])).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_prune_deletes_only_matching_files_past_cutoff() {
        let temp = TempDir::new().unwrap();
        let stale = temp.path().join("app-20200101.log");
        let other = temp.path().join("other-20200101.log");
        fs::write(&stale, "old").unwrap();
        fs::write(&other, "keep").unwrap();

        // A cutoff in the future makes every matching file "old".
        let future = SystemTime::now() + Duration::from_secs(SECONDS_PER_DAY);
        prune_older_than(temp.path(), "app", future);

        assert!(!stale.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_fresh_files_survive_construction_pruning() {
        let temp = TempDir::new().unwrap();
        let recent = temp.path().join("app-20260828.log");
        fs::write(&recent, "recent").unwrap();

        let _sink =
            RollingFileSink::new(RollingFileConfig::new(temp.path()).retention_days(14)).unwrap();
        assert!(recent.exists());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_writes() {
        let temp = TempDir::new().unwrap();
        let sink =
            RollingFileSink::new(RollingFileConfig::new(temp.path()).retention_days(0)).unwrap();

        sink.close().await.unwrap();
        sink.close().await.unwrap();
        sink.emit(&event(LogLevel::Info, "late")).await.unwrap();

        let names = log_files(temp.path());
        let content = fs::read_to_string(temp.path().join(&names[0])).unwrap();
        assert!(!content.contains("late"));
    }

    #[test]
    fn test_construction_fails_when_directory_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let result = RollingFileSink::new(RollingFileConfig::new(&blocker));
        assert!(result.is_err());
    }
}

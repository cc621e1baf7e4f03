//! OS event-log sink.
//!
//! On unix targets events are delivered as RFC 3164 datagrams to the
//! local syslog socket; elsewhere they fall back to stderr. Mirrors the
//! operating facility a service manager or log collector already watches,
//! which is why it defaults to a stricter severity floor than file sinks.
use std::sync::Mutex;

use async_trait::async_trait;

use super::Sink;
use crate::error::LogResult;
use crate::event::{LogEvent, LogLevel};

#[cfg(unix)]
use std::os::unix::net::UnixDatagram;

#[cfg(unix)]
const SYSLOG_PATHS: &[&str] = &["/dev/log", "/var/run/syslog"];

// RFC 3164 severities within the `user` facility (1 << 3).
const FACILITY_USER: u8 = 8;
const SEVERITY_ERR: u8 = 3;
const SEVERITY_WARNING: u8 = 4;
const SEVERITY_INFO: u8 = 6;

/// Sink that records events in the operating system's event facility.
pub struct EventLogSink {
    source: String,
    min_level: LogLevel,
    #[cfg(unix)]
    socket: Mutex<Option<UnixDatagram>>,
    #[cfg(not(unix))]
    _socket: Mutex<()>,
}

impl EventLogSink {
    /// Creates the sink. With `auto_register` the connection to the OS
    /// facility is established eagerly; failures are tolerated (the
    /// facility may be absent or permission-restricted) and the sink
    /// retries lazily on emit. Construction itself never fails.
    pub fn new(source: impl Into<String>, min_level: LogLevel, auto_register: bool) -> Self {
        let sink = Self {
            source: source.into(),
            min_level,
            #[cfg(unix)]
            socket: Mutex::new(None),
            #[cfg(not(unix))]
            _socket: Mutex::new(()),
        };
        if auto_register {
            #[cfg(unix)]
            {
                *sink.socket.lock().unwrap() = connect_syslog();
            }
        }
        sink
    }

    fn format_message(&self, event: &LogEvent) -> String {
        let mut text = format!(
            "{} [{}] {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S%z"),
            event.level,
            event.rendered_message
        );
        if let Some(error) = &event.error {
            text.push_str(" | ");
            // Syslog transports are line-oriented.
            text.push_str(&error.replace('\n', " | "));
        }
        text
    }
}

fn severity(level: LogLevel) -> u8 {
    if level >= LogLevel::Error {
        SEVERITY_ERR
    } else if level >= LogLevel::Warn {
        SEVERITY_WARNING
    } else {
        SEVERITY_INFO
    }
}

#[cfg(unix)]
fn connect_syslog() -> Option<UnixDatagram> {
    let socket = UnixDatagram::unbound().ok()?;
    for path in SYSLOG_PATHS {
        if socket.connect(path).is_ok() {
            return Some(socket);
        }
    }
    None
}

#[async_trait]
impl Sink for EventLogSink {
    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    async fn emit(&self, event: &LogEvent) -> LogResult<()> {
        if event.level < self.min_level {
            return Ok(());
        }
        let priority = FACILITY_USER + severity(event.level);
        let message = self.format_message(event);

        #[cfg(unix)]
        {
            let datagram = format!(
                "<{}>{} {}[{}]: {}",
                priority,
                event.timestamp.format("%b %e %H:%M:%S"),
                self.source,
                std::process::id(),
                message
            );
            let mut socket = self.socket.lock().unwrap();
            if socket.is_none() {
                *socket = connect_syslog();
            }
            if let Some(connected) = socket.as_ref() {
                if connected.send(datagram.as_bytes()).is_err() {
                    // Reconnect on the next emit.
                    *socket = None;
                }
            }
        }
        #[cfg(not(unix))]
        {
            eprintln!("<{}> {}: {}", priority, self.source, message);
        }
        Ok(())
    }

    async fn flush(&self) -> LogResult<()> {
        Ok(())
    }

    async fn close(&self) -> LogResult<()> {
        #[cfg(unix)]
        {
            self.socket.lock().unwrap().take();
        }
        Ok(())
    }
}

//! In-memory log history with live fan-out.
//!
//! Every event that passes the subscriber's filter is turned into a flat JSON
//! record, scrubbed of credentials, appended to a bounded history and
//! broadcast to log stream listeners.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::secret_scrubbing::SecretScrubber;

/// Maximum number of records kept in history
pub const MAX_LINES: usize = 2048;

const CHANNEL_CAPACITY: usize = 256;

/// One collected log event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Milliseconds since the collector started
    pub id: String,
    /// RFC 3339 local timestamp
    pub time: String,
    pub levelname: &'static str,
    pub levelno: u8,
    /// Event target
    pub name: String,
    pub module: Option<String>,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub msg: String,
    /// Structured fields attached to the event
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Tracing layer that collects log records
#[derive(Clone)]
pub struct LogCollector {
    inner: Arc<Inner>,
}

struct Inner {
    lines: Mutex<VecDeque<LogRecord>>,
    sender: broadcast::Sender<LogRecord>,
    started: Instant,
    scrubber: SecretScrubber,
}

impl LogCollector {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                lines: Mutex::new(VecDeque::with_capacity(MAX_LINES)),
                sender,
                started: Instant::now(),
                scrubber: SecretScrubber,
            }),
        }
    }

    /// Copy of the current history, oldest first
    pub fn history(&self) -> Vec<LogRecord> {
        self.lock().iter().cloned().collect()
    }

    /// History plus a receiver for every record pushed after it
    ///
    /// Both are taken under the same lock, so no record is missed or repeated.
    pub fn snapshot_and_subscribe(&self) -> (Vec<LogRecord>, broadcast::Receiver<LogRecord>) {
        let lines = self.lock();
        let receiver = self.inner.sender.subscribe();
        (lines.iter().cloned().collect(), receiver)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }

    fn push(&self, record: LogRecord) {
        let mut lines = self.lock();
        if lines.len() == MAX_LINES {
            lines.pop_front();
        }
        lines.push_back(record.clone());
        // No listeners is the common case
        let _ = self.inner.sender.send(record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogRecord>> {
        self.inner
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record_for(&self, event: &Event<'_>) -> LogRecord {
        let metadata = event.metadata();
        let mut visitor = RecordVisitor::new(self.inner.scrubber);
        event.record(&mut visitor);

        let elapsed_ms = self.inner.started.elapsed().as_secs_f64() * 1000.0;
        let (levelname, levelno) = python_level(*metadata.level());
        LogRecord {
            id: format!("{elapsed_ms:.3}"),
            time: chrono::Local::now().to_rfc3339(),
            levelname,
            levelno,
            name: metadata.target().to_string(),
            module: metadata.module_path().map(str::to_string),
            filename: metadata.file().map(str::to_string),
            lineno: metadata.line(),
            msg: visitor.message,
            fields: visitor.fields,
        }
    }
}

impl Default for LogCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCollector")
            .field("lines", &self.lock().len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<S: Subscriber> Layer<S> for LogCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let record = self.record_for(event);
        self.push(record);
    }
}

/// Level names and numbers as log viewers built for Python logging expect them
fn python_level(level: Level) -> (&'static str, u8) {
    match level {
        Level::TRACE => ("TRACE", 5),
        Level::DEBUG => ("DEBUG", 10),
        Level::INFO => ("INFO", 20),
        Level::WARN => ("WARNING", 30),
        _ => ("ERROR", 40),
    }
}

struct RecordVisitor {
    scrubber: SecretScrubber,
    message: String,
    fields: Map<String, Value>,
}

impl RecordVisitor {
    fn new(scrubber: SecretScrubber) -> Self {
        Self {
            scrubber,
            message: String::new(),
            fields: Map::new(),
        }
    }

    fn insert(&mut self, field: &Field, value: Value) {
        let value = if self.scrubber.is_secret_field(field.name()) {
            Value::from("[REDACTED]")
        } else {
            value
        };
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        let value = self.scrubber.scrub_message(value);
        if field.name() == "message" {
            self.message = value;
        } else {
            self.insert(field, Value::String(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

//! Structured logging.
//!
//! # Responsibilities
//! - Render leveled records as single-line JSON objects
//! - Filter records below the configured level before formatting
//! - Deliver records to exactly one sink (console, rotating file, or none)
//!
//! # Record Shape
//! ```text
//! text payload:    {"datetime": "...", "type": "INFO", "appid": "...", "msg": "..."}
//! mapping payload: {"datetime": "...", "type": "INFO", "appid": "...", <fields>}
//! other payload:   "" (an empty line)
//! ```
//!
//! # Design Decisions
//! - Mapping fields are merged last, so they override `datetime`/`type`/`appid`
//! - Sink write failures are reported through `tracing` and never reach callers
//! - `Logger` is a cheap handle; clones share one sink and one close flag

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::interval::RotationPolicy;
use super::rotation::RotatingFileWriter;
use super::XlogResult;
use crate::config::LogOptions;

/// Timestamp layout of the `datetime` field.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Record severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Position in the severity order (Debug < Info < Warning < Error).
    pub fn severity(self) -> u8 {
        match self {
            Self::Debug => 10,
            Self::Info => 20,
            Self::Warning => 30,
            Self::Error => 40,
        }
    }

    /// Name written into the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Whether a record at `level` passes a filter set to `self`.
    pub fn allows(self, level: LogLevel) -> bool {
        level.severity() >= self.severity()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Where records are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogMode {
    #[default]
    Console,
    File,
    /// Remote transport placeholder; records are discarded.
    Http,
}

impl FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONSOLE" => Ok(Self::Console),
            "FILE" => Ok(Self::File),
            "HTTP" => Ok(Self::Http),
            other => Err(format!("unknown log mode '{other}'")),
        }
    }
}

/// Body of a log call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Rendered under the `msg` key.
    Text(String),
    /// Merged into the record at the top level.
    Fields(Map<String, Value>),
    /// Anything else; rendered as an empty line.
    Unsupported,
}

impl From<&str> for Payload {
    fn from(msg: &str) -> Self {
        Self::Text(msg.to_string())
    }
}

impl From<String> for Payload {
    fn from(msg: String) -> Self {
        Self::Text(msg)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(fields: Map<String, Value>) -> Self {
        Self::Fields(fields)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Object(fields) => Self::Fields(fields),
            _ => Self::Unsupported,
        }
    }
}

/// Destination for rendered log lines.
pub trait LogSink: Send + Sync {
    /// Write one rendered record; the sink appends the line terminator.
    fn write_line(&self, line: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Release the destination. Must tolerate repeated calls.
    fn close(&self) -> io::Result<()> {
        self.flush()
    }
}

/// Writes records to standard error.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(line.as_bytes())?;
        stderr.write_all(b"\n")
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}

impl LogSink for RotatingFileWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        RotatingFileWriter::write_line(self, line)
    }

    fn flush(&self) -> io::Result<()> {
        RotatingFileWriter::flush(self)
    }

    fn close(&self) -> io::Result<()> {
        RotatingFileWriter::close(self)
    }
}

/// Discards every record.
#[derive(Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn write_line(&self, _line: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps records in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Written lines decoded as JSON; empty lines are skipped.
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter(|l| !l.is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

struct LoggerInner {
    options: LogOptions,
    sink: Arc<dyn LogSink>,
    closed: AtomicBool,
}

/// Leveled JSON logger bound to one sink.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("options", &self.inner.options)
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish()
    }
}

/// Open the rotating writer for file mode: parse the interval, count the
/// retained files, then open `<path>/<app_name>.log`.
fn file_sink(options: &LogOptions) -> XlogResult<RotatingFileWriter> {
    let policy = RotationPolicy::from_interval(&options.interval)?;
    let backup_count = policy.backup_count(options.retention_days)?;
    Ok(RotatingFileWriter::open(options.file_path(), policy, backup_count)?)
}

impl Logger {
    /// Build the sink selected by `options.mode`.
    ///
    /// File mode creates the log directory and fails on a malformed or zero
    /// interval.
    pub fn new(options: LogOptions) -> XlogResult<Self> {
        let sink: Arc<dyn LogSink> = match options.mode {
            LogMode::Console => Arc::new(ConsoleSink),
            LogMode::File => Arc::new(file_sink(&options)?),
            LogMode::Http => {
                tracing::warn!("HTTP log transport is not implemented; records will be discarded");
                Arc::new(NullSink)
            }
        };
        Ok(Self::with_sink(options, sink))
    }

    /// Wrap an existing sink. `options.mode` is not consulted.
    pub fn with_sink(options: LogOptions, sink: Arc<dyn LogSink>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                options,
                sink,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn options(&self) -> &LogOptions {
        &self.inner.options
    }

    /// Whether records at `level` would reach the sink.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.inner.options.level.allows(level)
    }

    pub fn debug(&self, payload: impl Into<Payload>) {
        self.log(LogLevel::Debug, payload);
    }

    pub fn info(&self, payload: impl Into<Payload>) {
        self.log(LogLevel::Info, payload);
    }

    pub fn warning(&self, payload: impl Into<Payload>) {
        self.log(LogLevel::Warning, payload);
    }

    pub fn error(&self, payload: impl Into<Payload>) {
        self.log(LogLevel::Error, payload);
    }

    /// Render and emit one record if `level` passes the filter.
    pub fn log(&self, level: LogLevel, payload: impl Into<Payload>) {
        if !self.enabled(level) || self.inner.closed.load(Ordering::Acquire) {
            return;
        }

        let line = self.format_record(level, payload.into());
        if let Err(e) = self.inner.sink.write_line(&line) {
            tracing::warn!(error = %e, level = %level, "Failed to write log record");
        }
    }

    /// Render a record without emitting it.
    pub fn format_record(&self, level: LogLevel, payload: Payload) -> String {
        let mut record = Map::new();
        record.insert(
            "datetime".into(),
            Value::String(Local::now().format(DATETIME_FORMAT).to_string()),
        );
        record.insert("type".into(), Value::String(level.as_str().into()));
        record.insert("appid".into(), Value::String(self.inner.options.app_id.clone()));

        match payload {
            Payload::Text(msg) => {
                record.insert("msg".into(), Value::String(msg));
            }
            Payload::Fields(fields) => record.extend(fields),
            Payload::Unsupported => return String::new(),
        }

        Value::Object(record).to_string()
    }

    /// Flush the sink.
    pub fn flush(&self) {
        if let Err(e) = self.inner.sink.flush() {
            tracing::warn!(error = %e, "Failed to flush log sink");
        }
    }

    /// Flush and close the sink. Only the first call has an effect.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.inner.sink.close() {
            tracing::warn!(error = %e, "Failed to close log sink");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/// Build a field mapping for a structured log call.
///
/// ```
/// use svckit::fields;
/// let payload = fields! { "method" => "GET", "status" => 200 };
/// assert_eq!(payload["status"], 200);
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = ::serde_json::Map::new();
        $( map.insert(($key).to_string(), ::serde_json::json!($value)); )*
        map
    }};
}

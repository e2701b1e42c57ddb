//! Configuration schema definitions.
//!
//! All types derive Serde traits so resolved options can be logged as JSON
//! and embedded in larger configuration documents.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::observability::{LogLevel, LogMode};

/// Structured logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogOptions {
    /// Application identifier written into every record (`appid`).
    pub app_id: String,

    /// Sink selection.
    pub mode: LogMode,

    /// Minimum level that reaches the sink.
    pub level: LogLevel,

    /// Base name of the log file (`<app_name>.log`).
    pub app_name: String,

    /// Directory holding the active and rotated log files.
    pub path: String,

    /// Days of rotated files to keep.
    pub retention_days: u32,

    /// Rotation interval descriptor, e.g. `"1D"` or `"6H"`.
    pub interval: String,
}

impl LogOptions {
    /// Path of the active log file.
    pub fn file_path(&self) -> PathBuf {
        PathBuf::from(&self.path).join(format!("{}.log", self.app_name))
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            mode: LogMode::Console,
            level: LogLevel::Info,
            app_name: "svckit".to_string(),
            path: "logs".to_string(),
            retention_days: 7,
            interval: "1D".to_string(),
        }
    }
}

/// Settings handed to the server runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationOptions {
    /// Application identifier; must be non-empty and must not start with `.`.
    #[serde(rename = "app")]
    pub app_id: String,

    /// Listen host.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Restart on source changes (runtime dependent).
    #[serde(rename = "reload")]
    pub hot_reload: bool,

    /// Number of worker threads.
    #[serde(rename = "workers")]
    pub worker_count: usize,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            hot_reload: false,
            worker_count: 1,
        }
    }
}

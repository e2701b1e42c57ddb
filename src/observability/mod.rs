//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! LogOptions
//!     → interval.rs (interval descriptor → RotationPolicy, backup count)
//!     → rotation.rs (time-rotating file writer + rotated file naming)
//!     → logging.rs (Logger: level filter → JSON record → sink)
//!
//! Sinks:
//!     → Console (stderr)
//!     → File (rotating, `<path>/<app_name>.log`)
//!     → Http (placeholder, discards)
//! ```
//!
//! # Design Decisions
//! - One sink per logger, chosen at construction
//! - Internal diagnostics go through `tracing`; application records go
//!   through `Logger`

pub mod interval;
pub mod logging;
pub mod rotation;

use thiserror::Error;

pub use interval::{backup_count, parse_interval, RotationPolicy, RotationUnit};
pub use logging::{ConsoleSink, LogLevel, LogMode, LogSink, Logger, MemorySink, NullSink, Payload};
pub use rotation::{rotation_filename, RotatingFileWriter};

/// Errors raised while building a logger.
#[derive(Debug, Error)]
pub enum XlogError {
    /// Interval descriptor does not have the `<digits><letter>` shape.
    #[error("invalid rotation interval '{0}': expected digits followed by one unit letter")]
    InvalidInterval(String),

    /// Interval magnitude of zero.
    #[error("rotation interval magnitude must be greater than zero")]
    ZeroInterval,

    /// Unit letter other than S, M, H or D.
    #[error("unsupported rotation unit '{0}'")]
    UnsupportedUnit(char),

    /// Log directory or file could not be prepared.
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for logger construction.
pub type XlogResult<T> = Result<T, XlogError>;

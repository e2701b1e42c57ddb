//! Service runtime kit: rotating structured logging and ordered service
//! startup.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::{ApplicationOptions, LogOptions};
pub use http::AxumRuntime;
pub use lifecycle::{Application, Bootstrap, LifecycleError, ServerRuntime};
pub use observability::{LogLevel, LogMode, Logger};

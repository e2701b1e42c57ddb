//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env (+ .env.<profile> with override)
//!     → loader.rs (EnvConfig: key lookups over the process environment)
//!     → LogOptions / ApplicationOptions (typed, defaults applied)
//!     → validation.rs (semantic checks, run by the lifecycle manager)
//! ```
//!
//! # Design Decisions
//! - Options are immutable once resolved
//! - Every field has a default so a bare environment still starts
//! - Validation separates syntactic (parse) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, ConfigSource, EnvConfig, Profile};
pub use schema::{ApplicationOptions, LogOptions};
pub use validation::{validate_application_options, ValidationError};

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks that parsing cannot express
//! - Reject application identifiers that do not name a module target
//! - Validate value ranges (worker count)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: no side effects, safe to run before anything else

use std::fmt;

use crate::config::schema::ApplicationOptions;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check an application identifier.
pub fn validate_app_id(app_id: &str) -> Result<(), ValidationError> {
    if app_id.trim().is_empty() {
        return Err(ValidationError {
            field: "app",
            message: "application id is required (set APP_NAME)".to_string(),
        });
    }
    if app_id.starts_with('.') {
        return Err(ValidationError {
            field: "app",
            message: format!("'{app_id}' is a relative module path, expected an absolute name"),
        });
    }
    Ok(())
}

/// Validate resolved application options.
pub fn validate_application_options(options: &ApplicationOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_app_id(&options.app_id) {
        errors.push(e);
    }

    if options.worker_count == 0 {
        errors.push(ValidationError {
            field: "workers",
            message: "worker count must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

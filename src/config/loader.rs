//! Configuration loading from the environment.
//!
//! # Responsibilities
//! - Load `.env`, then overlay the selected profile file
//! - Resolve `LogOptions` and `ApplicationOptions` from key lookups
//!
//! # Design Decisions
//! - Lookups go through `ConfigSource` so options can be resolved from any
//!   key/value store, not only the process environment
//! - Missing env files are not errors; malformed ones are

use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{ApplicationOptions, LogOptions};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key holds a value that cannot be parsed.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// An env file exists but could not be read or parsed.
    #[error("failed to load {file}: {source}")]
    Dotenv {
        file: String,
        #[source]
        source: dotenvy::Error,
    },
}

/// Key/value lookup backing option resolution.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Lookup that treats empty values as missing.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Deployment profile selecting an extra env file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    Production,
    Development,
    Test,
}

impl Profile {
    /// Env file overlaid on top of `.env` for this profile.
    pub fn dotenv_file(self) -> &'static str {
        match self {
            Profile::Production => ".env.production",
            Profile::Development => ".env.development",
            Profile::Test => ".env.test",
        }
    }
}

/// Process environment, seeded from env files.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    profile: Option<Profile>,
}

impl EnvConfig {
    /// Load `.env` and, if a profile is given, its env file with override.
    pub fn load(profile: Option<Profile>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded env file"),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::Dotenv {
                    file: ".env".to_string(),
                    source: e,
                })
            }
        }

        if let Some(profile) = profile {
            let file = profile.dotenv_file();
            match dotenvy::from_filename_override(file) {
                Ok(path) => tracing::info!(path = %path.display(), ?profile, "Loaded profile env file"),
                Err(e) if e.not_found() => {
                    tracing::warn!(file, ?profile, "Profile env file not found")
                }
                Err(e) => {
                    return Err(ConfigError::Dotenv {
                        file: file.to_string(),
                        source: e,
                    })
                }
            }
        }

        Ok(Self { profile })
    }

    pub fn profile(&self) -> Option<Profile> {
        self.profile
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

fn parse_key<T>(source: &dyn ConfigSource, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match source.get_non_empty(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_flag(source: &dyn ConfigSource, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let value = match source.get_non_empty(key) {
        None => return Ok(default),
        Some(v) => v,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}

impl LogOptions {
    /// Resolve logger settings.
    ///
    /// Keys: `APPID`, `XLOG_NAME` (falls back to `APP_NAME`), `XLOG_MODE`,
    /// `XLOG_LEVEL`, `XLOG_PATH`, `XLOG_RETENTION`, `XLOG_INTERVAL`.
    pub fn from_config(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let defaults = LogOptions::default();

        let options = Self {
            app_id: source.get("APPID").unwrap_or_default(),
            mode: parse_key(source, "XLOG_MODE", defaults.mode)?,
            level: parse_key(source, "XLOG_LEVEL", defaults.level)?,
            app_name: source
                .get_non_empty("XLOG_NAME")
                .or_else(|| source.get_non_empty("APP_NAME"))
                .unwrap_or(defaults.app_name),
            path: source.get_non_empty("XLOG_PATH").unwrap_or(defaults.path),
            retention_days: parse_key(source, "XLOG_RETENTION", defaults.retention_days)?,
            interval: source
                .get_non_empty("XLOG_INTERVAL")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.interval),
        };

        if options.retention_days == 0 {
            return Err(ConfigError::Invalid {
                key: "XLOG_RETENTION",
                value: "0".to_string(),
                reason: "retention must be at least one day".to_string(),
            });
        }

        Ok(options)
    }
}

impl ApplicationOptions {
    /// Resolve server settings.
    ///
    /// Keys: `APP_NAME`, `HOST`, `PORT`, `RELOAD`, `WORKERS`. The app id is
    /// not validated here; the lifecycle manager does that before startup.
    pub fn from_config(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let defaults = ApplicationOptions::default();

        Ok(Self {
            app_id: source.get("APP_NAME").unwrap_or_default(),
            host: source.get_non_empty("HOST").unwrap_or(defaults.host),
            port: parse_key(source, "PORT", defaults.port)?,
            hot_reload: parse_flag(source, "RELOAD", defaults.hot_reload)?,
            worker_count: parse_key(source, "WORKERS", defaults.worker_count)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{LogLevel, LogMode};

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_log_options_defaults() {
        let options = LogOptions::from_config(&source(&[])).unwrap();
        assert_eq!(options, LogOptions::default());
    }

    #[test]
    fn test_log_options_from_keys() {
        let options = LogOptions::from_config(&source(&[
            ("APPID", "x"),
            ("XLOG_MODE", "file"),
            ("XLOG_LEVEL", "WARNING"),
            ("APP_NAME", "orders"),
            ("XLOG_PATH", "/tmp/logs"),
            ("XLOG_RETENTION", "3"),
            ("XLOG_INTERVAL", "6H"),
        ]))
        .unwrap();

        assert_eq!(options.app_id, "x");
        assert_eq!(options.mode, LogMode::File);
        assert_eq!(options.level, LogLevel::Warning);
        assert_eq!(options.app_name, "orders");
        assert_eq!(options.path, "/tmp/logs");
        assert_eq!(options.retention_days, 3);
        assert_eq!(options.interval, "6H");
    }

    #[test]
    fn test_xlog_name_takes_precedence() {
        let options =
            LogOptions::from_config(&source(&[("XLOG_NAME", "access"), ("APP_NAME", "orders")])).unwrap();
        assert_eq!(options.app_name, "access");
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = LogOptions::from_config(&source(&[("XLOG_RETENTION", "week")])).unwrap_err();
        assert!(err.to_string().contains("XLOG_RETENTION"));

        let err = LogOptions::from_config(&source(&[("XLOG_RETENTION", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "XLOG_RETENTION", .. }));

        let err = ApplicationOptions::from_config(&source(&[("PORT", "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = ApplicationOptions::from_config(&source(&[("RELOAD", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "RELOAD", .. }));
    }

    #[test]
    fn test_application_options_from_keys() {
        let options = ApplicationOptions::from_config(&source(&[
            ("APP_NAME", "orders"),
            ("HOST", "0.0.0.0"),
            ("PORT", "9001"),
            ("RELOAD", "True"),
            ("WORKERS", "4"),
        ]))
        .unwrap();

        assert_eq!(options.app_id, "orders");
        assert_eq!(options.host, "0.0.0.0");
        assert_eq!(options.port, 9001);
        assert!(options.hot_reload);
        assert_eq!(options.worker_count, 4);
    }

    #[test]
    fn test_profile_files() {
        assert_eq!(Profile::Production.dotenv_file(), ".env.production");
        assert_eq!(Profile::Test.dotenv_file(), ".env.test");
    }
}

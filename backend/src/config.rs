//! Application configuration.
//!
//! Defaults live in constants; [`Config::from_env`] overrides them from the
//! environment (a `.env` file is loaded first when present).

use std::env;

use crate::error::ConfigError;
use crate::models::BatchMode;
use crate::parser::DecodeMode;

/// HTTP port when `RECORDSYNC_PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum upload size (in bytes).
///
/// 10 MB limit.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Row failures kept in an import report.
pub const MAX_REPORTED_FAILURES: usize = 100;

/// MIME type handed to the file sink for exports.
pub const EXPORT_MIME_TYPE: &str = "text/csv;charset=utf-8";

/// File extension for exports.
pub const EXPORT_EXTENSION: &str = "csv";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Base URL of the remote collection service; in-memory when unset.
    pub remote_url: Option<String>,
    pub decode_mode: DecodeMode,
    pub strict_fields: bool,
    pub batch_mode: BatchMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            remote_url: None,
            decode_mode: DecodeMode::Lenient,
            strict_fields: false,
            batch_mode: BatchMode::Direct,
        }
    }
}

impl Config {
    /// Build a config from `RECORDSYNC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(port) = lookup("RECORDSYNC_PORT") {
            config.port = port.trim().parse().map_err(|_| invalid("RECORDSYNC_PORT", &port))?;
        }

        config.remote_url = lookup("RECORDSYNC_REMOTE_URL")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if let Some(v) = lookup("RECORDSYNC_STRICT_DECODE") {
            if parse_bool("RECORDSYNC_STRICT_DECODE", &v)? {
                config.decode_mode = DecodeMode::Strict;
            }
        }

        if let Some(v) = lookup("RECORDSYNC_STRICT_FIELDS") {
            config.strict_fields = parse_bool("RECORDSYNC_STRICT_FIELDS", &v)?;
        }

        if let Some(group) = lookup("RECORDSYNC_UPDATE_GROUP") {
            let group = group.trim();
            if !group.is_empty() {
                config.batch_mode = BatchMode::Group(group.to_string());
            }
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("RECORDSYNC_PORT", "8080"),
            ("RECORDSYNC_REMOTE_URL", " http://localhost:4004/odata/v4/catalog "),
            ("RECORDSYNC_STRICT_DECODE", "true"),
            ("RECORDSYNC_STRICT_FIELDS", "1"),
            ("RECORDSYNC_UPDATE_GROUP", "supplierChanges"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.remote_url.as_deref(), Some("http://localhost:4004/odata/v4/catalog"));
        assert_eq!(config.decode_mode, DecodeMode::Strict);
        assert!(config.strict_fields);
        assert_eq!(config.batch_mode, BatchMode::Group("supplierChanges".into()));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_lookup(lookup(&[("RECORDSYNC_PORT", "eighty")])).is_err());
        let err = Config::from_lookup(lookup(&[("RECORDSYNC_STRICT_FIELDS", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("RECORDSYNC_STRICT_FIELDS"));
    }
}

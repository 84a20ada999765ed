//! Environment-driven configuration shared by the client binaries

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::util::is_http_url;

/// Default sync backend endpoint
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default per-request sync timeout in seconds
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Sync client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub sync_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            sync_timeout: Duration::from_secs(DEFAULT_SYNC_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = value_or_default(&lookup, "TILL_API_URL", DEFAULT_API_URL);
        if !is_http_url(&api_url) {
            return Err(ConfigError::Invalid(
                "TILL_API_URL must start with http:// or https://".to_string(),
            ));
        }

        let sync_timeout_secs = parse_bounded(
            &lookup,
            "TILL_SYNC_TIMEOUT_SECS",
            DEFAULT_SYNC_TIMEOUT_SECS,
            1..=300,
        )?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            sync_timeout: Duration::from_secs(sync_timeout_secs),
        })
    }
}

/// Parse an integer variable, falling back to `default` and enforcing `range`
pub fn parse_bounded(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

pub fn value_or_default(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

pub fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

pub fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

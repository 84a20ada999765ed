use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

use till_core::config::{parse_bounded, value_or_default, ConfigError};
use till_core::util::normalize_text_option;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_DB_PATH: &str = "till-api.db";
pub const DEFAULT_OWNER_ID: &str = "owner-1";
pub const DEFAULT_OWNER_NAME: &str = "John Doe";
pub const DEFAULT_OWNER_PIN: &str = "5222";
/// Sync requests carry every collection in full, so the cap sits far above axum's 2 MB default
pub const DEFAULT_MAX_BODY_MB: u64 = 64;
const MAX_BODY_MB_LIMIT: u64 = 1024;
const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub owner_name: String,
    pub owner_pin: String,
    pub max_body_bytes: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("owner_name", &self.owner_name)
            .field("owner_pin", &"[REDACTED]")
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "TILL_API_BIND_ADDR", DEFAULT_BIND_ADDR);
        if bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(
                "TILL_API_BIND_ADDR must be a socket address such as 127.0.0.1:5000".to_string(),
            ));
        }

        let db_path = PathBuf::from(value_or_default(&lookup, "TILL_API_DB_PATH", DEFAULT_DB_PATH));
        let owner_name = value_or_default(&lookup, "TILL_OWNER_NAME", DEFAULT_OWNER_NAME);

        let owner_pin = value_or_default(&lookup, "TILL_OWNER_PIN", DEFAULT_OWNER_PIN);
        if !owner_pin.chars().all(|ch| ch.is_ascii_digit()) || !(4..=8).contains(&owner_pin.len())
        {
            return Err(ConfigError::Invalid(
                "TILL_OWNER_PIN must be 4 to 8 digits".to_string(),
            ));
        }

        let max_body_mb = parse_bounded(
            &lookup,
            "TILL_API_MAX_BODY_MB",
            DEFAULT_MAX_BODY_MB,
            1..=MAX_BODY_MB_LIMIT,
        )?;
        let max_body_bytes = usize::try_from(max_body_mb)
            .ok()
            .and_then(|mb| mb.checked_mul(BYTES_PER_MB))
            .ok_or_else(|| {
                ConfigError::Invalid("TILL_API_MAX_BODY_MB is too large for this platform".to_string())
            })?;

        Ok(Self {
            bind_addr,
            db_path,
            owner_name,
            owner_pin,
            max_body_bytes,
        })
    }

    /// Config for tests: in-memory defaults with an explicit store path
    #[cfg(test)]
    pub(crate) fn for_tests(db_path: PathBuf) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            db_path,
            owner_name: DEFAULT_OWNER_NAME.to_string(),
            owner_pin: DEFAULT_OWNER_PIN.to_string(),
            max_body_bytes: 64 * BYTES_PER_MB,
        }
    }
}

/// Owner record provisioned on first start
pub fn seed_owner(config: &AppConfig) -> till_core::Owner {
    till_core::Owner {
        id: DEFAULT_OWNER_ID.to_string(),
        name: normalize_text_option(Some(config.owner_name.clone()))
            .unwrap_or_else(|| DEFAULT_OWNER_NAME.to_string()),
        pin: config.owner_pin.clone(),
        role: till_core::models::OwnerRole::Owner,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.db_path, PathBuf::from("till-api.db"));
        assert_eq!(seed_owner(&config).name, "John Doe");
        assert_eq!(seed_owner(&config).id, "owner-1");
        assert_eq!(config.max_body_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn config_reads_body_limit_in_megabytes() {
        let config = config_from(&[("TILL_API_MAX_BODY_MB", "8")]).unwrap();
        assert_eq!(config.max_body_bytes, 8 * 1024 * 1024);

        let err = config_from(&[("TILL_API_MAX_BODY_MB", "0")]).unwrap_err();
        assert!(err.to_string().contains("TILL_API_MAX_BODY_MB"));
    }

    #[test]
    fn config_rejects_invalid_values() {
        let err = config_from(&[("TILL_API_BIND_ADDR", "localhost")]).unwrap_err();
        assert!(err.to_string().contains("TILL_API_BIND_ADDR"));

        let err = config_from(&[("TILL_OWNER_PIN", "12ab")]).unwrap_err();
        assert!(err.to_string().contains("TILL_OWNER_PIN"));
    }

    #[test]
    fn config_redacts_owner_pin() {
        let config = config_from(&[("TILL_OWNER_PIN", "987654")]).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("987654"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}

// src/config.rs
use log::LevelFilter;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_QUOTE_BASE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing configuration key: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Scylla,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scylla" => Ok(StorageBackend::Scylla),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub storage: StorageBackend,
    pub scylla_node: String,
    pub alpha_vantage_api_key: String,
    pub alpha_vantage_base_url: String,
    pub quote_timeout: Duration,
    pub jwt_secret: String,
    /// Fetch live quotes for overview and breakdown instead of using
    /// stored snapshots.
    pub live_valuation: bool,
    pub log_level: LevelFilter,
}

impl Config {
    /// Reads configuration from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &'static str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let listen_addr = parse("LISTEN_ADDR", value("LISTEN_ADDR", "127.0.0.1:3030"))?;
        let storage = parse("STORAGE_BACKEND", value("STORAGE_BACKEND", "scylla"))?;
        let timeout_secs: u64 = parse("QUOTE_TIMEOUT_SECS", value("QUOTE_TIMEOUT_SECS", "15"))?;
        let live_valuation = parse_bool("LIVE_VALUATION", value("LIVE_VALUATION", "false"))?;
        let log_level = parse("LOG_LEVEL", value("LOG_LEVEL", "info"))?;

        Ok(Config {
            listen_addr,
            storage,
            scylla_node: value("SCYLLA_NODE", "127.0.0.1:9042"),
            alpha_vantage_api_key: required("ALPHA_VANTAGE_API_KEY")?,
            alpha_vantage_base_url: value("ALPHA_VANTAGE_BASE_URL", DEFAULT_QUOTE_BASE_URL),
            quote_timeout: Duration::from_secs(timeout_secs),
            jwt_secret: required("JWT_SECRET")?,
            live_valuation,
            log_level,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value }),
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
    fn defaults_apply_when_only_required_keys_set() {
        let config = Config::from_lookup(lookup(&[
            ("ALPHA_VANTAGE_API_KEY", "demo"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:3030".parse().unwrap());
        assert_eq!(config.storage, StorageBackend::Scylla);
        assert_eq!(config.scylla_node, "127.0.0.1:9042");
        assert_eq!(config.alpha_vantage_base_url, DEFAULT_QUOTE_BASE_URL);
        assert_eq!(config.quote_timeout, Duration::from_secs(15));
        assert!(!config.live_valuation);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ALPHA_VANTAGE_API_KEY"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("ALPHA_VANTAGE_API_KEY", "demo"),
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "Memory"),
            ("LIVE_VALUATION", "yes"),
            ("QUOTE_TIMEOUT_SECS", "3"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.live_valuation);
        assert_eq!(config.quote_timeout, Duration::from_secs(3));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("ALPHA_VANTAGE_API_KEY", "demo"),
            ("JWT_SECRET", "secret"),
            ("LIVE_VALUATION", "sometimes"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LIVE_VALUATION", .. }));
    }
}

//! Konfigurasi channel dan server
//!
//! Format TOML, semua field punya default:
//!
//! ```toml
//! [channel]
//! capacity = 1024
//! drain = "destructive"   # atau "peek-commit"
//!
//! [server]
//! write_addr = "127.0.0.1:9998"
//! read_addr = "127.0.0.1:9999"
//! read_chunk = 1024
//! stats_interval_secs = 0
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::{DrainPolicy, DEFAULT_CAPACITY, MIN_CAPACITY};
use crate::error::ConfigError;

/// Konfigurasi ring
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Jumlah slot ring (usable = capacity - 1)
    pub capacity: usize,
    pub drain: DrainPolicy,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            drain: DrainPolicy::Destructive,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < MIN_CAPACITY {
            return Err(ConfigError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

/// Konfigurasi endpoint TCP
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Port producer
    pub write_addr: String,
    /// Port consumer
    pub read_addr: String,
    /// `max_bytes` per read untuk setiap consumer
    pub read_chunk: usize,
    /// Interval log statistik, 0 = mati
    pub stats_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            write_addr: "127.0.0.1:9998".to_string(),
            read_addr: "127.0.0.1:9999".to_string(),
            read_chunk: DEFAULT_CAPACITY,
            stats_interval_secs: 0,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_chunk == 0 {
            return Err(ConfigError::InvalidReadChunk(self.read_chunk));
        }
        Ok(())
    }
}

/// Konfigurasi lengkap
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub channel: ChannelConfig,
    pub server: ServerConfig,
}

impl LogConfig {
    /// Parse dari string TOML lalu validasi
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Baca file TOML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.channel.validate()?;
        self.server.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = LogConfig::from_toml_str("").unwrap();
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.channel.capacity, 1024);
        assert_eq!(config.channel.drain, DrainPolicy::Destructive);
    }

    #[test]
    fn test_parse_full_config() {
        let config = LogConfig::from_toml_str(
            r#"
            [channel]
            capacity = 8
            drain = "peek-commit"

            [server]
            write_addr = "0.0.0.0:7000"
            read_chunk = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.channel.capacity, 8);
        assert_eq!(config.channel.drain, DrainPolicy::PeekCommit);
        assert_eq!(config.server.write_addr, "0.0.0.0:7000");
        assert_eq!(config.server.read_addr, "127.0.0.1:9999");
        assert_eq!(config.server.read_chunk, 16);
    }

    #[test]
    fn test_capacity_below_two_rejected() {
        let err = LogConfig::from_toml_str("[channel]\ncapacity = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCapacity(1)));
    }

    #[test]
    fn test_zero_read_chunk_rejected() {
        let err = LogConfig::from_toml_str("[server]\nread_chunk = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidReadChunk(0)));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let err = LogConfig::from_toml_str("[channel]\nsize = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LogConfig::load("definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

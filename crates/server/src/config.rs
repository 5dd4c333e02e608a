//! Server configuration

use anyhow::{Context, Result};
use chaos_lib::alignment::{AlignmentConfig, DEFAULT_CADENCE_SECS, DEFAULT_EXPECTED_SAMPLES};
use serde::Deserialize;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "CHAOS_CONFIG_FILE";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to every structured log event
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP port for reports, ingestion, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Slots per aligned series
    #[serde(default = "default_expected_samples")]
    pub expected_samples: usize,

    /// Intended seconds between two samples of one resource
    #[serde(default = "default_cadence_secs")]
    pub cadence_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            expected_samples: default_expected_samples(),
            cadence_secs: default_cadence_secs(),
        }
    }
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "chaos-usage".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_expected_samples() -> usize {
    DEFAULT_EXPECTED_SAMPLES
}

fn default_cadence_secs() -> u32 {
    DEFAULT_CADENCE_SECS
}

impl ServerConfig {
    /// Load configuration from `CHAOS_*` environment variables and an
    /// optional file named by `CHAOS_CONFIG_FILE`
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("CHAOS").try_parsing(true))
            .build()
            .context("Failed to read configuration sources")?;

        let loaded: ServerConfig = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        loaded.alignment()?;

        Ok(loaded)
    }

    /// Validated alignment settings
    pub fn alignment(&self) -> Result<AlignmentConfig> {
        AlignmentConfig::new(self.expected_samples, self.cadence_secs)
            .context("Invalid alignment configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_one_minute_window() {
        let config = ServerConfig::default();
        let alignment = config.alignment().unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(alignment.expected_count, 6);
        assert_eq!(alignment.cadence_secs, 10);
    }

    #[test]
    fn test_zero_cadence_is_rejected() {
        let config = ServerConfig {
            cadence_secs: 0,
            ..ServerConfig::default()
        };
        assert!(config.alignment().is_err());
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"api_port": 9090, "expected_samples": 12}"#).unwrap();

        assert_eq!(config.api_port, 9090);
        assert_eq!(config.expected_samples, 12);
        assert_eq!(config.cadence_secs, 10);
    }
}

//! Configuration management with TOML persistence
//!
//! Settings for the demo daemon/CLI: how often sensor back-ends push
//! readings into the store and which back-ends are enabled.

use crate::error::{Result, SmcError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// vsmc configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Polling options
    #[serde(default)]
    pub polling: PollingConfig,
    /// Sensor back-end selection
    #[serde(default)]
    pub sensors: SensorsConfig,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Sensor refresh interval in milliseconds
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u32,
}

/// Sensor back-end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorsConfig {
    /// Enable the NVIDIA (nouveau-derived) back-end
    #[serde(default = "default_true")]
    pub nouveau: bool,
    /// Enable the AMD Radeon (r600-derived) back-end
    #[serde(default = "default_true")]
    pub radeon: bool,
}

fn default_update_interval() -> u32 {
    1000 // 1 second
}

fn default_true() -> bool {
    true
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            update_interval_ms: default_update_interval(),
        }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        SensorsConfig {
            nouveau: true,
            radeon: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            polling: PollingConfig::default(),
            sensors: SensorsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| SmcError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| SmcError::Config(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Load from a file if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Config::load(path).unwrap_or_default()
        } else {
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.polling.update_interval_ms, 1000);
        assert!(config.sensors.nouveau);
        assert!(config.sensors.radeon);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sensors]
            radeon = false
            "#,
        )
        .unwrap();
        assert_eq!(config.polling.update_interval_ms, 1000);
        assert!(config.sensors.nouveau);
        assert!(!config.sensors.radeon);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.polling.update_interval_ms = 250;
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.polling.update_interval_ms, 250);
    }
}

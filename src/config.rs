//! Configuration for the hat-to-axis host
//!
//! Stored as TOML. A missing file means defaults; the defaults reproduce
//! the classic tuning (min rate 3, max rate 1, growth 1).

use hatstick_core::{AxisId, ControlError, RateParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bounds for the host tick cadence, in milliseconds
pub const TICK_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 1..=1000;

/// Errors from loading, saving or validating a config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid rates: {0}")]
    Rates(#[from] ControlError),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which virtual axis a hat component drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBinding {
    pub axis: AxisId,
}

/// Complete host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HatstickConfig {
    /// Name for the virtual joystick device
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Physical device with the hat switch (auto-detected when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_device: Option<PathBuf>,
    /// Milliseconds between controller ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// evdev reports north as -1; flip it so north moves the axis up
    #[serde(default = "default_true")]
    pub invert_y: bool,
    /// Step rate tuning shared by both axes
    #[serde(default)]
    pub rates: RateParams,
    /// Axis driven by left/right
    #[serde(default = "default_x_axis")]
    pub x_axis: AxisBinding,
    /// Axis driven by up/down
    #[serde(default = "default_y_axis")]
    pub y_axis: AxisBinding,
}

fn default_device_name() -> String {
    "Hatstick Virtual Joystick".to_string()
}
fn default_tick_interval() -> u64 {
    20
}
fn default_true() -> bool {
    true
}
fn default_x_axis() -> AxisBinding {
    AxisBinding { axis: AxisId::X }
}
fn default_y_axis() -> AxisBinding {
    AxisBinding { axis: AxisId::Y }
}

impl Default for HatstickConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            input_device: None,
            tick_interval_ms: default_tick_interval(),
            invert_y: true,
            rates: RateParams::default(),
            x_axis: default_x_axis(),
            y_axis: default_y_axis(),
        }
    }
}

impl HatstickConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hatstick")
            .join("hatstick.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HatstickConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    /// Check ranges and that the two axes differ
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rates.validate()?;
        if !TICK_INTERVAL_RANGE.contains(&self.tick_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "tick_interval_ms must be within {}..={}, got {}",
                TICK_INTERVAL_RANGE.start(),
                TICK_INTERVAL_RANGE.end(),
                self.tick_interval_ms
            )));
        }
        if self.x_axis.axis == self.y_axis.axis {
            return Err(ConfigError::Invalid(format!(
                "x_axis and y_axis both use {}",
                self.x_axis.axis
            )));
        }
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::Invalid("device_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_serializes() {
        let config = HatstickConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("Hatstick Virtual Joystick"));
        assert!(toml_str.contains("min_rate = 3"));
        assert!(toml_str.contains("axis = \"Y\""));
        assert!(!toml_str.contains("input_device"));
    }

    #[test]
    fn test_roundtrip() {
        let mut config = HatstickConfig::default();
        config.input_device = Some(PathBuf::from("/dev/input/event7"));
        config.rates.max_rate = 40;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: HatstickConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: HatstickConfig = toml::from_str(
            r#"
tick_interval_ms = 10

[rates]
max_rate = 25

[x_axis]
axis = "RX"
"#,
        )
        .unwrap();
        assert_eq!(config.tick_interval_ms, 10);
        assert_eq!(config.rates.min_rate, 3);
        assert_eq!(config.rates.max_rate, 25);
        assert_eq!(config.rates.rate_growth, 1);
        assert_eq!(config.x_axis.axis, AxisId::RX);
        assert_eq!(config.y_axis.axis, AxisId::Y);
        assert!(config.invert_y);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HatstickConfig::default();
        config.rates.rate_growth = 5000;
        assert!(matches!(config.validate(), Err(ConfigError::Rates(_))));

        let mut config = HatstickConfig::default();
        config.tick_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = HatstickConfig::default();
        config.y_axis.axis = AxisId::X;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempdir().unwrap();
        let config = HatstickConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, HatstickConfig::default());
    }

    #[test]
    fn test_save_creates_dirs_and_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("hatstick.toml");
        let mut config = HatstickConfig::default();
        config.device_name = "Cockpit Hat".to_string();
        config.save(&path).unwrap();

        let loaded = HatstickConfig::load(&path).unwrap();
        assert_eq!(loaded.device_name, "Cockpit Hat");
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "tick_interval_ms = \"fast\"").unwrap();
        assert!(matches!(
            HatstickConfig::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}

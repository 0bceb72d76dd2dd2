//! Configuration module for sdp-telemetry
//!
//! All settings live in one TOML file with a section per component:
//!
//! ```toml
//! [serial]
//! port = "/dev/rfcomm0"
//! baud = 115200
//!
//! [decoder]
//! max_line_len = 4096  # 0 disables the cap
//!
//! [chart]
//! redraw_interval_ms = 500
//!
//! [clock_sync]
//! period_ms = 10000
//! ```
//!
//! Missing sections and keys fall back to their defaults.
//!
//! # Config Location
//!
//! Without an explicit path the file is looked up in the platform data directory:
//! - **Linux**: `~/.local/share/dev.kyivaigroup.sdp-telemetry/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.kyivaigroup.sdp-telemetry/config.toml`
//! - **Windows**: `%APPDATA%\dev.kyivaigroup.sdp-telemetry\config.toml`

use crate::error::{Result, SensorError};
use crate::types::DEFAULT_PRESSURE_SCALE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.kyivaigroup.sdp-telemetry";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default serial baud rate
pub const DEFAULT_BAUD: u32 = 115_200;

/// Read buffer size of the reader loop
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16_284;

/// Default cap on a single protocol line
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Default number of chart points kept before the history is halved
pub const DEFAULT_MAX_CHART_POINTS: usize = 10_000;

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub decoder: DecoderConfig,
    pub chart: ChartConfig,
    pub clock_sync: ClockSyncConfig,
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device, e.g. `/dev/rfcomm0` or `COM5`
    pub port: String,
    pub baud: u32,
    /// How long a read waits for data before returning empty
    pub read_timeout_ms: u64,
    /// Pause between reads
    pub poll_interval_ms: u64,
    pub read_buffer_size: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud: DEFAULT_BAUD,
            read_timeout_ms: 50,
            poll_interval_ms: 100,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Line decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Longest accepted line in bytes; longer lines are discarded. `0` disables the cap.
    pub max_line_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl DecoderConfig {
    /// The line cap, or `None` when lines may grow without bound
    pub fn line_limit(&self) -> Option<usize> {
        (self.max_line_len > 0).then_some(self.max_line_len)
    }
}

/// Live chart settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Minimum time between two redraws
    pub redraw_interval_ms: u64,
    /// History size that triggers dropping the older half
    pub max_points: usize,
    /// Scale factor assumed until the device announces one
    pub default_scale_factor: i32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            redraw_interval_ms: 500,
            max_points: DEFAULT_MAX_CHART_POINTS,
            default_scale_factor: DEFAULT_PRESSURE_SCALE,
        }
    }
}

/// Periodic device clock synchronisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSyncConfig {
    pub enabled: bool,
    pub period_ms: u64,
    /// Delay before the first periodic sync after connecting
    pub initial_delay_ms: u64,
}

impl Default for ClockSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period_ms: 10_000,
            initial_delay_ms: 1_000,
        }
    }
}

impl AppConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SensorError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            SensorError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the given path, or the default location when `None`.
    /// A missing file yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Save the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SensorError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SensorError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            SensorError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject settings the components cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud == 0 {
            return Err(SensorError::Config("baud rate must be non-zero".into()));
        }
        if self.serial.read_buffer_size == 0 {
            return Err(SensorError::Config("read buffer size must be non-zero".into()));
        }
        if self.chart.redraw_interval_ms == 0 {
            return Err(SensorError::Config("redraw interval must be non-zero".into()));
        }
        if self.chart.default_scale_factor == 0 {
            return Err(SensorError::Config("scale factor must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.decoder.line_limit(), Some(4096));
        assert_eq!(config.chart.default_scale_factor, 60);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [serial]
            port = "/dev/rfcomm0"

            [chart]
            redraw_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.serial.port, "/dev/rfcomm0");
        assert_eq!(config.serial.baud, DEFAULT_BAUD);
        assert_eq!(config.chart.redraw_interval_ms, 250);
        assert_eq!(config.chart.max_points, DEFAULT_MAX_CHART_POINTS);
        assert!(config.clock_sync.enabled);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.serial.port = "COM5".into();
        config.clock_sync.period_ms = 5_000;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unbounded_lines_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.decoder.max_line_len = 0;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.decoder.line_limit(), None);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[serial]\nbaud = 0\n").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("baud"));

        std::fs::write(&path, "[chart]\nredraw_interval_ms = \"fast\"\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(SensorError::Config(_))));
    }
}

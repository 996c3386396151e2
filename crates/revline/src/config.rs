//! Configuration management for revline.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "revline";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "vehicles.db";

/// Directory (under the data dir) that run logs land in.
const LOG_DIR_NAME: &str = "TelemetryLogs";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `REVLINE_`)
/// 2. TOML config file at `~/.config/revline/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vehicle the metrics are computed for when nothing is calibrated yet.
    pub vehicle: VehicleConfig,
    /// OBD-II adapter connection.
    pub adapter: AdapterConfig,
    /// Polling and metric derivation.
    pub telemetry: TelemetryConfig,
    /// CSV run logging.
    pub recording: RecordingConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Dashboard thresholds.
    pub display: DisplayConfig,
}

/// Vehicle defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Engine displacement in cubic centimetres.
    pub displacement_cc: u32,
    /// Curb weight in kilograms, used for power-to-weight.
    pub weight_kg: u32,
}

/// Adapter connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Try the adapter at all. When false the simulated source is used.
    pub enabled: bool,
    /// `host:port` of the ELM327 TCP endpoint.
    pub address: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-command response timeout in milliseconds.
    pub response_timeout_ms: u64,
    /// Timeout for the first `0100`, which may include a protocol search.
    pub probe_timeout_ms: u64,
}

/// Telemetry derivation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Interval between sensor polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Number of fuel trim samples in the stability window.
    pub trim_window: usize,
    /// Launch detection lower bound (exclusive), km/h.
    pub launch_min_kmh: f64,
    /// Launch detection upper bound (exclusive), km/h.
    pub launch_max_kmh: f64,
    /// Speed that ends a timed run, km/h.
    pub target_kmh: f64,
    /// Number of best runs kept on the leaderboard.
    pub leaderboard_size: usize,
    /// Interval between fuel map snapshots in milliseconds.
    pub fuel_map_interval_ms: u64,
}

/// Run log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Write a CSV log of every frame during `run`.
    pub enabled: bool,
    /// Directory for run logs.
    /// Defaults to `~/.local/share/revline/TelemetryLogs`
    pub log_dir: Option<PathBuf>,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/revline/vehicles.db`
    pub database_path: Option<PathBuf>,
}

/// Dashboard thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Coolant temperature above which the engine counts as warm, °C.
    pub warm_coolant_c: f64,
    /// RPM warning threshold once warm.
    pub redline_warm_rpm: f64,
    /// RPM warning threshold while cold.
    pub redline_cold_rpm: f64,
    /// Fuel trim standard deviation at or above which stability is flagged.
    pub stability_alert: f64,
    /// Full scale of the shift light.
    pub shift_max_rpm: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            displacement_cc: 2000,
            weight_kg: 1500,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "192.168.0.10:35000".to_string(),
            connect_timeout_ms: 3000,
            response_timeout_ms: 1000,
            probe_timeout_ms: 10_000,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            trim_window: 40,
            launch_min_kmh: 2.0,
            launch_max_kmh: 8.0,
            target_kmh: 100.0,
            leaderboard_size: 3,
            fuel_map_interval_ms: 500,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            warm_coolant_c: 75.0,
            redline_warm_rpm: 6000.0,
            redline_cold_rpm: 3500.0,
            stability_alert: 2.5,
            shift_max_rpm: 7000.0,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("REVLINE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let telemetry = &self.telemetry;

        if telemetry.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be greater than 0"));
        }

        if telemetry.fuel_map_interval_ms == 0 {
            return Err(invalid("fuel_map_interval_ms must be greater than 0"));
        }

        if telemetry.trim_window < 2 {
            return Err(invalid("trim_window must hold at least 2 samples"));
        }

        if telemetry.leaderboard_size == 0 {
            return Err(invalid("leaderboard_size must be greater than 0"));
        }

        if !(telemetry.launch_min_kmh < telemetry.launch_max_kmh
            && telemetry.launch_max_kmh < telemetry.target_kmh)
        {
            return Err(invalid(format!(
                "launch window ({} - {} km/h) must sit below target_kmh ({})",
                telemetry.launch_min_kmh, telemetry.launch_max_kmh, telemetry.target_kmh
            )));
        }

        if self.adapter.probe_timeout_ms < self.adapter.response_timeout_ms {
            return Err(invalid(format!(
                "probe_timeout_ms ({}) cannot be shorter than response_timeout_ms ({})",
                self.adapter.probe_timeout_ms, self.adapter.response_timeout_ms
            )));
        }

        if self.vehicle.displacement_cc == 0 {
            return Err(invalid("displacement_cc must be greater than 0"));
        }

        if self.vehicle.weight_kg == 0 {
            return Err(invalid("weight_kg must be greater than 0"));
        }

        if self.display.redline_cold_rpm > self.display.redline_warm_rpm {
            return Err(invalid(format!(
                "redline_cold_rpm ({}) cannot be greater than redline_warm_rpm ({})",
                self.display.redline_cold_rpm, self.display.redline_warm_rpm
            )));
        }

        if self.display.shift_max_rpm <= 0.0 {
            return Err(invalid("shift_max_rpm must be greater than 0"));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the run log directory, resolving defaults if not set.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.recording
            .log_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(LOG_DIR_NAME))
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.poll_interval_ms)
    }

    /// Get the fuel map snapshot interval as a Duration.
    #[must_use]
    pub fn fuel_map_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.fuel_map_interval_ms)
    }

    /// Get the adapter connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter.connect_timeout_ms)
    }

    /// Get the adapter response timeout as a Duration.
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter.response_timeout_ms)
    }

    /// Get the adapter probe timeout as a Duration.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter.probe_timeout_ms)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.adapter.enabled);
        assert_eq!(config.vehicle.displacement_cc, 2000);
        assert_eq!(config.telemetry.poll_interval_ms, 100);
        assert!(config.recording.enabled);
        assert!(config.recording.log_dir.is_none());
    }

    #[test]
    fn test_default_telemetry_config() {
        let telemetry = TelemetryConfig::default();

        assert_eq!(telemetry.trim_window, 40);
        assert!((telemetry.launch_min_kmh - 2.0).abs() < f64::EPSILON);
        assert!((telemetry.launch_max_kmh - 8.0).abs() < f64::EPSILON);
        assert!((telemetry.target_kmh - 100.0).abs() < f64::EPSILON);
        assert_eq!(telemetry.leaderboard_size, 3);
        assert_eq!(telemetry.fuel_map_interval_ms, 500);
    }

    #[test]
    fn test_default_display_config() {
        let display = DisplayConfig::default();

        assert!((display.warm_coolant_c - 75.0).abs() < f64::EPSILON);
        assert!((display.redline_warm_rpm - 6000.0).abs() < f64::EPSILON);
        assert!((display.redline_cold_rpm - 3500.0).abs() < f64::EPSILON);
        assert!((display.stability_alert - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_adapter_config() {
        let adapter = AdapterConfig::default();

        assert_eq!(adapter.address, "192.168.0.10:35000");
        assert_eq!(adapter.connect_timeout_ms, 3000);
        assert!(adapter.probe_timeout_ms > adapter.response_timeout_ms);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.telemetry.poll_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn test_validate_inverted_launch_window() {
        let mut config = Config::default();
        config.telemetry.launch_min_kmh = 10.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("launch window"));
    }

    #[test]
    fn test_validate_target_below_launch() {
        let mut config = Config::default();
        config.telemetry.target_kmh = 5.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_displacement() {
        let mut config = Config::default();
        config.vehicle.displacement_cc = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("displacement_cc"));
    }

    #[test]
    fn test_validate_zero_leaderboard() {
        let mut config = Config::default();
        config.telemetry.leaderboard_size = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_small_trim_window() {
        let mut config = Config::default();
        config.telemetry.trim_window = 1;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("trim_window"));
    }

    #[test]
    fn test_validate_inverted_redlines() {
        let mut config = Config::default();
        config.display.redline_cold_rpm = 7000.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("redline_cold_rpm"));
    }

    #[test]
    fn test_validate_probe_shorter_than_response() {
        let mut config = Config::default();
        config.adapter.probe_timeout_ms = 500;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("probe_timeout_ms"));
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("vehicles.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_log_dir_default() {
        let path = Config::default().log_dir();
        assert!(path.to_string_lossy().contains("TelemetryLogs"));
    }

    #[test]
    fn test_intervals() {
        let config = Config::default();

        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.fuel_map_interval(), Duration::from_millis(500));
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.response_timeout(), Duration::from_secs(1));
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("revline"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("revline_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[vehicle]\ndisplacement_cc = 2499\n\n[adapter]\nenabled = false\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.vehicle.displacement_cc, 2499);
        assert!(!config.adapter.enabled);
        assert_eq!(config.telemetry, TelemetryConfig::default());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "revline_bad_config_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[telemetry]\npoll_interval_ms = 0\n").unwrap();

        assert!(Config::load_from(Some(path.clone())).is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_telemetry_config_deserialize() {
        let json = r#"{"poll_interval_ms": 250, "leaderboard_size": 5}"#;
        let telemetry: TelemetryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(telemetry.poll_interval_ms, 250);
        assert_eq!(telemetry.leaderboard_size, 5);
        assert_eq!(telemetry.trim_window, 40);
    }
}

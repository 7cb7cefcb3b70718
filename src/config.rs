//! Configuration management for skywatch.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. The
//! resulting [`Config`] value is constructed once at process start and passed
//! by reference into each component's constructor; no component performs
//! ambient environment lookups of its own.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::BoundingBox;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "skywatch";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "flights.db";

/// Default model parameter file, relative to the data directory.
const MODEL_FILE_NAME: &str = "models/delay_model.json";

/// Default scaler parameter file, relative to the data directory.
const SCALER_FILE_NAME: &str = "models/delay_scaler.json";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SKYWATCH_`)
/// 2. TOML config file at `~/.config/skywatch/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API configuration.
    pub api: ApiConfig,
    /// Geographic region to poll.
    pub region: RegionConfig,
    /// Refresh-loop configuration.
    pub watch: WatchConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

/// Upstream flight-state API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the flight-state API.
    pub base_url: String,
    /// Username for authenticated access. Anonymous when unset.
    pub username: Option<String>,
    /// Password for authenticated access.
    pub password: Option<String>,
}

/// Bounding box of the region to poll, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Minimum latitude.
    pub min_latitude: f64,
    /// Maximum latitude.
    pub max_latitude: f64,
    /// Minimum longitude.
    pub min_longitude: f64,
    /// Maximum longitude.
    pub max_longitude: f64,
}

/// Refresh-loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between refresh cycles.
    pub refresh_interval_secs: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/skywatch/flights.db`
    pub database_path: Option<PathBuf>,
    /// Path to the serialized classifier.
    /// Defaults to `~/.local/share/skywatch/models/delay_model.json`
    pub model_path: Option<PathBuf>,
    /// Path to the serialized feature scaler.
    /// Defaults to `~/.local/share/skywatch/models/delay_scaler.json`
    pub scaler_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opensky-network.org/api".to_string(),
            username: None,
            password: None,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        // Western Europe, matching the original deployment region.
        Self {
            min_latitude: 41.0,
            max_latitude: 51.0,
            min_longitude: -5.0,
            max_longitude: 9.0,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `SKYWATCH_`)
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
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("SKYWATCH_").split("_"));

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
        let r = &self.region;
        if !(-90.0..=90.0).contains(&r.min_latitude) || !(-90.0..=90.0).contains(&r.max_latitude) {
            return Err(Error::config_validation(format!(
                "latitudes must lie in [-90, 90], got {} .. {}",
                r.min_latitude, r.max_latitude
            )));
        }
        if !(-180.0..=180.0).contains(&r.min_longitude)
            || !(-180.0..=180.0).contains(&r.max_longitude)
        {
            return Err(Error::config_validation(format!(
                "longitudes must lie in [-180, 180], got {} .. {}",
                r.min_longitude, r.max_longitude
            )));
        }
        if r.min_latitude >= r.max_latitude {
            return Err(Error::config_validation(format!(
                "min_latitude ({}) must be less than max_latitude ({})",
                r.min_latitude, r.max_latitude
            )));
        }
        if r.min_longitude >= r.max_longitude {
            return Err(Error::config_validation(format!(
                "min_longitude ({}) must be less than max_longitude ({})",
                r.min_longitude, r.max_longitude
            )));
        }

        if self.watch.refresh_interval_secs == 0 {
            return Err(Error::config_validation(
                "refresh_interval_secs must be greater than 0",
            ));
        }

        if self.api.base_url.is_empty() {
            return Err(Error::config_validation("api base_url must not be empty"));
        }

        Ok(())
    }

    /// The configured bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min_latitude: self.region.min_latitude,
            max_latitude: self.region.max_latitude,
            min_longitude: self.region.min_longitude,
            max_longitude: self.region.max_longitude,
        }
    }

    /// Basic credentials, when both username and password are set and
    /// non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.api.username, &self.api.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some((user.clone(), pass.clone()))
            }
            _ => None,
        }
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the model parameter path, resolving defaults if not set.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.storage
            .model_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(MODEL_FILE_NAME))
    }

    /// Get the scaler parameter path, resolving defaults if not set.
    #[must_use]
    pub fn scaler_path(&self) -> PathBuf {
        self.storage
            .scaler_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SCALER_FILE_NAME))
    }

    /// Get the refresh interval as a Duration.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.watch.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "https://opensky-network.org/api");
        assert!(config.api.username.is_none());
        assert_eq!(config.watch.refresh_interval_secs, 60);
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_default_region() {
        let region = RegionConfig::default();

        assert!((region.min_latitude - 41.0).abs() < f64::EPSILON);
        assert!((region.max_latitude - 51.0).abs() < f64::EPSILON);
        assert!((region.min_longitude - (-5.0)).abs() < f64::EPSILON);
        assert!((region.max_longitude - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_inverted_latitudes() {
        let mut config = Config::default();
        config.region.min_latitude = 51.0;
        config.region.max_latitude = 41.0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("min_latitude"));
    }

    #[test]
    fn test_validate_latitude_out_of_range() {
        let mut config = Config::default();
        config.region.max_latitude = 91.0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("[-90, 90]"));
    }

    #[test]
    fn test_validate_longitude_out_of_range() {
        let mut config = Config::default();
        config.region.min_longitude = -181.0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("[-180, 180]"));
    }

    #[test]
    fn test_validate_zero_refresh_interval() {
        let mut config = Config::default();
        config.watch.refresh_interval_secs = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("refresh_interval_secs"));
    }

    #[test]
    fn test_validate_empty_base_url() {
        let mut config = Config::default();
        config.api.base_url = String::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bounding_box() {
        let config = Config::default();
        let bounds = config.bounding_box();

        assert!((bounds.min_latitude - 41.0).abs() < f64::EPSILON);
        assert!((bounds.max_longitude - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_credentials_absent_by_default() {
        let config = Config::default();
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_credentials_require_both_parts() {
        let mut config = Config::default();
        config.api.username = Some("user".to_string());
        assert!(config.credentials().is_none());

        config.api.password = Some("pass".to_string());
        assert_eq!(
            config.credentials(),
            Some(("user".to_string(), "pass".to_string()))
        );
    }

    #[test]
    fn test_credentials_reject_empty_strings() {
        let mut config = Config::default();
        config.api.username = Some(String::new());
        config.api.password = Some("pass".to_string());
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("flights.db"));
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
    fn test_model_paths_default_as_siblings() {
        let config = Config::default();
        let model = config.model_path();
        let scaler = config.scaler_path();

        assert!(model.to_string_lossy().contains("delay_model.json"));
        assert!(scaler.to_string_lossy().contains("delay_scaler.json"));
        assert_eq!(model.parent(), scaler.parent());
    }

    #[test]
    fn test_refresh_interval() {
        let config = Config::default();
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("skywatch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[region]
min_latitude = 30.0
max_latitude = 40.0

[watch]
refresh_interval_secs = 15
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert!((config.region.min_latitude - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.watch.refresh_interval_secs, 15);
        // Untouched sections keep their defaults
        assert!((config.region.min_longitude - (-5.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("base_url"));
        assert!(json.contains("refresh_interval_secs"));
    }
}

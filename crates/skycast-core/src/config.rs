use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides `geocoding.api_key`.
pub const GEOCODING_KEY_ENV: &str = "SKYCAST_GEOCODING_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub dates: DatesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reverse geocoding endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_url")]
    pub base_url: String,

    /// Google Maps API key. Falls back to `SKYCAST_GEOCODING_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Which ranked candidate becomes the place label.
    #[serde(default = "default_label_index")]
    pub label_index: usize,
}

fn default_geocoding_url() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".to_string()
}

fn default_label_index() -> usize {
    3
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_url(),
            api_key: None,
            label_index: default_label_index(),
        }
    }
}

impl GeocodingConfig {
    /// Key from config, else from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(GEOCODING_KEY_ENV).ok())
    }
}

/// Forecast service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_forecast_url")]
    pub base_url: String,

    /// Requests still pending after this many seconds count as failed.
    #[serde(default = "default_forecast_timeout")]
    pub timeout_secs: u64,
}

fn default_forecast_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_forecast_timeout() -> u64 {
    20
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: default_forecast_url(),
            timeout_secs: default_forecast_timeout(),
        }
    }
}

/// Where the device position comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    #[default]
    Ip,
    Static,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub provider: LocationProvider,

    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    /// Used when `provider = "static"`
    #[serde(default)]
    pub static_latitude: Option<f64>,
    #[serde(default)]
    pub static_longitude: Option<f64>,

    #[serde(default = "default_location_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,
}

fn default_ip_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_location_timeout() -> u64 {
    5
}

fn default_high_accuracy() -> bool {
    true
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: LocationProvider::default(),
            ip_lookup_url: default_ip_lookup_url(),
            static_latitude: None,
            static_longitude: None,
            timeout_secs: default_location_timeout(),
            high_accuracy: default_high_accuracy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatesConfig {
    /// Last selectable day, counted from today
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

fn default_horizon_days() -> u32 {
    180
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            geocoding: GeocodingConfig::default(),
            forecast: ForecastConfig::default(),
            location: LocationConfig::default(),
            dates: DatesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Errors fail the load with [`ConfigError::Invalid`]; warnings are
    /// returned for the caller to report once logging is up.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.geocoding.base_url, "geocoding.base_url", &mut result);
        validate_url(&self.forecast.base_url, "forecast.base_url", &mut result);

        if self.geocoding.resolved_api_key().is_none() {
            result.add_warning(
                "geocoding.api_key",
                "No geocoding API key - place names will stay unresolved",
            );
        }

        if self.forecast.timeout_secs == 0 {
            result.add_error("forecast.timeout_secs", "Timeout must be greater than 0");
        } else if self.forecast.timeout_secs > 300 {
            result.add_warning(
                "forecast.timeout_secs",
                "Forecast timeout is more than 5 minutes",
            );
        }

        if self.location.timeout_secs == 0 {
            result.add_error("location.timeout_secs", "Timeout must be greater than 0");
        }

        match self.location.provider {
            LocationProvider::Ip => {
                validate_url(&self.location.ip_lookup_url, "location.ip_lookup_url", &mut result)
            }
            LocationProvider::Static => match (self.location.static_latitude, self.location.static_longitude) {
                (Some(lat), Some(lng)) => {
                    if !(-90.0..=90.0).contains(&lat) {
                        result.add_error("location.static_latitude", "Latitude must be within [-90, 90]");
                    }
                    if !(-180.0..=180.0).contains(&lng) {
                        result.add_error("location.static_longitude", "Longitude must be within [-180, 180]");
                    }
                }
                _ => result.add_error(
                    "location",
                    "Static provider needs static_latitude and static_longitude",
                ),
            },
            LocationProvider::None => {}
        }

        if self.dates.horizon_days == 0 {
            result.add_warning("dates.horizon_days", "Only today can be selected");
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            result.add_error(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            );
        }

        result
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the default configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

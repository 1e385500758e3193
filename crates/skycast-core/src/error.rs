//! Centralized error types for SkyCast.
//!
//! `SyncError` is the taxonomy of everything that can go wrong while keeping
//! the point and forecast in sync. None of it is fatal: the controllers log it
//! and fall back to a sentinel state.

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Recover the typed error behind an `anyhow` chain, looking through any
    /// context that was attached on the way up.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ConfigError>() {
            Ok(e) => return AppError::Config(e),
            Err(err) => err,
        };
        let err = match err.downcast::<SyncError>() {
            Ok(e) => return AppError::Sync(e),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(e) => AppError::Io(e),
            Err(err) => AppError::Other(err),
        }
    }

    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Sync(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.".to_string(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Failures while tracking the selected point and its forecast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Geolocation unavailable: {0}")]
    GeolocationUnavailable(String),

    #[error("Geolocation permission denied")]
    GeolocationDenied,

    #[error("Reverse geocoding failed: {0}")]
    GeocodeLookupFailed(String),

    #[error("Forecast fetch failed: {0}")]
    ForecastFetchFailed(String),

    #[error("Date {date} is outside the selectable range {min}..={max}")]
    InvalidDateSelection {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
}

impl SyncError {
    pub fn user_message(&self) -> String {
        match self {
            SyncError::GeolocationUnavailable(_) => {
                "Couldn't find your location. Click the map to pick a point.".to_string()
            }
            SyncError::GeolocationDenied => {
                "Location access was denied. Click the map to pick a point.".to_string()
            }
            SyncError::GeocodeLookupFailed(_) => {
                "Couldn't look up a name for this place.".to_string()
            }
            SyncError::ForecastFetchFailed(_) => "Forecast unavailable. Try again later.".to_string(),
            SyncError::InvalidDateSelection { min, max, .. } => {
                format!("Pick a date between {} and {}.", min, max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let sync_err = SyncError::GeolocationDenied;
        let app_err: AppError = sync_err.into();
        assert!(matches!(app_err, AppError::Sync(SyncError::GeolocationDenied)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Sync(SyncError::ForecastFetchFailed("status 500".into()));
        assert_eq!(app_err.user_message(), "Forecast unavailable. Try again later.");
    }

    #[test]
    fn test_invalid_date_message_uses_window_bounds() {
        let d = |month, day| NaiveDate::from_ymd_opt(2026, month, day).unwrap();
        let err = SyncError::InvalidDateSelection {
            date: d(12, 1),
            min: d(10, 19),
            max: d(11, 18),
        };
        assert_eq!(err.user_message(), "Pick a date between 2026-10-19 and 2026-11-18.");
    }

    #[test]
    fn test_from_anyhow_finds_config_error_behind_context() {
        let err = anyhow::Error::new(ConfigError::Invalid("forecast.timeout_secs".into()))
            .context("Failed to start");
        let app_err = AppError::from_anyhow(err);
        assert!(matches!(app_err, AppError::Config(ConfigError::Invalid(_))));
        assert_eq!(app_err.user_message(), "Invalid configuration. Check your settings.");
    }

    #[test]
    fn test_from_anyhow_classifies_io_and_other() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
        let err = anyhow::Error::new(io).context("Failed to read config file");
        assert!(matches!(AppError::from_anyhow(err), AppError::Io(_)));

        let other = AppError::from_anyhow(anyhow::anyhow!("boom"));
        assert!(matches!(other, AppError::Other(_)));
    }

    #[test]
    fn test_from_anyhow_keeps_sync_error() {
        let err = anyhow::Error::new(SyncError::GeolocationDenied);
        assert!(matches!(
            AppError::from_anyhow(err),
            AppError::Sync(SyncError::GeolocationDenied)
        ));
    }

    #[test]
    fn test_invalid_date_display() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
        let err = SyncError::InvalidDateSelection {
            date: d(18),
            min: d(19),
            max: d(30),
        };
        assert_eq!(
            err.to_string(),
            "Date 2026-10-18 is outside the selectable range 2026-10-19..=2026-10-30"
        );
    }
}

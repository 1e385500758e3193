use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The point currently selected on the map.
///
/// `is_user_set` separates the startup default from a point that was chosen by
/// a click or by geolocation. Points are replaced wholesale, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub is_user_set: bool,
}

impl GeoPoint {
    /// The startup default: `{0, 0}` and never chosen.
    pub const UNSET: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
        is_user_set: false,
    };

    /// A point explicitly chosen by the user (click or geolocation).
    pub fn chosen(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            is_user_set: true,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Raw coordinates as reported by a map click or a location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: None,
        }
    }
}

/// Human-readable name for the current point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaceLabel {
    /// No reverse-geocoding result for the current point (yet).
    #[default]
    Unresolved,
    Resolved(String),
}

impl PlaceLabel {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Resolved(s) => Some(s),
            Self::Unresolved => None,
        }
    }
}

impl fmt::Display for PlaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(s) => f.write_str(s),
            Self::Unresolved => f.write_str("(unresolved)"),
        }
    }
}

/// Body of `POST /api/forecast`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Serialized as `YYYY-MM-DD`.
    pub target_date: NaiveDate,
}

impl ForecastRequest {
    pub fn new(point: GeoPoint, target_date: NaiveDate) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            target_date,
        }
    }
}

/// Typed view over the forecast endpoint response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub query_date: String,
    pub climatological_probability_and_means: ClimatologySummary,
    #[serde(default)]
    pub short_term_forecast_details: Option<serde_json::Value>,
    pub air_quality_context: AirQualityContext,
    pub data_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatologySummary {
    pub date_context: String,
    pub climatological_means: ClimatologicalMeans,
    pub probabilities: RiskProbabilities,
}

/// Long-term daily means for the target day. Values are `None` when the
/// backend had no samples (it reports `null` for NaN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatologicalMeans {
    pub avg_tmax_c: Option<f64>,
    pub avg_tmin_c: Option<f64>,
    pub avg_humidity_percent: Option<f64>,
    pub avg_wind_speed_ms: Option<f64>,
    pub avg_pressure_hpa: Option<f64>,
    pub avg_uv_index: Option<f64>,
    pub avg_discomfort_index_c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProbabilities {
    pub p_rain_percent: Option<f64>,
    pub p_extreme_heat_percent: Option<f64>,
    pub p_extreme_wind_percent: Option<f64>,
    pub main_risk_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityContext {
    pub pm25_concentration: Option<f64>,
    pub pm10_concentration: Option<f64>,
}

/// A forecast body exactly as received. Any JSON counts; `report` is the
/// typed view when the body has the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPayload {
    pub raw: serde_json::Value,
    pub report: Option<ForecastReport>,
}

impl ForecastPayload {
    pub fn from_value(raw: serde_json::Value) -> Self {
        let report = match ForecastReport::deserialize(&raw) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::debug!("Forecast body has no typed view: {}", e);
                None
            }
        };
        Self { raw, report }
    }
}

/// What the presentation layer shows for the current (point, date) pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ForecastResult {
    /// Nothing to show: fetch pending, failed, or never issued.
    #[default]
    NoData,
    Ready(Arc<ForecastPayload>),
}

impl ForecastResult {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn payload(&self) -> Option<&ForecastPayload> {
        match self {
            Self::Ready(p) => Some(p),
            Self::NoData => None,
        }
    }
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Reverse geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Geocoding endpoint returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Geocoding request timed out")]
    Timeout,
}

/// Forecast endpoint errors
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Forecast endpoint returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Forecast request timed out")]
    Timeout,
}

//! Fakes for controller tests. Gated fakes hold every call open until the
//! test releases it, so completions can be delivered in any order.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use skycast_weather::{
    Coordinates, FixedClock, ForecastError, ForecastPayload, ForecastRequest, ForecastSource,
    GeoPoint, GeocodeError, Geolocator, LocationError, PlaceLabel, PositionOptions,
    ReverseGeocoder,
};
use tokio::sync::oneshot;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(today()))
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn forecast_body(summary: &str) -> serde_json::Value {
    serde_json::json!({
        "query_date": "2026-10-19",
        "climatological_probability_and_means": {
            "date_context": "Historical 10-19",
            "climatological_means": {
                "avg_tmax_c": 32.1, "avg_tmin_c": 25.0, "avg_humidity_percent": 79.3,
                "avg_wind_speed_ms": 2.2, "avg_pressure_hpa": 1009.4,
                "avg_uv_index": null, "avg_discomfort_index_c": 30.2
            },
            "probabilities": {
                "p_rain_percent": 58.0, "p_extreme_heat_percent": 6.5,
                "p_extreme_wind_percent": 0.5, "main_risk_level": "rain"
            }
        },
        "short_term_forecast_details": null,
        "air_quality_context": { "pm25_concentration": 21.4, "pm10_concentration": 30.0 },
        "data_summary": summary
    })
}

pub fn payload(summary: &str) -> ForecastPayload {
    ForecastPayload::from_value(forecast_body(summary))
}

/// Let spawned tasks run until `ready` holds.
pub async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(ready(), "condition not reached");
}

type Pending<Req, Resp> = Mutex<Vec<(Req, oneshot::Sender<Resp>)>>;

/// Geocoder that answers only when released.
#[derive(Default)]
pub struct GatedGeocoder {
    pending: Pending<GeoPoint, Result<PlaceLabel, GeocodeError>>,
    calls: Mutex<Vec<GeoPoint>>,
}

impl GatedGeocoder {
    pub fn calls(&self) -> Vec<GeoPoint> {
        self.calls.lock().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Answer the oldest open call for `point`.
    pub fn release(&self, point: GeoPoint, result: Result<PlaceLabel, GeocodeError>) {
        let mut pending = self.pending.lock();
        let idx = pending.iter().position(|(p, _)| *p == point);
        assert!(idx.is_some(), "no open geocode call for {}", point);
        if let Some(idx) = idx {
            let (_, tx) = pending.remove(idx);
            let _ = tx.send(result);
        }
    }
}

#[async_trait]
impl ReverseGeocoder for GatedGeocoder {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<PlaceLabel, GeocodeError> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().push(point);
        self.pending.lock().push((point, tx));
        rx.await
            .unwrap_or_else(|_| Err(GeocodeError::Parse("gate dropped".into())))
    }
}

/// Geocoder that answers every call at once with a label derived from the
/// point.
#[derive(Default)]
pub struct InstantGeocoder {
    calls: Mutex<Vec<GeoPoint>>,
}

impl InstantGeocoder {
    pub fn label_for(point: GeoPoint) -> PlaceLabel {
        PlaceLabel::Resolved(format!("Place near {}", point))
    }

    pub fn calls(&self) -> Vec<GeoPoint> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ReverseGeocoder for InstantGeocoder {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<PlaceLabel, GeocodeError> {
        self.calls.lock().push(point);
        Ok(Self::label_for(point))
    }
}

pub struct FailingGeocoder;

#[async_trait]
impl ReverseGeocoder for FailingGeocoder {
    async fn reverse_geocode(&self, _point: GeoPoint) -> Result<PlaceLabel, GeocodeError> {
        Err(GeocodeError::Status(503))
    }
}

/// Geolocator that answers only when released.
#[derive(Default)]
pub struct GatedGeolocator {
    pending: Pending<(), Result<Coordinates, LocationError>>,
    calls: Mutex<usize>,
}

impl GatedGeolocator {
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn release(&self, result: Result<Coordinates, LocationError>) {
        let mut pending = self.pending.lock();
        assert!(!pending.is_empty(), "no open geolocation call");
        let (_, tx) = pending.remove(0);
        let _ = tx.send(result);
    }
}

#[async_trait]
impl Geolocator for GatedGeolocator {
    async fn current_position(&self, _options: PositionOptions) -> Result<Coordinates, LocationError> {
        let (tx, rx) = oneshot::channel();
        *self.calls.lock() += 1;
        self.pending.lock().push(((), tx));
        rx.await.unwrap_or(Err(LocationError::ServiceUnavailable))
    }
}

pub struct DeniedGeolocator;

#[async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(&self, _options: PositionOptions) -> Result<Coordinates, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

/// Forecast source that answers only when released.
#[derive(Default)]
pub struct GatedForecasts {
    pending: Pending<ForecastRequest, Result<ForecastPayload, ForecastError>>,
    calls: Mutex<Vec<ForecastRequest>>,
}

impl GatedForecasts {
    pub fn calls(&self) -> Vec<ForecastRequest> {
        self.calls.lock().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Answer the oldest open call for `request`.
    pub fn release(
        &self,
        request: ForecastRequest,
        result: Result<ForecastPayload, ForecastError>,
    ) {
        let mut pending = self.pending.lock();
        let idx = pending.iter().position(|(r, _)| *r == request);
        assert!(idx.is_some(), "no open forecast call for {:?}", request);
        if let Some(idx) = idx {
            let (_, tx) = pending.remove(idx);
            let _ = tx.send(result);
        }
    }
}

#[async_trait]
impl ForecastSource for GatedForecasts {
    async fn fetch(&self, request: ForecastRequest) -> Result<ForecastPayload, ForecastError> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().push(request);
        self.pending.lock().push((request, tx));
        rx.await
            .unwrap_or_else(|_| Err(ForecastError::Parse("gate dropped".into())))
    }
}

/// Forecast source that answers every call at once with the same outcome.
pub struct InstantForecasts {
    status: Option<u16>,
    calls: Mutex<Vec<ForecastRequest>>,
}

impl InstantForecasts {
    pub fn ok() -> Self {
        Self {
            status: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            status: Some(status),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ForecastRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ForecastSource for InstantForecasts {
    async fn fetch(&self, request: ForecastRequest) -> Result<ForecastPayload, ForecastError> {
        self.calls.lock().push(request);
        match self.status {
            Some(status) => Err(ForecastError::Status(status)),
            None => Ok(payload(&format!(
                "Forecast for {}, {}",
                request.latitude, request.longitude
            ))),
        }
    }
}

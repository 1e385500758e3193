//! Device location providers.
//!
//! A desktop process has no browser geolocation, so the default provider asks
//! an IP geolocation service. A fixed position from config and an "absent"
//! provider cover the remaining setups.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{Coordinates, LocationError};

pub const IP_LOOKUP_URL: &str = "http://ip-api.com/json";
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for a single position lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Prefer an accurate fix over a fast one.
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_LOCATION_TIMEOUT,
        }
    }
}

/// Platform location capability.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// False when this host has no way to locate itself.
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self, options: PositionOptions) -> Result<Coordinates, LocationError>;
}

/// No location capability on this host.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGeolocator;

#[async_trait]
impl Geolocator for UnavailableGeolocator {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(&self, _options: PositionOptions) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// Always reports the configured position.
#[derive(Debug, Clone, Copy)]
pub struct StaticGeolocator(pub Coordinates);

#[async_trait]
impl Geolocator for StaticGeolocator {
    async fn current_position(&self, _options: PositionOptions) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
}

/// Approximate position from the public IP address.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>) -> Result<Self, LocationError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LocationError::Other(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    #[tracing::instrument(skip(self))]
    async fn current_position(&self, options: PositionOptions) -> Result<Coordinates, LocationError> {
        if options.high_accuracy {
            tracing::debug!("IP lookup cannot honor high accuracy; using city-level fix");
        }

        // Bounds the whole lookup, body included.
        match tokio::time::timeout(options.timeout, self.lookup()).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        }
    }
}

impl IpGeolocator {
    async fn lookup(&self) -> Result<Coordinates, LocationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::Other(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::Other(format!(
                "IP lookup returned status {}",
                response.status()
            )));
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Other(e.to_string()))?;

        if body.status.as_deref() == Some("fail") {
            return Err(LocationError::Other(
                body.message.unwrap_or_else(|| "IP lookup failed".to_string()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                tracing::info!("Got location: {}, {}", lat, lon);
                Ok(Coordinates {
                    latitude: lat,
                    longitude: lon,
                    // City-level fix
                    accuracy_meters: Some(5_000.0),
                })
            }
            _ => Err(LocationError::Other("IP lookup returned no coordinates".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_unavailable_reports_service_unavailable() {
        let locator = UnavailableGeolocator;
        assert!(!locator.is_available());
        let result = locator.current_position(PositionOptions::default()).await;
        assert_eq!(result, Err(LocationError::ServiceUnavailable));
    }

    #[tokio::test]
    async fn test_static_returns_configured_position() {
        let locator = StaticGeolocator(Coordinates::new(10.76, 106.66));
        let pos = locator.current_position(PositionOptions::default()).await.unwrap();
        assert_eq!(pos, Coordinates::new(10.76, 106.66));
    }

    #[tokio::test]
    async fn test_ip_lookup_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "lat": 21.0285,
                "lon": 105.8542
            })))
            .mount(&server)
            .await;

        let locator = IpGeolocator::new(format!("{}/json", server.uri())).unwrap();
        let pos = locator.current_position(PositionOptions::default()).await.unwrap();
        assert_eq!(pos.latitude, 21.0285);
        assert_eq!(pos.longitude, 105.8542);
    }

    #[tokio::test]
    async fn test_ip_lookup_fail_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "message": "private range"
            })))
            .mount(&server)
            .await;

        let locator = IpGeolocator::new(server.uri()).unwrap();
        let result = locator.current_position(PositionOptions::default()).await;
        assert_eq!(result, Err(LocationError::Other("private range".to_string())));
    }

    #[tokio::test]
    async fn test_ip_lookup_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({"lat": 1.0, "lon": 2.0})),
            )
            .mount(&server)
            .await;

        let locator = IpGeolocator::new(server.uri()).unwrap();
        let options = PositionOptions {
            high_accuracy: true,
            timeout: Duration::from_millis(50),
        };
        let result = locator.current_position(options).await;
        assert_eq!(result, Err(LocationError::Timeout));
    }
}

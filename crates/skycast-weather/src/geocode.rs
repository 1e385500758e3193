//! Reverse geocoding: convert a map point to a human-readable place name.
//! Talks to the Google Geocoding API (`latlng` + `key`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{GeoPoint, GeocodeError, PlaceLabel};

pub const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Candidates come back ordered from most to least specific; index 3 is
/// usually district/city level.
pub const DEFAULT_LABEL_INDEX: usize = 3;

const REQUEST_TIMEOUT_SECS: u64 = 20;
const USER_AGENT: &str = "SkyCast/0.1.0";

/// Resolves a point to a place label.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<PlaceLabel, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeCandidate {
    pub formatted_address: String,
}

/// Take the candidate at `index`, or `Unresolved` if the list is too short.
pub fn pick_label(candidates: &[GeocodeCandidate], index: usize) -> PlaceLabel {
    candidates
        .get(index)
        .map(|c| PlaceLabel::Resolved(c.formatted_address.clone()))
        .unwrap_or(PlaceLabel::Unresolved)
}

#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    api_key: String,
    label_index: usize,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeocodeError> {
        Self::with_base_url(GOOGLE_GEOCODE_URL, api_key, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            label_index: DEFAULT_LABEL_INDEX,
        })
    }

    /// Override which candidate becomes the label.
    pub fn with_label_index(mut self, index: usize) -> Self {
        self.label_index = index;
        self
    }
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    #[tracing::instrument(skip(self), fields(lat = point.latitude, lng = point.longitude))]
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<PlaceLabel, GeocodeError> {
        let latlng = format!("{},{}", point.latitude, point.longitude);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let label = pick_label(&body.results, self.label_index);
        match &label {
            PlaceLabel::Resolved(name) => tracing::info!("Reverse geocoded to: {}", name),
            PlaceLabel::Unresolved => tracing::debug!(
                "Only {} geocode candidates, none at index {}",
                body.results.len(),
                self.label_index
            ),
        }
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(n: usize) -> Vec<GeocodeCandidate> {
        (0..n)
            .map(|i| GeocodeCandidate {
                formatted_address: format!("candidate {}", i),
            })
            .collect()
    }

    #[test]
    fn test_pick_label_uses_fixed_index() {
        assert_eq!(
            pick_label(&candidates(6), DEFAULT_LABEL_INDEX),
            PlaceLabel::Resolved("candidate 3".to_string())
        );
    }

    #[test]
    fn test_pick_label_short_list_is_unresolved() {
        assert_eq!(pick_label(&candidates(3), DEFAULT_LABEL_INDEX), PlaceLabel::Unresolved);
        assert_eq!(pick_label(&[], DEFAULT_LABEL_INDEX), PlaceLabel::Unresolved);
    }

    #[test]
    fn test_response_without_results_parses() {
        let body: GeocodeResponse =
            serde_json::from_str(r#"{"status":"ZERO_RESULTS"}"#).unwrap();
        assert!(body.results.is_empty());
    }
}

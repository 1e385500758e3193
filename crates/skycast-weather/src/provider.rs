//! Client for the climatological forecast service (`POST /api/forecast`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::types::{ForecastError, ForecastPayload, ForecastRequest};

pub const DEFAULT_FORECAST_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

const FORECAST_PATH: &str = "/api/forecast";

/// Source of forecasts for a (point, date) pair.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch(&self, request: ForecastRequest) -> Result<ForecastPayload, ForecastError>;
}

#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ForecastError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, FORECAST_PATH)
    }
}

#[async_trait]
impl ForecastSource for ForecastClient {
    #[tracing::instrument(skip(self), fields(lat = request.latitude, lng = request.longitude, date = %request.target_date))]
    async fn fetch(&self, request: ForecastRequest) -> Result<ForecastPayload, ForecastError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForecastError::Timeout
                } else {
                    ForecastError::Network(e)
                }
            })?;

        // Only a plain 200 counts; anything else is treated as no data.
        if response.status() != StatusCode::OK {
            return Err(ForecastError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ForecastError::Parse(e.to_string()))?;

        let payload = ForecastPayload::from_value(body);
        match &payload.report {
            Some(report) => tracing::info!("Forecast received: {}", report.data_summary),
            None => tracing::info!("Forecast received in an unrecognized shape"),
        }
        Ok(payload)
    }
}

//! OpenAQ v3 measurements client.
//!
//! OpenAQ aggregates air-quality readings from government and research
//! monitors. Measurements are listed per sensor and can be rolled up to daily
//! aggregates.
//!
//! # API Reference
//!
//! See: <https://docs.openaq.org/>
//!
//! # Authentication
//!
//! Every request needs an API key, sent in the `X-API-Key` header.
//!
//! # Pagination
//!
//! Results are paginated oldest-first. The caller picks the page index; this
//! client never advances a cursor on its own.

use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use super::fetch_json;
use crate::error::Result;

/// Base URL for the OpenAQ v3 API.
const OPENAQ_API_BASE: &str = "https://api.openaq.org/v3";

/// Client for the OpenAQ v3 API.
#[derive(Clone)]
pub struct OpenAqClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAqClient {
    /// Create a new OpenAQ client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Key obtained from an OpenAQ account.
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(OPENAQ_API_BASE, api_key)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// List daily aggregates for one sensor.
    ///
    /// # Arguments
    ///
    /// * `sensor_id` - OpenAQ sensor identifier
    /// * `limit` - Page size
    /// * `page` - 1-based page index
    #[instrument(skip(self))]
    pub async fn get_sensor_days(&self, sensor_id: u32, limit: u32, page: u32) -> Result<Value> {
        let url = format!(
            "{}/sensors/{}/days?limit={}&page={}",
            self.base_url, sensor_id, limit, page
        );

        let request = self.client.get(&url).header("X-API-Key", &self.api_key);
        fetch_json("openaq", request).await
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Body of a measurements listing.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAqMeasurementsResponse {
    pub results: Vec<OpenAqMeasurement>,
}

/// One aggregated measurement.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAqMeasurement {
    /// Mean over the aggregation period.
    pub value: Option<f64>,

    pub parameter: OpenAqParameter,

    pub period: OpenAqPeriod,

    pub summary: OpenAqSummary,
}

/// The measured pollutant.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAqParameter {
    pub name: String,
    pub units: String,
}

/// The time span a measurement covers.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAqPeriod {
    #[serde(rename = "datetimeFrom")]
    pub datetime_from: OpenAqDatetime,
}

/// A timestamp in both UTC and sensor-local time.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAqDatetime {
    pub utc: String,
    pub local: String,
}

/// Distribution statistics over the aggregation period.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAqSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub avg: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::HeaderMap,
        routing::get,
    };
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_get_sensor_days_sends_key_and_page() {
        let app = Router::new().route(
            "/sensors/:id/days",
            get(
                |Path(id): Path<u32>,
                 headers: HeaderMap,
                 Query(params): Query<HashMap<String, String>>| async move {
                    let key = headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({ "id": id, "key": key, "params": params, "results": [] }))
                },
            ),
        );
        let base = serve(app).await;
        let client = OpenAqClient::with_base_url(&base, "secret");

        let data = client.get_sensor_days(1972, 1000, 3).await.unwrap();

        assert_eq!(data["id"], 1972);
        assert_eq!(data["key"], "secret");
        assert_eq!(data["params"]["limit"], "1000");
        assert_eq!(data["params"]["page"], "3");
    }
}

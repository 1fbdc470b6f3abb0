//! Open-Meteo historical weather archive client.
//!
//! The archive serves reanalysis-based daily aggregates for any coordinate,
//! without authentication.
//!
//! # API Reference
//!
//! See: <https://open-meteo.com/en/docs/historical-weather-api>

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use super::fetch_json;
use crate::error::Result;

/// Base URL for the Open-Meteo archive API.
const OPEN_METEO_API_BASE: &str = "https://archive-api.open-meteo.com/v1";

/// Daily metrics requested from the archive, in response order.
const DAILY_METRICS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,rain_sum,snowfall_sum";

/// Client for the Open-Meteo archive API.
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoClient {
    /// Create a new Open-Meteo client with default settings.
    pub fn new() -> Self {
        Self::with_base_url(OPEN_METEO_API_BASE)
    }

    /// Create a new Open-Meteo client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch daily weather for one point over an inclusive date range.
    ///
    /// Temperatures are requested in Fahrenheit.
    ///
    /// # Arguments
    ///
    /// * `latitude`, `longitude` - The point to query
    /// * `start_date`, `end_date` - Inclusive date range
    /// * `timezone` - IANA timezone used to cut days (e.g. "America/New_York")
    #[instrument(skip(self))]
    pub async fn get_daily_weather(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        timezone: &str,
    ) -> Result<Value> {
        let url = format!(
            "{}/archive?latitude={}&longitude={}&start_date={}&end_date={}&daily={}&temperature_unit=fahrenheit&timezone={}",
            self.base_url,
            latitude,
            longitude,
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d"),
            DAILY_METRICS,
            urlencoding::encode(timezone)
        );

        fetch_json("open-meteo", self.client.get(&url)).await
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Body of a successful archive response.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenMeteoResponse {
    /// Latitude of the grid cell the archive answered for.
    pub latitude: f64,

    /// Longitude of the grid cell the archive answered for.
    pub longitude: f64,

    /// Parallel arrays, one entry per day.
    pub daily: OpenMeteoDaily,
}

/// The `daily` block: one array per requested metric, aligned with `time`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenMeteoDaily {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub precipitation_sum: Vec<Option<f64>>,
    pub rain_sum: Vec<Option<f64>>,
    pub snowfall_sum: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::{Json, Router, extract::Query, routing::get};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_get_daily_weather_sends_query() {
        let app = Router::new().route(
            "/archive",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({ "echo": params }))
            }),
        );
        let base = serve(app).await;
        let client = OpenMeteoClient::with_base_url(&base);

        let data = client
            .get_daily_weather(
                33.8034,
                -84.3963,
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                "America/New_York",
            )
            .await
            .unwrap();

        let echo = &data["echo"];
        assert_eq!(echo["start_date"], "2023-01-01");
        assert_eq!(echo["end_date"], "2023-01-02");
        assert_eq!(echo["temperature_unit"], "fahrenheit");
        assert_eq!(echo["timezone"], "America/New_York");
        assert_eq!(echo["daily"], DAILY_METRICS);
    }
}

//! Orchestration of one ETL run.
//!
//! A run fetches weather, crashes and ozone for the configured area, shapes
//! each response, enriches crash case details, and replaces the stored
//! tables. Every step is awaited in order.

use chrono::{Datelike, NaiveDate};
use tracing::{info, instrument};

use crate::config::{EnrichmentSource, PipelineConfig};
use crate::data_sources::{NhtsaClient, OpenAqClient, OpenMeteoClient};
use crate::enrich::CaseDetailEnricher;
use crate::error::Result;
use crate::storage::{LoadCounts, Storage};
use crate::transform::{transform_crashes, transform_ozone, transform_weather};

/// Years between today and the start of the weather window.
const WEATHER_START_YEARS_AGO: i32 = 3;

/// Years between today and the end of the weather window.
///
/// Crash detail is published with a lag, so weather is taken from a period
/// that already has crash dates.
const WEATHER_END_YEARS_AGO: i32 = 2;

/// Number of case years before the current one included in the crash query.
const CRASH_YEARS_BACK: i32 = 3;

/// What a run wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub loaded: LoadCounts,
    /// Cases whose detail was requested during this run.
    pub cases_fetched: usize,
    /// Cases whose detail request failed; retried on the next run.
    pub cases_failed: usize,
}

/// The same calendar day `years` years earlier. February 29 becomes
/// February 28 in non-leap years.
pub fn years_before(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() - years;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}

/// Inclusive date range for the weather query.
pub fn weather_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (
        years_before(today, WEATHER_START_YEARS_AGO),
        years_before(today, WEATHER_END_YEARS_AGO),
    )
}

/// Inclusive case-year range for the crash query.
pub fn crash_window(today: NaiveDate) -> (i32, i32) {
    (today.year() - CRASH_YEARS_BACK, today.year())
}

/// One configured pipeline with its upstream clients and store.
pub struct Pipeline {
    config: PipelineConfig,
    storage: Storage,
    weather: OpenMeteoClient,
    crashes: NhtsaClient,
    air_quality: OpenAqClient,
}

impl Pipeline {
    /// Create a pipeline talking to the public APIs.
    pub fn new(config: PipelineConfig, storage: Storage) -> Self {
        let air_quality = OpenAqClient::new(&config.openaq_api_key);
        Self::with_clients(
            config,
            storage,
            OpenMeteoClient::new(),
            NhtsaClient::new(),
            air_quality,
        )
    }

    /// Create a pipeline with explicit clients (for testing).
    pub fn with_clients(
        config: PipelineConfig,
        storage: Storage,
        weather: OpenMeteoClient,
        crashes: NhtsaClient,
        air_quality: OpenAqClient,
    ) -> Self {
        Self {
            config,
            storage,
            weather,
            crashes,
            air_quality,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Execute one full run with windows anchored on `today`.
    ///
    /// Any failed fetch or malformed response stops the run before the
    /// store is touched. A database error during loading can leave some
    /// tables replaced and others not.
    #[instrument(skip(self), fields(source = ?self.config.enrichment_source))]
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        let config = &self.config;
        let (weather_start, weather_end) = weather_window(today);
        let (crash_from, crash_to) = crash_window(today);

        info!(%weather_start, %weather_end, "Fetching weather");
        let weather_data = self
            .weather
            .get_daily_weather(
                config.latitude,
                config.longitude,
                weather_start,
                weather_end,
                &config.timezone,
            )
            .await?;

        info!(crash_from, crash_to, "Fetching crashes");
        let crash_data = self
            .crashes
            .get_crashes_by_location(config.state_code, config.county_code, crash_from, crash_to)
            .await?;

        info!(
            sensor_id = config.sensor_id,
            page = config.ozone_page,
            "Fetching ozone measurements"
        );
        let ozone_data = self
            .air_quality
            .get_sensor_days(config.sensor_id, config.ozone_limit, config.ozone_page)
            .await?;

        let weather = transform_weather(weather_data)?;
        let crashes = transform_crashes(crash_data)?;
        let ozone = transform_ozone(ozone_data)?;

        let enrich_from = match config.enrichment_source {
            EnrichmentSource::Persisted => self.storage.read_crashes().await?,
            EnrichmentSource::Fetched => crashes.clone(),
        };

        let enricher =
            CaseDetailEnricher::new(&self.crashes, config.state_code, config.pacing_delay);
        let enrichment = enricher.enrich(&self.storage, &enrich_from).await?;

        let loaded = self
            .storage
            .load_all(&weather, &crashes, &enrichment.details, &ozone)
            .await?;

        let summary = RunSummary {
            loaded,
            cases_fetched: enrichment.fetched,
            cases_failed: enrichment.failed,
        };
        info!(?summary, "Run complete");

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weather_window() {
        let (start, end) = weather_window(date(2026, 10, 19));

        assert_eq!(start, date(2023, 10, 19));
        assert_eq!(end, date(2024, 10, 19));
    }

    #[test]
    fn test_weather_window_leap_day() {
        let (start, end) = weather_window(date(2028, 2, 29));

        assert_eq!(start, date(2025, 2, 28));
        assert_eq!(end, date(2026, 2, 28));
    }

    #[test]
    fn test_crash_window() {
        assert_eq!(crash_window(date(2026, 10, 19)), (2023, 2026));
    }

    #[test]
    fn test_years_before_keeps_leap_day_in_leap_year() {
        assert_eq!(years_before(date(2028, 2, 29), 4), date(2024, 2, 29));
    }
}

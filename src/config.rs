//! Pipeline configuration.
//!
//! Configuration is read once at startup from environment variables and is
//! read-only afterwards. Every value except the OpenAQ API key has a default
//! matching the Atlanta (Fulton County, GA) study area.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{EtlError, Result};

/// Default SQLite connection string.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:crashinfo.db?mode=rwc";

/// Default point queried for weather (Georgia Tech, Atlanta).
pub const DEFAULT_LATITUDE: f64 = 33.8034;
pub const DEFAULT_LONGITUDE: f64 = -84.3963;

/// Default timezone used to bucket daily weather.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Default NHTSA jurisdiction: Georgia (13), Fulton County (121).
pub const DEFAULT_STATE_CODE: u32 = 13;
pub const DEFAULT_COUNTY_CODE: u32 = 121;

/// Default OpenAQ sensor: the Georgia Tech ozone monitor.
pub const DEFAULT_SENSOR_ID: u32 = 1972;

/// Default number of daily measurements requested per page.
pub const DEFAULT_OZONE_LIMIT: u32 = 1000;

/// Default OpenAQ page index.
///
/// This is a fixed choice, not derived from the weather or crash windows. As
/// the sensor accumulates history the page covering a given period moves, so
/// this value has to be revisited by hand.
pub const DEFAULT_OZONE_PAGE: u32 = 3;

/// Default wait before each per-case detail request, in milliseconds.
pub const DEFAULT_PACING_DELAY_MS: u64 = 2000;

/// Which crash set the case-detail enricher works from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrichmentSource {
    /// The `crashes` table as stored before the current run is loaded.
    #[default]
    Persisted,
    /// The crashes fetched and transformed during the current run.
    Fetched,
}

impl FromStr for EnrichmentSource {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persisted" => Ok(EnrichmentSource::Persisted),
            "fetched" => Ok(EnrichmentSource::Fetched),
            other => Err(EtlError::Config(format!(
                "unknown enrichment source '{other}' (expected 'persisted' or 'fetched')"
            ))),
        }
    }
}

/// Everything the orchestrator needs to run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub state_code: u32,
    pub county_code: u32,
    pub sensor_id: u32,
    pub ozone_limit: u32,
    /// See [`DEFAULT_OZONE_PAGE`] for why this is explicit.
    pub ozone_page: u32,
    pub openaq_api_key: String,
    pub pacing_delay: Duration,
    pub enrichment_source: EnrichmentSource,
}

impl PipelineConfig {
    /// Build a configuration with defaults and the given OpenAQ key.
    pub fn with_api_key(openaq_api_key: &str) -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            timezone: DEFAULT_TIMEZONE.to_string(),
            state_code: DEFAULT_STATE_CODE,
            county_code: DEFAULT_COUNTY_CODE,
            sensor_id: DEFAULT_SENSOR_ID,
            ozone_limit: DEFAULT_OZONE_LIMIT,
            ozone_page: DEFAULT_OZONE_PAGE,
            openaq_api_key: openaq_api_key.to_string(),
            pacing_delay: Duration::from_millis(DEFAULT_PACING_DELAY_MS),
            enrichment_source: EnrichmentSource::default(),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Environment Variables
    ///
    /// - `OPENAQ_API_KEY` (required)
    /// - `ETL_DATABASE_URL`, `ETL_LATITUDE`, `ETL_LONGITUDE`, `ETL_TIMEZONE`
    /// - `ETL_STATE_CODE`, `ETL_COUNTY_CODE`
    /// - `ETL_SENSOR_ID`, `ETL_OZONE_LIMIT`, `ETL_OZONE_PAGE`
    /// - `ETL_PACING_DELAY_MS`
    /// - `ETL_ENRICHMENT_SOURCE` (`persisted` or `fetched`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EtlError::Config("OPENAQ_API_KEY is not set".to_string()))?;

        let mut config = Self::with_api_key(&api_key);

        if let Some(url) = lookup("ETL_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(tz) = lookup("ETL_TIMEZONE") {
            config.timezone = tz;
        }

        config.latitude = parse_or(&lookup, "ETL_LATITUDE", config.latitude)?;
        config.longitude = parse_or(&lookup, "ETL_LONGITUDE", config.longitude)?;
        config.state_code = parse_or(&lookup, "ETL_STATE_CODE", config.state_code)?;
        config.county_code = parse_or(&lookup, "ETL_COUNTY_CODE", config.county_code)?;
        config.sensor_id = parse_or(&lookup, "ETL_SENSOR_ID", config.sensor_id)?;
        config.ozone_limit = parse_or(&lookup, "ETL_OZONE_LIMIT", config.ozone_limit)?;
        config.ozone_page = parse_or(&lookup, "ETL_OZONE_PAGE", config.ozone_page)?;

        let pacing_ms = parse_or(&lookup, "ETL_PACING_DELAY_MS", DEFAULT_PACING_DELAY_MS)?;
        config.pacing_delay = Duration::from_millis(pacing_ms);

        if let Some(source) = lookup("ETL_ENRICHMENT_SOURCE") {
            config.enrichment_source = source.parse()?;
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EtlError::Config(format!("{key} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = PipelineConfig::from_lookup(lookup_from(&[("OPENAQ_API_KEY", "abc")])).unwrap();

        assert_eq!(config.openaq_api_key, "abc");
        assert_eq!(config.state_code, 13);
        assert_eq!(config.county_code, 121);
        assert_eq!(config.sensor_id, 1972);
        assert_eq!(config.ozone_page, 3);
        assert_eq!(config.pacing_delay, Duration::from_secs(2));
        assert_eq!(config.enrichment_source, EnrichmentSource::Persisted);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = PipelineConfig::from_lookup(lookup_from(&[]));

        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("OPENAQ_API_KEY", "abc"),
            ("ETL_LATITUDE", "40.7128"),
            ("ETL_OZONE_PAGE", "7"),
            ("ETL_PACING_DELAY_MS", "0"),
            ("ETL_ENRICHMENT_SOURCE", "Fetched"),
        ]))
        .unwrap();

        assert_eq!(config.latitude, 40.7128);
        assert_eq!(config.ozone_page, 7);
        assert_eq!(config.pacing_delay, Duration::ZERO);
        assert_eq!(config.enrichment_source, EnrichmentSource::Fetched);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let result = PipelineConfig::from_lookup(lookup_from(&[
            ("OPENAQ_API_KEY", "abc"),
            ("ETL_STATE_CODE", "georgia"),
        ]));

        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_unknown_enrichment_source() {
        assert!("sometimes".parse::<EnrichmentSource>().is_err());
    }
}

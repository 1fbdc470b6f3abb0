//! NHTSA Crash Viewer API client.
//!
//! The Crash Viewer exposes FARS (Fatality Analysis Reporting System) data:
//! one record per fatal crash, keyed by a state-scoped case number.
//!
//! # API Reference
//!
//! See: <https://crashviewer.nhtsa.dot.gov/CrashAPI>
//!
//! # User-Agent
//!
//! The service rejects requests carrying a non-browser `User-Agent`, so every
//! request sends [`BROWSER_USER_AGENT`]. This is a hard upstream requirement
//! and is not configurable.

use std::time::Duration;

use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use super::de::{lenient_f64, lenient_i32, lenient_i64};
use super::fetch_json;
use crate::error::Result;

/// Base URL for the Crash Viewer API.
const NHTSA_API_BASE: &str = "https://crashviewer.nhtsa.dot.gov/CrashAPI";

/// User-Agent the Crash Viewer accepts.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the NHTSA Crash Viewer API.
#[derive(Clone)]
pub struct NhtsaClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for NhtsaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NhtsaClient {
    /// Create a new NHTSA client with default settings.
    pub fn new() -> Self {
        Self::with_base_url(NHTSA_API_BASE)
    }

    /// Create a new NHTSA client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
    }

    /// List fatal crashes in a county over an inclusive range of case years.
    ///
    /// # Arguments
    ///
    /// * `state_code` - FIPS state code (e.g. 13 for Georgia)
    /// * `county_code` - FIPS county code within the state (e.g. 121 for Fulton)
    /// * `from_year`, `to_year` - Inclusive case-year range
    #[instrument(skip(self))]
    pub async fn get_crashes_by_location(
        &self,
        state_code: u32,
        county_code: u32,
        from_year: i32,
        to_year: i32,
    ) -> Result<Value> {
        let url = format!(
            "{}/crashes/GetCrashesByLocation?fromCaseYear={}&toCaseYear={}&state={}&county={}&format=json",
            self.base_url, from_year, to_year, state_code, county_code
        );

        fetch_json("nhtsa", self.build_request(&url)).await
    }

    /// Fetch the full case record for one crash.
    ///
    /// Recent cases often have no detail released yet; the response then has
    /// a `Count` of 0. Interpreting the count is left to the caller.
    #[instrument(skip(self))]
    pub async fn get_case_details(
        &self,
        state_case: i64,
        case_year: i32,
        state_code: u32,
    ) -> Result<Value> {
        let url = format!(
            "{}/crashes/GetCaseDetails?stateCase={}&caseYear={}&state={}&format=json",
            self.base_url, state_case, case_year, state_code
        );

        fetch_json("nhtsa", self.build_request(&url)).await
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Body of `GetCrashesByLocation`.
///
/// `Results` is a list of pages; the crashes are in the first page.
#[derive(Debug, Clone, Deserialize)]
pub struct NhtsaCrashListResponse {
    #[serde(rename = "Results")]
    pub results: Vec<Vec<NhtsaCrash>>,
}

/// One crash row as listed by `GetCrashesByLocation`.
///
/// Only the columns kept downstream are declared. The numeric
/// `CITY`/`COUNTY`/`STATE` codes, `TWAY_ID2` and `VE_FORMS` are dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct NhtsaCrash {
    #[serde(rename = "ST_CASE", deserialize_with = "lenient_i64")]
    pub st_case: i64,

    #[serde(rename = "CaseYear", deserialize_with = "lenient_i32")]
    pub case_year: i32,

    #[serde(rename = "CITYNAME", default)]
    pub city_name: String,

    #[serde(rename = "COUNTYNAME", default)]
    pub county_name: String,

    #[serde(rename = "STATENAME", default)]
    pub state_name: String,

    #[serde(rename = "FATALS", deserialize_with = "lenient_i64")]
    pub fatals: i64,

    #[serde(rename = "LATITUDE", deserialize_with = "lenient_f64")]
    pub latitude: f64,

    #[serde(rename = "LONGITUD", deserialize_with = "lenient_f64")]
    pub longitude: f64,

    #[serde(rename = "TOTALVEHICLES", deserialize_with = "lenient_i64")]
    pub total_vehicles: i64,

    #[serde(rename = "TWAY_ID", default)]
    pub tway_id: Option<String>,
}

/// Body of `GetCaseDetails`.
#[derive(Debug, Clone, Deserialize)]
pub struct NhtsaCaseDetailResponse {
    #[serde(rename = "Count", deserialize_with = "lenient_i64")]
    pub count: i64,

    #[serde(rename = "Results", default)]
    pub results: Vec<Vec<NhtsaCaseResult>>,
}

/// One entry of the nested `Results` of a case detail.
#[derive(Debug, Clone, Deserialize)]
pub struct NhtsaCaseResult {
    #[serde(rename = "CrashResultSet")]
    pub crash_result_set: NhtsaCrashResultSet,
}

/// The subset of a case's crash record used for enrichment.
#[derive(Debug, Clone, Deserialize)]
pub struct NhtsaCrashResultSet {
    #[serde(rename = "YEAR", deserialize_with = "lenient_i32")]
    pub year: i32,

    #[serde(rename = "MONTH", deserialize_with = "lenient_i64")]
    pub month: i64,

    #[serde(rename = "DAY", deserialize_with = "lenient_i64")]
    pub day: i64,
}

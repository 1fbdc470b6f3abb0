//! Normalized record types.
//!
//! Each type maps one-to-one onto a table of the SQLite store. Field names
//! are the column names.

use serde::{Deserialize, Serialize};

/// One day of archived weather for the queried point.
///
/// Temperatures are requested in Fahrenheit and the field names carry the
/// unit so downstream consumers never have to guess. Precipitation values are
/// whatever the archive reports (millimetres / centimetres for snowfall).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub latitude: f64,
    pub longitude: f64,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub temp_max_f: Option<f64>,
    pub temp_min_f: Option<f64>,
    pub precip_sum: Option<f64>,
    pub rain_sum: Option<f64>,
    pub snowfall_sum: Option<f64>,
}

/// One fatal-crash case from the location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashSummary {
    /// Jurisdiction-scoped case identifier. Unique within a run.
    pub state_case: i64,
    pub year: i32,
    pub city: String,
    pub county: String,
    pub state: String,
    pub fatals: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub vehicles: i64,
    /// Trafficway the crash occurred on, when reported.
    pub road_occurred: Option<String>,
}

/// Supplemental date detail for a crash case.
///
/// A record with every optional field empty is a placeholder: the case was
/// checked but the upstream service had not released its detail yet. It is
/// still stored so the case is not fetched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetail {
    pub state_case: i64,
    pub year: Option<i32>,
    /// Zero-padded month, e.g. `"03"`.
    pub month: Option<String>,
    /// Zero-padded day of month, e.g. `"07"`.
    pub day: Option<String>,
}

impl CaseDetail {
    /// A record for a case whose detail is not available upstream.
    pub fn pending(state_case: i64) -> Self {
        Self {
            state_case,
            year: None,
            month: None,
            day: None,
        }
    }

    /// Whether this record is a placeholder without real detail.
    pub fn is_pending(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }
}

/// Daily aggregate for one air-quality sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OzoneMeasurement {
    /// Local calendar date of the aggregation period, `YYYY-MM-DD`.
    pub datetime: String,
    pub mean_value: Option<f64>,
    pub minimum_value: Option<f64>,
    pub maximum_value: Option<f64>,
    /// Measured parameter, e.g. `"o3"`.
    pub parameter: String,
    pub units: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_case_detail() {
        let detail = CaseDetail::pending(130001);

        assert_eq!(detail.state_case, 130001);
        assert!(detail.is_pending());
    }

    #[test]
    fn test_released_case_detail_is_not_pending() {
        let detail = CaseDetail {
            state_case: 130001,
            year: Some(2022),
            month: Some("03".to_string()),
            day: Some("07".to_string()),
        };

        assert!(!detail.is_pending());
    }
}

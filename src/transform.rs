//! Transformers from raw API responses to normalized records.
//!
//! Each function is pure: it takes the JSON body returned by a client and
//! produces the ordered records for one table. A body missing the expected
//! structure fails with [`EtlError::Shape`] rather than yielding an empty
//! table.

use serde_json::Value;

use crate::data_sources::nhtsa::NhtsaCrashListResponse;
use crate::data_sources::open_meteo::OpenMeteoResponse;
use crate::data_sources::openaq::OpenAqMeasurementsResponse;
use crate::error::{EtlError, Result};
use crate::model::{CrashSummary, OzoneMeasurement, WeatherRecord};

/// Reshape an Open-Meteo archive response into one record per day.
///
/// The response's single latitude/longitude is copied onto every row.
pub fn transform_weather(data: Value) -> Result<Vec<WeatherRecord>> {
    let response: OpenMeteoResponse = serde_json::from_value(data)?;
    let daily = response.daily;
    let days = daily.time.len();

    let columns = [
        ("temperature_2m_max", daily.temperature_2m_max.len()),
        ("temperature_2m_min", daily.temperature_2m_min.len()),
        ("precipitation_sum", daily.precipitation_sum.len()),
        ("rain_sum", daily.rain_sum.len()),
        ("snowfall_sum", daily.snowfall_sum.len()),
    ];
    if let Some((name, len)) = columns.iter().find(|(_, len)| *len != days) {
        return Err(EtlError::Shape(format!(
            "daily.{name} has {len} entries but daily.time has {days}"
        )));
    }

    let records = daily
        .time
        .into_iter()
        .enumerate()
        .map(|(i, date)| WeatherRecord {
            latitude: response.latitude,
            longitude: response.longitude,
            date,
            temp_max_f: daily.temperature_2m_max[i],
            temp_min_f: daily.temperature_2m_min[i],
            precip_sum: daily.precipitation_sum[i],
            rain_sum: daily.rain_sum[i],
            snowfall_sum: daily.snowfall_sum[i],
        })
        .collect();

    Ok(records)
}

/// Reshape a `GetCrashesByLocation` response into crash summaries.
///
/// Only the first page of `Results` is used.
pub fn transform_crashes(data: Value) -> Result<Vec<CrashSummary>> {
    let response: NhtsaCrashListResponse = serde_json::from_value(data)?;

    let first_page = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| EtlError::Shape("crash listing has no result pages".to_string()))?;

    let crashes = first_page
        .into_iter()
        .map(|crash| CrashSummary {
            state_case: crash.st_case,
            year: crash.case_year,
            city: crash.city_name,
            county: crash.county_name,
            state: crash.state_name,
            fatals: crash.fatals,
            latitude: crash.latitude,
            longitude: crash.longitude,
            vehicles: crash.total_vehicles,
            road_occurred: crash.tway_id,
        })
        .collect();

    Ok(crashes)
}

/// Flatten an OpenAQ daily measurement listing.
///
/// The row date is the first ten characters (`YYYY-MM-DD`) of the period's
/// local start timestamp.
pub fn transform_ozone(data: Value) -> Result<Vec<OzoneMeasurement>> {
    let response: OpenAqMeasurementsResponse = serde_json::from_value(data)?;

    response
        .results
        .into_iter()
        .map(|item| {
            let local = &item.period.datetime_from.local;
            let date = local.get(..10).ok_or_else(|| {
                EtlError::Shape(format!("period start '{local}' is not a timestamp"))
            })?;

            Ok(OzoneMeasurement {
                datetime: date.to_string(),
                mean_value: item.value,
                minimum_value: item.summary.min,
                maximum_value: item.summary.max,
                parameter: item.parameter.name,
                units: item.parameter.units,
            })
        })
        .collect()
}

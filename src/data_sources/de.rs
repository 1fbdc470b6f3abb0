//! Lenient number deserializers.
//!
//! The NHTSA API is inconsistent about numeric fields: the same column can be
//! a JSON number in one response and a numeric string in the next (latitude
//! and longitude are usually strings). These helpers accept either.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A required integer given as a number or a numeric string.
pub fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    to_i64(&value).ok_or_else(|| D::Error::custom(format!("expected integer, found {value}")))
}

/// A required `i32`, e.g. a year.
pub fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let n = lenient_i64(deserializer)?;
    i32::try_from(n).map_err(|_| D::Error::custom(format!("{n} is out of range")))
}

/// A required float given as a number or a numeric string.
pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    to_f64(&value).ok_or_else(|| D::Error::custom(format!("expected number, found {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "lenient_i64")]
        case: i64,
        #[serde(deserialize_with = "lenient_i32")]
        year: i32,
        #[serde(deserialize_with = "lenient_f64")]
        lat: f64,
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        let row: Row =
            serde_json::from_str(r#"{"case": "130001", "year": 2022, "lat": "33.75"}"#).unwrap();

        assert_eq!(row.case, 130001);
        assert_eq!(row.year, 2022);
        assert!((row.lat - 33.75).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_numeric() {
        let result: Result<Row, _> =
            serde_json::from_str(r#"{"case": "abc", "year": 2022, "lat": 1.0}"#);

        assert!(result.is_err());
    }
}

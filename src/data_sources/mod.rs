//! Clients for the three upstream REST APIs.
//!
//! # Data Sources
//!
//! - [`open_meteo`]: Open-Meteo historical weather archive
//! - [`nhtsa`]: NHTSA Crash Viewer (FARS) fatal-crash listings and case details
//! - [`openaq`]: OpenAQ v3 sensor measurements
//!
//! Every client issues a single GET per call and hands back the raw parsed
//! JSON body. Shaping that body into records is the job of
//! [`crate::transform`].

pub mod de;
pub mod nhtsa;
pub mod open_meteo;
pub mod openaq;

pub use nhtsa::NhtsaClient;
pub use open_meteo::OpenMeteoClient;
pub use openaq::OpenAqClient;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

use crate::error::{EtlError, Result};

/// Send a request and apply the shared response contract.
///
/// Returns the parsed body on HTTP 200 when it carries no top-level `error`
/// field. A non-200 status or an embedded error is logged and returned as an
/// [`EtlError`].
pub(crate) async fn fetch_json(
    source_name: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();

    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        warn!(
            source = source_name,
            status = status.as_u16(),
            body = %body,
            "HTTP call failed"
        );
        return Err(EtlError::Status {
            source_name,
            status: status.as_u16(),
            body,
        });
    }

    let data: Value = response.json().await?;

    if let Some(error) = data.get("error") {
        let reason = data
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        warn!(source = source_name, reason = %reason, "Response error");
        return Err(EtlError::Upstream {
            source_name,
            reason,
        });
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::{Json, Router, http::StatusCode as AxumStatus, routing::get};
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_json_ok() {
        let app = Router::new().route("/ok", get(|| async { Json(json!({"daily": {}})) }));
        let base = serve(app).await;

        let data = fetch_json("test", reqwest::Client::new().get(format!("{base}/ok")))
            .await
            .unwrap();

        assert!(data.get("daily").is_some());
    }

    #[tokio::test]
    async fn test_fetch_json_non_200() {
        let app = Router::new().route(
            "/down",
            get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let base = serve(app).await;

        let err = fetch_json("test", reqwest::Client::new().get(format!("{base}/down")))
            .await
            .unwrap_err();

        match err {
            EtlError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_json_embedded_error() {
        let app = Router::new().route(
            "/bad",
            get(|| async { Json(json!({"error": true, "reason": "Invalid date"})) }),
        );
        let base = serve(app).await;

        let err = fetch_json("test", reqwest::Client::new().get(format!("{base}/bad")))
            .await
            .unwrap_err();

        match err {
            EtlError::Upstream { reason, .. } => assert_eq!(reason, "Invalid date"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

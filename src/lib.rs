//! crash-weather-etl - ETL pipeline for weather, traffic-fatality and air-quality data.
//!
//! # Overview
//!
//! Each run pulls three public datasets for one study area, reshapes them
//! into typed records and replaces the matching tables of a SQLite store:
//!
//! - Daily weather from the Open-Meteo archive
//! - Fatal crashes from the NHTSA Crash Viewer, enriched with per-case dates
//! - Daily ozone aggregates from one OpenAQ sensor
//!
//! Case dates are fetched incrementally: a case is requested once, and the
//! answer is kept across runs even when the detail was not yet released.
//!
//! # Modules
//!
//! - [`config`]: Environment-driven configuration
//! - [`data_sources`]: HTTP clients for the three APIs
//! - [`transform`]: Response-to-record mapping
//! - [`enrich`]: Incremental case-detail fetching
//! - [`storage`]: SQLite replace-on-load persistence
//! - [`pipeline`]: Run orchestration

pub mod config;
pub mod data_sources;
pub mod enrich;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod storage;
pub mod transform;

pub use error::{EtlError, Result};

#[cfg(test)]
pub(crate) mod test_support {
    use tokio::net::TcpListener;

    /// Serve `app` on an ephemeral local port and return its base URL.
    pub async fn serve(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

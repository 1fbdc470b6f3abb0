//! Error types for the ETL pipeline.
//!
//! Every upstream failure is surfaced as an [`EtlError`] instead of a null
//! value, so a failed fetch can never flow silently into a transformer.

/// Errors produced while extracting, transforming or loading data.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream service answered with a status other than 200.
    #[error("{source_name} returned HTTP {status}: {body}")]
    Status {
        /// Which API produced the response.
        source_name: &'static str,
        /// The HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// The upstream service answered 200 but embedded an error in the body.
    #[error("{source_name} reported an error: {reason}")]
    Upstream {
        /// Which API produced the response.
        source_name: &'static str,
        /// The reason given by the service.
        reason: String,
    },

    /// A response did not have the structure a transformer expects.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// The SQLite store rejected an operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A configuration value was missing or could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::Shape(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EtlError>;

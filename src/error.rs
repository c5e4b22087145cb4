//! Error types for fetching, parsing, and date normalization.

use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a logical fetch.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection-level failure that survived every retry.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Structured error payload reported by the API.
    #[error("Got error {id} ({key}): {value}")]
    Application {
        id: String,
        key: String,
        value: String,
    },

    /// Response matched neither the data nor the error envelope.
    #[error("Got unexpected response:\n{0}")]
    MalformedEnvelope(String),

    /// Response body was not JSON at all.
    #[error("decode json: {0}")]
    Json(#[from] serde_json::Error),

    /// `lastupdated` metadata was not a `YYYY-MM-DD` date.
    #[error("invalid lastupdated value {value:?}: {source}")]
    LastUpdated {
        value: String,
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Date(#[from] DateError),

    /// The server kept announcing more pages.
    #[error("page limit exceeded ({0})")]
    PageLimit(u32),

    /// Mutually exclusive query arguments were combined.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Failures raised by the HTTP transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connect or timeout failure, after exhausting all attempts.
    #[error("network error after {attempts} attempts: {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Any other request failure; never retried.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP client could not be constructed.
    #[error("build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Failures of the date normalizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Unable to parse date string {0}")]
    Parse(String),

    #[error("Unknown Frequency type: {0}")]
    UnknownFrequency(String),
}

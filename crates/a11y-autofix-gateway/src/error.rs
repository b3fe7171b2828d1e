//! Error types for a11y-autofix-gateway

use thiserror::Error;

/// Errors raised by the external collaborators (catalog, object store,
/// work queue, archive builder).
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport-level HTTP failure talking to the catalog
    #[error("HTTP error: {0}")]
    Http(String),

    /// Catalog answered with a non-success status
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Catalog payload did not match the expected shape
    #[error("Unexpected catalog payload from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Object store call failed (message carries the full SDK error chain)
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Work queue call failed (message carries the full SDK error chain)
    #[error("Work queue error: {0}")]
    Queue(String),

    /// Archive could not be built
    #[error("Archive error: {0}")]
    Archive(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Http(err.to_string())
    }
}

impl From<walkdir::Error> for GatewayError {
    fn from(err: walkdir::Error) -> Self {
        GatewayError::Archive(err.to_string())
    }
}

//! Error types for catalog access

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// One upstream page that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    /// Upstream page number (1-based)
    pub page: u32,
    pub reason: String,
}

/// Catalog client and merger errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Bad request shape, rejected before any network call
    #[error("Invalid catalog request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Parse error: {0}")]
    Parse(String),

    /// A newer browse request replaced this one before it finished
    #[error("Request superseded by a newer one")]
    Superseded,

    #[error("All {} upstream page fetches failed", .failures.len())]
    AllPagesFailed { failures: Vec<PageFailure> },
}

impl CatalogError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Network(_)
            | CatalogError::Timeout(_)
            | CatalogError::AllPagesFailed { .. } => true,
            CatalogError::Upstream { status, .. } => *status == 429 || *status >= 500,
            CatalogError::Validation(_)
            | CatalogError::NotFound(_)
            | CatalogError::Parse(_)
            | CatalogError::Superseded => false,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Network(format!("timed out: {}", err))
        } else if err.is_decode() {
            CatalogError::Parse(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

//! Knowledge source error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during knowledge source operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Path outside source root: {0}")]
    PathEscape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SourceError {
    /// Check if this error indicates the source is unreachable
    ///
    /// Unreachable sources degrade to empty results at the aggregation
    /// layer rather than failing the request.
    pub fn is_connection(&self) -> bool {
        match self {
            SourceError::Connection(_) | SourceError::Timeout(_) => true,
            SourceError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

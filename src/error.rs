//! Error types for lead synchronization
//!
//! Source errors are classified by kind:
//! - Fetch: transport failures and non-success responses
//! - MalformedSource: a body that is not the expected JSON array
//!
//! Neither kind is fatal. The sync controller turns both into the
//! `Error` phase and the next cycle is the retry.

use thiserror::Error;

/// Errors from talking to the lead source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed source data: {0}")]
    Malformed(String),
}

/// Coarse classification of a [`SourceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceErrorKind {
    Fetch,
    MalformedSource,
}

impl SourceError {
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            SourceError::Http(_) | SourceError::Status { .. } => SourceErrorKind::Fetch,
            SourceError::Malformed(_) => SourceErrorKind::MalformedSource,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.kind() == SourceErrorKind::MalformedSource
    }

    /// Message stored in `SyncState::error_message`.
    pub fn user_message(&self) -> String {
        match self {
            SourceError::Http(e) if e.is_timeout() => {
                "Failed to fetch leads data: the source did not respond in time".to_string()
            }
            SourceError::Http(_) => {
                "Failed to fetch leads data: could not reach the source".to_string()
            }
            SourceError::Status { status, .. } => {
                format!("Failed to fetch leads data: source responded with HTTP {}", status)
            }
            SourceError::Malformed(detail) => {
                format!("Lead source returned data in an unexpected format ({})", detail)
            }
        }
    }
}

/// Errors from loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Source URL must not be empty")]
    EmptySourceUrl,

    #[error("Poll interval must be at least one second")]
    ZeroPollInterval,

    #[error("Request timeout must be at least one second")]
    ZeroRequestTimeout,

    #[error("Could not find home directory")]
    HomeDirUnavailable,

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

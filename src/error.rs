//! Error types for toolgate

use thiserror::Error;

/// Result type alias for toolgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in toolgate
#[derive(Error, Debug)]
pub enum Error {
    /// Missing secret, client key file or malformed config. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The credential does not carry a scope the operation needs.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// The provider refused the bearer token itself (HTTP 401).
    #[error("Authorization error: credential rejected: {0}")]
    CredentialRejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-side failure, reported with whatever detail the provider gave.
    #[error("Remote error ({status}): {detail}")]
    Remote { status: u16, detail: String },

    /// Malformed tool arguments, rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Corrupt credential record at {path}: {reason}")]
    CorruptRecord { path: String, reason: String },

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Stable taxonomy name, used as `error_kind` in tool results.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::Authorization(_) | Error::CredentialRejected(_) | Error::OAuth(_) => "authorization_error",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Timeout(_) => "timeout",
            Error::CorruptRecord { .. } => "corrupt_record",
            Error::Remote { .. } | Error::Http(_) => "remote_error",
            Error::Io(_) | Error::Json(_) | Error::Other(_) => "internal_error",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let target = err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "request".to_string());
            Error::Timeout(target)
        } else {
            Error::Http(err)
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

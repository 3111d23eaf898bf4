//! Typed error hierarchy for creditwatch.
//!
//! Three enums cover the three seams:
//! - `FetchError`: one HTTP call to the workflow backend
//! - `PollError`: what a subscription reports to its consumer
//! - `ConfigError`: loading and parsing `creditwatch.toml`

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single call to the workflow backend.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend answered 404: the record does not exist (yet).
    #[error("Not found: {detail}")]
    NotFound { detail: String },

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Malformed response body: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    /// HTTP status code, when the backend answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::NotFound { .. } => Some(404),
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::Decode(_) => None,
        }
    }
}

/// Error signal delivered to a subscription's `on_error` callback.
///
/// Neither variant stops polling; they are reports, not cancellations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The status record has been missing for `attempts` consecutive ticks.
    #[error("Workflow {request_id} not available yet after {attempts} attempts: {detail}")]
    NotYetAvailable {
        request_id: String,
        attempts: u32,
        detail: String,
    },

    /// The status fetch failed for any other reason.
    #[error("Failed to fetch status for {request_id}: {message}")]
    TransientFetchFailure {
        request_id: String,
        status: Option<u16>,
        message: String,
    },
}

impl PollError {
    pub fn request_id(&self) -> &str {
        match self {
            PollError::NotYetAvailable { request_id, .. }
            | PollError::TransientFetchFailure { request_id, .. } => request_id,
        }
    }

    /// Soft warnings are expected before the backend creates the record.
    pub fn is_soft(&self) -> bool {
        matches!(self, PollError::NotYetAvailable { .. })
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

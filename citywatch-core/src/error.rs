//! Error types shared by the watchlist components.
//!
//! Every error here is recoverable at the caller: none of them should end the
//! process. Duplicate adds and empty searches are not errors at all; they are
//! reported through `AddOutcome::Duplicate` and `SearchOutcome::NoMatches`.

use std::path::PathBuf;
use thiserror::Error;

/// User input rejected before any search or network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A city name is required")]
    Empty,

    #[error("City name '{0}' contains characters other than letters, spaces and hyphens")]
    InvalidCharacters(String),
}

/// Failure talking to the weather endpoint.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to reach the weather service: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Weather service request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Weather service returned an unexpected payload: {0}")]
    Payload(String),
}

/// Failure loading the city directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to read city directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse city directory: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure reading or writing the persistent slot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored data under key '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize watchlist: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StoreError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

/// Top-level error returned by the controller.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WatchError {
    /// True when persisted data could not be decoded.
    pub fn is_storage_corruption(&self) -> bool {
        matches!(self, WatchError::Store(e) if e.is_corrupt())
    }
}

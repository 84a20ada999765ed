//! Client side of the full-collection sync protocol

mod client;
pub mod protocol;
mod reconciler;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::SyncClient;
pub use reconciler::{SyncReconciler, SyncReport};

/// Why a sync cycle did not complete. Local state is untouched in every case.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("A sync is already in progress")]
    InProgress,
    #[error("Sync request timed out")]
    Timeout,
    #[error("Sync request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Sync API error: {message}")]
    Api { status: u16, message: String },
    #[error("Malformed sync response: {0}")]
    MalformedResponse(String),
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Local store error: {0}")]
    Storage(#[from] crate::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(error)
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Sync status surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Synced,
    Error,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        })
    }
}

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] till_core::Error),
    #[error(transparent)]
    Sync(#[from] till_core::SyncError),
    #[error(transparent)]
    Config(#[from] till_core::config::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No record JSON provided")]
    EmptyPayload,
    #[error("Record JSON must be an object")]
    InvalidPayload,
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("No {0} found with id {1}")]
    RecordNotFound(String, String),
    #[error("Invalid filter '{0}': expected key=value")]
    InvalidFilter(String),
}

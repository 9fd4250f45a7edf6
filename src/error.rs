use crate::common::SongKey;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync error: {0}")]
    Generic(String),
    #[error(transparent)]
    Expected(#[from] SyncExpectedError),
    #[error("Failed to fetch {context}: {source}")]
    Fetch {
        context: String,
        #[source]
        source: ServiceError,
    },
    #[error("Cached track graph at {location} is corrupt: {source}")]
    CacheCorrupt {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to save tags of {path}: {message}")]
    Save { path: PathBuf, message: String },
    #[error("Failed to read tags of {path}: {message}")]
    Tag { path: PathBuf, message: String },
    #[error("The {processor} processor failed for {key}: {source}")]
    Processor {
        processor: &'static str,
        key: SongKey,
        #[source]
        source: Box<SyncError>,
    },
    #[error("Failed to save {failed} file(s), first failure: {first}")]
    IncompleteSync { failed: usize, first: Box<SyncError> },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SyncExpectedError {
    #[error("{0}")]
    Generic(String),
    #[error("Configuration file not found ({path})")]
    ConfigNotFound { path: PathBuf },
    #[error("Failed to decode configuration file ({path}): {message}")]
    ConfigDecode { path: PathBuf, message: String },
    #[error("Invalid value for {key} in configuration file: {message}")]
    InvalidConfigValue { key: String, message: String },
    #[error("{path} is not a supported audio file")]
    UnsupportedFiletype { path: PathBuf },
}

/// What a [`crate::service::MusicService`] implementation reports when a remote call fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

//! Error types for Liveswitch Core

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Slot {slot_id} switches at {switch} before it starts at {start}")]
    InvalidSchedule {
        slot_id: String,
        start: DateTime<Utc>,
        switch: DateTime<Utc>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by an external player surface.
///
/// These are recoverable: the affected surface shows an error with a retry
/// action and nothing else in the session changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Failed to load replay session: {0}")]
    ReplayLoad(String),

    #[error("Live session initialization failed: {0}")]
    LiveInit(String),

    #[error("Failed to join live session: {0}")]
    LiveJoin(String),

    #[error("Failed to start live session: {0}")]
    LiveStart(String),
}

//! Error types for the recorder, player and journal store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the recorder service and its WAV sink
#[derive(Error, Debug)]
pub enum RecorderError {
    /// The capture device could not be opened or started
    #[error("Audio capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `stop` or `cancel` was requested with no active session
    #[error("No recording in progress")]
    NotRecording,

    /// Creating or appending to the recording failed
    #[error("Failed to write recording {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The WAV header could not be patched; the file is not a valid WAV
    #[error("Failed to finalize WAV header for {path:?}: {source}")]
    Finalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The recorder task is gone
    #[error("Recorder service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Errors raised by the player service
#[derive(Error, Debug, Clone)]
pub enum PlayerError {
    /// The file could not be opened or decoded
    #[error("Failed to open {path:?} for playback: {message}")]
    Open { path: PathBuf, message: String },

    /// The output device could not be opened
    #[error("Audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The player task is gone
    #[error("Player service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Errors raised by the SQLite journal store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Topic name already exists: {0}")]
    TopicNameTaken(String),

    #[error("Topic name cannot be blank")]
    BlankTopicName,

    #[error("Journal entry not found: {0}")]
    EntryNotFound(String),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] io::Error),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

impl RecorderError {
    /// Whether the caller can simply try again later
    pub fn is_recoverable(&self) -> bool {
        match self {
            RecorderError::DeviceUnavailable(_) => true,
            RecorderError::NotRecording => true,
            RecorderError::Io { .. } => false,
            RecorderError::Finalize { .. } => false,
            RecorderError::ServiceUnavailable(_) => false,
        }
    }
}

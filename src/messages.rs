use crate::error::{PlayerError, RecorderError};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;

/// Commands for the Recorder service
pub enum RecorderCommand {
    Start {
        path: PathBuf,
        reply: oneshot::Sender<Result<(), RecorderError>>,
    },
    Pause(oneshot::Sender<()>),
    Resume(oneshot::Sender<()>),
    Stop(oneshot::Sender<Result<FinishedRecording, RecorderError>>),
    Cancel(oneshot::Sender<Result<(), RecorderError>>),
}

/// Recorder state (observable via watch channel)
#[derive(Clone, Debug, PartialEq)]
pub enum RecorderState {
    Idle,
    Recording { path: PathBuf },
    Paused { path: PathBuf },
}

impl RecorderState {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecorderState::Recording { .. })
    }
}

/// A recording whose WAV header has been finalized
#[derive(Clone, Debug, PartialEq)]
pub struct FinishedRecording {
    pub path: PathBuf,
    /// PCM bytes after the 44-byte header
    pub data_bytes: u32,
    /// Wall time spent recording, excluding pauses
    pub elapsed: Duration,
}

/// Commands for the Player service
pub enum PlayerCommand {
    Play {
        path: PathBuf,
        entry_id: String,
        reply: oneshot::Sender<Result<(), PlayerError>>,
    },
    Pause(oneshot::Sender<()>),
    Resume(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
}

/// Playback state (observable via watch channel)
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing {
        entry_id: String,
        duration: Duration,
        progress: f32,
    },
    Paused {
        entry_id: String,
        position: Duration,
        duration: Duration,
    },
    Error {
        message: String,
    },
}

impl PlaybackState {
    /// Entry owning the playback slot, if any
    pub fn entry_id(&self) -> Option<&str> {
        match self {
            PlaybackState::Playing { entry_id, .. } | PlaybackState::Paused { entry_id, .. } => {
                Some(entry_id)
            }
            PlaybackState::Idle | PlaybackState::Error { .. } => None,
        }
    }

    /// Fraction played, for both Playing and Paused
    pub fn progress(&self) -> f32 {
        match self {
            PlaybackState::Playing { progress, .. } => *progress,
            PlaybackState::Paused {
                position, duration, ..
            } => fraction(*position, *duration),
            PlaybackState::Idle | PlaybackState::Error { .. } => 0.0,
        }
    }

    pub fn is_playing(&self, id: &str) -> bool {
        matches!(self, PlaybackState::Playing { entry_id, .. } if entry_id == id)
    }
}

/// `position / duration` clamped to [0, 1]; zero for an unknown duration
pub fn fraction(position: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 0.0;
    }
    (position.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
}

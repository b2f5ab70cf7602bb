//! Media writer boundary
//!
//! Interface to the container muxer that turns routed samples into a
//! finalized output file. The writer owns its own state machine
//! (idle → writing → finalizing → completed/failed); the session
//! controller drives it but never reaches inside.

use crate::capture::{Sample, SampleKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors reported by a media writer
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Track not supported: {0}")]
    TrackNotSupported(SampleKind),

    #[error("Writer is {actual}, expected {expected}")]
    InvalidState {
        expected: WriterStatus,
        actual: WriterStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Writer failed: {0}")]
    Failed(String),

    #[error("No writer backend available on this platform")]
    Unsupported,
}

/// Output container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Mp4,
    Mov,
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::Mp4 => write!(f, "mp4"),
            ContainerKind::Mov => write!(f, "mov"),
        }
    }
}

/// Writer lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterStatus {
    /// Created but not yet started
    Idle,
    /// Accepting samples
    Writing,
    /// Finish requested, flushing buffers
    Finalizing,
    /// Output file finalized
    Completed,
    /// Writer died; output may be unusable
    Failed,
}

impl std::fmt::Display for WriterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterStatus::Idle => write!(f, "idle"),
            WriterStatus::Writing => write!(f, "writing"),
            WriterStatus::Finalizing => write!(f, "finalizing"),
            WriterStatus::Completed => write!(f, "completed"),
            WriterStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Handle to one output track within the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub usize);

/// Video track codec settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTrackSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Target bitrate in bits per second
    pub bitrate: u64,
}

/// Audio track codec settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrackSettings {
    pub channels: u16,
    pub sample_rate: u32,
}

/// Codec settings for a track being added
#[derive(Debug, Clone)]
pub enum TrackSettings {
    Video(VideoTrackSettings),
    Audio(AudioTrackSettings),
}

/// Trait for media writers
///
/// Appends are synchronous and cheap (the writer buffers internally);
/// finalization is asynchronous and completes through a one-shot receiver
/// that resolves exactly once. Appending to a track after `mark_finished`
/// is undefined behavior for the backend and must not happen.
pub trait MediaWriter: Send {
    /// Add a track before writing starts. Fallible per track.
    fn add_track(&mut self, kind: SampleKind, settings: &TrackSettings)
        -> Result<TrackId, WriterError>;

    /// Transition idle → writing
    fn start_writing(&mut self) -> Result<(), WriterError>;

    /// Open the container session at the given origin timestamp
    fn open_session(&mut self, at_ms: f64);

    /// Whether `track` can currently accept another sample without blocking
    fn is_ready(&self, track: TrackId) -> bool;

    /// Append a sample; `false` signals backpressure or writer failure —
    /// the caller checks `status` to tell the two apart
    fn append(&mut self, track: TrackId, sample: &Sample) -> bool;

    /// Mark a track as complete; no further appends for it
    fn mark_finished(&mut self, track: TrackId);

    /// Begin finalization; the receiver resolves with the terminal status
    fn finish_writing(&mut self) -> oneshot::Receiver<WriterStatus>;

    /// Current writer status
    fn status(&self) -> WriterStatus;

    /// Detail for a `Failed` status, if any
    fn take_error(&mut self) -> Option<WriterError>;
}

/// Boxed writer as held by the session controller
pub type BoxWriter = Box<dyn MediaWriter>;

//! Session state management
//!
//! Defines the session lifecycle state machine, stop triggers, and the
//! configuration/outcome types exchanged with the caller.

use crate::writer::ContainerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Current state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Tracks and capture outputs are being set up
    Configuring,
    /// Configured, waiting for start
    Ready,
    /// Samples are being routed
    Recording,
    /// A stop trigger fired; finalization in progress
    Stopping,
    /// Output file finalized
    Finalized,
    /// Terminal failure; reachable from any state
    Failed,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Configuring
    }
}

/// Event capable of initiating session finalization
///
/// Exactly one trigger succeeds per session; the rest observe the session
/// already stopping and do nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopTrigger {
    /// SIGINT/SIGTERM or an explicit stop request
    ExternalSignal,
    /// The output file reached the configured size limit
    SizeLimitReached,
    /// The capture source reported a fatal error
    SourceError,
}

impl std::fmt::Display for StopTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopTrigger::ExternalSignal => write!(f, "external-signal"),
            StopTrigger::SizeLimitReached => write!(f, "size-limit-reached"),
            StopTrigger::SourceError => write!(f, "source-error"),
        }
    }
}

/// Configuration for starting a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    /// Output file path
    pub output_path: PathBuf,

    /// Container format for the output file
    pub container: ContainerKind,

    /// Capture width in pixels
    pub width: u32,

    /// Capture height in pixels
    pub height: u32,

    /// Target frame rate
    pub frame_rate: u32,

    /// Target video bitrate in bits per second
    pub bitrate: u64,

    /// Whether to capture system audio
    pub capture_system_audio: bool,

    /// Whether to capture microphone
    pub capture_microphone: bool,

    /// Audio channel count for both audio tracks
    pub audio_channels: u16,

    /// Audio sample rate in Hz
    pub audio_sample_rate: u32,

    /// Stop automatically once the output file reaches this size
    pub max_size_bytes: Option<u64>,

    /// Percentage of `max_size_bytes` at which a warning is raised
    pub warning_percent: u8,
}

/// Counters accumulated while routing samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounters {
    /// Video frames appended
    pub frames_written: u64,

    /// System-audio samples appended
    pub system_audio_samples: u64,

    /// Microphone samples appended
    pub microphone_samples: u64,

    /// Audio samples appended across both audio tracks
    pub audio_samples_total: u64,

    /// Video frames dropped (track not ready or append refused)
    pub video_frames_dropped: u64,

    /// Audio samples dropped because no video frame had arrived yet
    pub audio_dropped_before_origin: u64,
}

/// Final status of a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Failed,
}

/// Events emitted while a session runs
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Recording started
    Started,
    /// Output file crossed the warning threshold
    SizeWarning { bytes: u64, threshold: u64 },
    /// Output file reached the size limit
    SizeLimitReached { bytes: u64, limit: u64 },
    /// A stop trigger fired; finalization has begun
    Stopping(StopTrigger),
    /// Output file finalized
    Finalized,
    /// Error occurred
    Error(String),
}

/// Result of a finished session, delivered exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    /// Session identity
    pub session_id: Uuid,

    /// Completed vs failed
    pub status: SessionStatus,

    /// The trigger that initiated finalization
    pub trigger: StopTrigger,

    /// Output file path
    pub output_path: String,

    /// Wall-clock recording duration in milliseconds
    pub duration_ms: f64,

    /// Sample counters at finalization time
    pub counters: SessionCounters,

    /// Underlying error detail when `status` is failed
    pub error: Option<String>,

    /// When finalization completed
    pub finished_at: DateTime<Utc>,
}

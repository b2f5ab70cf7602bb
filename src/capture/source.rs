//! Capture source trait definitions
//!
//! Platform-agnostic interface to the screen/audio capture pipeline.
//! A source delivers encoded, type-tagged samples over per-kind channels
//! once started, and reports a fatal pipeline failure over a one-shot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors reported by a capture source
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Output kind not supported: {0}")]
    OutputNotSupported(SampleKind),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No capture backend available on this platform")]
    Unsupported,
}

/// Kinds of media samples a source can emit
///
/// Marked non-exhaustive so additional kinds (e.g. a webcam track) can be
/// introduced without breaking downstream routing, which ignores kinds it
/// does not recognize.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleKind {
    /// Screen video frames
    Video,
    /// System (loopback) audio
    SystemAudio,
    /// Microphone audio
    Microphone,
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleKind::Video => write!(f, "video"),
            SampleKind::SystemAudio => write!(f, "system-audio"),
            SampleKind::Microphone => write!(f, "microphone"),
        }
    }
}

/// A single encoded media sample from the capture pipeline
#[derive(Debug, Clone)]
pub struct Sample {
    /// Which track this sample belongs to
    pub kind: SampleKind,

    /// Presentation timestamp in milliseconds (process time)
    pub pts_ms: f64,

    /// Encoded payload bytes
    pub data: Vec<u8>,
}

impl Sample {
    pub fn new(kind: SampleKind, pts_ms: f64, data: Vec<u8>) -> Self {
        Self { kind, pts_ms, data }
    }
}

/// Channels handed out by a started source
///
/// Each sample kind arrives on its own channel, so routing for different
/// kinds runs concurrently. `fatal` resolves at most once, when the
/// pipeline dies in a way it cannot recover from; it is dropped unresolved
/// on a clean stop.
pub struct SourceStreams {
    pub video: mpsc::Receiver<Sample>,
    pub system_audio: Option<mpsc::Receiver<Sample>>,
    pub microphone: Option<mpsc::Receiver<Sample>>,
    pub fatal: oneshot::Receiver<CaptureError>,
}

/// Trait for capture sources
///
/// Outputs are registered per kind before `start`; registration of an
/// optional audio output may fail independently without making the source
/// unusable. `stop` completes only once the pipeline has quiesced and all
/// sample senders have been dropped.
#[async_trait]
pub trait CaptureSource: Send {
    /// Ask the source to emit samples of `kind` once started
    fn register_output(&mut self, kind: SampleKind) -> Result<(), CaptureError>;

    /// Start capturing and hand out the delivery channels
    async fn start(&mut self) -> Result<SourceStreams, CaptureError>;

    /// Stop capturing; awaited by the caller before finalization proceeds
    async fn stop(&mut self) -> Result<(), CaptureError>;
}

/// Boxed source as held by the session controller
pub type BoxSource = Box<dyn CaptureSource>;

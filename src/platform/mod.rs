//! Platform capture and writer backends
//!
//! Resolves the black-box capture source and media writer for the current
//! platform. The session core only ever sees the `CaptureSource` and
//! `MediaWriter` traits, so backends plug in per target without touching
//! the state machine.

use crate::capture::{BoxSource, CaptureError};
use crate::recorder::RecordingConfig;
use crate::writer::{BoxWriter, WriterError};

/// Resolve the capture source for this platform
pub fn create_source(_config: &RecordingConfig) -> Result<BoxSource, CaptureError> {
    #[cfg(target_os = "macos")]
    {
        // ScreenCaptureKit backend; requires macOS SDK 15.2+, currently
        // disabled until the build environment carries it.
        Err(CaptureError::Unsupported)
    }

    #[cfg(target_os = "windows")]
    {
        // Windows.Graphics.Capture backend not yet wired up.
        Err(CaptureError::Unsupported)
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Err(CaptureError::Unsupported)
    }
}

/// Resolve the media writer for this platform
pub fn create_writer(_config: &RecordingConfig) -> Result<BoxWriter, WriterError> {
    #[cfg(target_os = "macos")]
    {
        // AVAssetWriter-backed muxer lives behind this seam.
        Err(WriterError::Unsupported)
    }

    #[cfg(not(target_os = "macos"))]
    {
        Err(WriterError::Unsupported)
    }
}

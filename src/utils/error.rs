//! Error types and handling
//!
//! Crate-wide error type aggregating the boundary errors.

use crate::capture::CaptureError;
use crate::writer::WriterError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),

    #[error("Session error: {0}")]
    Session(String),
}

/// Result type alias using RecordError
pub type RecordResult<T> = Result<T, RecordError>;

//! screenreel - screen recordings from the terminal, finalized correctly.
//!
//! This crate implements the capture session lifecycle: a controller that
//! routes asynchronously-arriving video/audio samples into a multi-track
//! container writer and guarantees exactly-once finalization across
//! signals, size limits, and capture failures.

pub mod capture;
pub mod platform;
pub mod recorder;
pub mod utils;
pub mod writer;

pub use recorder::{
    RecordingConfig, SessionController, SessionCounters, SessionEvent, SessionOutcome,
    SessionState, SessionStatus, StopTrigger,
};
pub use utils::{RecordError, RecordResult};

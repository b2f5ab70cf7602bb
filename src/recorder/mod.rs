//! Recording session module
//!
//! This module implements the capture session lifecycle:
//! - SessionController state machine routing samples to writer tracks
//! - SizeMonitor watching the growing output file
//! - Signal handling funneled into the stop-trigger channel

pub mod controller;
pub mod monitor;
pub mod signals;
pub mod state;

pub use controller::SessionController;
pub use monitor::{FsSizeProbe, SizeLimits, SizeMonitor, SizeMonitorHandle, SizeProbe};
pub use signals::spawn_signal_listener;
pub use state::{
    RecordingConfig, SessionCounters, SessionEvent, SessionOutcome, SessionState, SessionStatus,
    StopTrigger,
};

//! Capture source boundary
//!
//! Platform-agnostic types and traits for the screen/audio capture
//! pipeline. Concrete backends are resolved in `crate::platform`.

pub mod source;

pub use source::{BoxSource, CaptureError, CaptureSource, Sample, SampleKind, SourceStreams};

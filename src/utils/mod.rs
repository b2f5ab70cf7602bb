//! Shared utilities

pub mod error;

pub use error::{RecordError, RecordResult};

//! Shared plumbing: configuration, errors and diagnostics.

pub mod config;
pub mod error;
pub mod log;

pub use error::{ErrorKind, PredictError, PredictResult};

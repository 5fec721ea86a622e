//! Error taxonomy shared across the predictor.
//!
//! Every failure ends up as one JSON error line on stdout, so the variants
//! carry exactly what the payload needs: a human readable message and, for
//! unexpected failures, diagnostic detail.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Stable tags used in log events and tests.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The model artefact (or an explicitly requested label file) is absent.
    ArtifactNotFound,
    /// A derived-feature rule could not find one of its inputs.
    MissingInput,
    /// A schema feature is absent after derivation.
    SchemaMismatch,
    /// Anything else: malformed input, corrupt artefact, I/O, panics.
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ArtifactNotFound => "artifact_not_found",
            ErrorKind::MissingInput => "missing_input",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

/// Canonical error type for the predictor.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Artifact file ({file}) not found at {}", path.display())]
    ArtifactNotFound { file: String, path: PathBuf },

    #[error("Missing input '{missing}' required to derive feature '{feature}'")]
    MissingInput { feature: String, missing: String },

    #[error("Missing required feature '{missing}'")]
    SchemaMismatch { missing: String },

    #[error("{message}")]
    Unexpected {
        message: String,
        details: Option<String>,
        trace: Option<String>,
    },
}

/// Result alias used throughout the crate.
pub type PredictResult<T> = Result<T, PredictError>;

impl PredictError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictError::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            PredictError::MissingInput { .. } => ErrorKind::MissingInput,
            PredictError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            PredictError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Artefact helper. `path` is reported verbatim in the message.
    pub fn artifact_not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        PredictError::ArtifactNotFound { file, path }
    }

    pub fn missing_input(feature: impl Into<String>, missing: impl Into<String>) -> Self {
        PredictError::MissingInput {
            feature: feature.into(),
            missing: missing.into(),
        }
    }

    pub fn schema_mismatch(missing: impl Into<String>) -> Self {
        PredictError::SchemaMismatch {
            missing: missing.into(),
        }
    }

    /// Unexpected failure without an underlying source.
    pub fn unexpected(message: impl Into<String>) -> Self {
        PredictError::Unexpected {
            message: message.into(),
            details: None,
            trace: capture_backtrace(),
        }
    }

    /// Unexpected failure caused by `source`; the source chain becomes the details.
    pub fn with_source(message: impl Into<String>, source: &(dyn StdError + 'static)) -> Self {
        PredictError::Unexpected {
            message: format!("{}: {}", message.into(), source),
            details: Some(source_chain(source)),
            trace: capture_backtrace(),
        }
    }

    /// Unexpected failure with explicit details and backtrace (used for panics).
    pub fn unexpected_with(
        message: impl Into<String>,
        details: Option<String>,
        trace: Option<String>,
    ) -> Self {
        PredictError::Unexpected {
            message: message.into(),
            details,
            trace,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            PredictError::Unexpected { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    pub fn trace(&self) -> Option<&str> {
        match self {
            PredictError::Unexpected { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PredictError {
    fn from(err: serde_json::Error) -> Self {
        PredictError::with_source("invalid JSON", &err)
    }
}

impl From<std::io::Error> for PredictError {
    fn from(err: std::io::Error) -> Self {
        PredictError::with_source("I/O error", &err)
    }
}

/// Render `err` and all of its sources as "a: b: c".
fn source_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        current = cause.source();
    }
    out
}

/// Honours `RUST_BACKTRACE`; returns `None` when capturing is disabled.
fn capture_backtrace() -> Option<String> {
    let bt = Backtrace::capture();
    match bt.status() {
        BacktraceStatus::Captured => Some(bt.to_string()),
        _ => None,
    }
}

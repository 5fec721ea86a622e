//! Runtime configuration resolved from command-line options and the
//! executable's own location.
//!
//! The caller's working directory is never consulted: artefacts live next to
//! the binary. No environment variables are read.

use std::env;
use std::path::{Path, PathBuf};

use crate::common::error::{PredictError, PredictResult};
use crate::features::domain::SchemaVersion;

/// File name of the model artefact expected next to the executable.
pub const MODEL_FILE_NAME: &str = "crop_health_model.json";

/// Optional label file picked up next to the executable.
pub const LABELS_FILE_NAME: &str = "crop_health_labels.json";

/// Default `tracing` filter; the caller treats any stderr output as failure.
pub const DEFAULT_LOG_LEVEL: &str = "off";

/// Where the class label map comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LabelSource {
    /// Explicitly requested file; it must exist.
    File(PathBuf),
    /// Conventional file next to the executable; used only when present.
    Sidecar(PathBuf),
}

/// Snapshot of configuration values consumed by the predictor.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub model_path: PathBuf,
    pub labels: LabelSource,
    pub schema: SchemaVersion,
}

/// Optional overrides collected by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub schema: Option<SchemaVersion>,
}

impl AppCfg {
    /// Resolve the configuration relative to the running executable.
    pub fn load(overrides: Overrides) -> PredictResult<Self> {
        let dir = program_dir()?;
        Ok(Self::resolve(&dir, overrides))
    }

    /// Resolve the configuration relative to `program_dir`.
    pub fn resolve(program_dir: &Path, overrides: Overrides) -> Self {
        let model_path = overrides
            .model_path
            .unwrap_or_else(|| program_dir.join(MODEL_FILE_NAME));
        let labels = match overrides.labels_path {
            Some(path) => LabelSource::File(path),
            None => LabelSource::Sidecar(program_dir.join(LABELS_FILE_NAME)),
        };

        Self {
            model_path,
            labels,
            schema: overrides.schema.unwrap_or_default(),
        }
    }
}

/// Directory containing the current executable.
pub fn program_dir() -> PredictResult<PathBuf> {
    let exe = env::current_exe()
        .map_err(|err| PredictError::with_source("cannot locate the running executable", &err))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| PredictError::unexpected("executable path has no parent directory"))
}

//! Filesystem repository for the model artefact and its label map.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::common::config::{AppCfg, LabelSource};
use crate::common::error::{PredictError, PredictResult};
use crate::features::domain::{FeatureSchema, SchemaVersion};

use super::domain::{ClassLabelMap, LabelFile, ModelRepo};
use super::xgboost::GbTreeModel;

/// Artefacts stored as plain files, by default next to the executable.
pub struct FsModelRepo {
    model_path: PathBuf,
    labels: LabelSource,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self {
            model_path: cfg.model_path.clone(),
            labels: cfg.labels.clone(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl ModelRepo for FsModelRepo {
    type Model = GbTreeModel;

    fn load_model(&self, schema: &FeatureSchema) -> PredictResult<GbTreeModel> {
        let start = Instant::now();
        let bytes = read_artifact(&self.model_path)?;
        let model = GbTreeModel::from_json_slice(&bytes)?;
        model.check_schema(schema)?;
        info!(
            path = %self.model_path.display(),
            trees = model.num_trees(),
            classes = model.num_groups(),
            dur_ms = start.elapsed().as_millis() as u64,
            "model loaded"
        );
        Ok(model)
    }

    fn load_labels(&self, schema: SchemaVersion) -> PredictResult<ClassLabelMap> {
        let path = match &self.labels {
            LabelSource::File(path) => path,
            LabelSource::Sidecar(path) if path.is_file() => path,
            LabelSource::Sidecar(path) => {
                debug!(path = %path.display(), "no label file, using built-in labels");
                return Ok(ClassLabelMap::builtin(schema));
            }
        };
        let bytes = read_artifact(path)?;
        let file: LabelFile = serde_json::from_slice(&bytes)
            .map_err(|err| PredictError::with_source("cannot parse label file", &err))?;
        let labels = ClassLabelMap::try_from(file)?;
        info!(
            path = %path.display(),
            version = labels.version(),
            classes = labels.len(),
            "label map loaded"
        );
        Ok(labels)
    }
}

/// Read a static artefact; absence is reported, never retried.
fn read_artifact(path: &Path) -> PredictResult<Vec<u8>> {
    fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => PredictError::artifact_not_found(path),
        _ => PredictError::with_source(format!("cannot read {}", path.display()), &err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Overrides;
    use crate::common::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn missing_model_is_artifact_not_found() {
        let dir = tempdir().unwrap();
        let cfg = AppCfg::resolve(dir.path(), Overrides::default());
        let repo = FsModelRepo::new(&cfg);
        let err = repo
            .load_model(&SchemaVersion::V2.schema())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
        assert!(err.to_string().contains(&repo.model_path().display().to_string()));
    }

    #[test]
    fn garbage_model_is_unexpected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("crop_health_model.json"), b"\x00\x01pickle").unwrap();
        let cfg = AppCfg::resolve(dir.path(), Overrides::default());
        let err = FsModelRepo::new(&cfg)
            .load_model(&SchemaVersion::V1.schema())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.to_string().contains("cannot parse model artifact"));
    }

    #[test]
    fn labels_fall_back_to_builtin_without_sidecar() {
        let dir = tempdir().unwrap();
        let cfg = AppCfg::resolve(dir.path(), Overrides::default());
        let labels = FsModelRepo::new(&cfg)
            .load_labels(SchemaVersion::V1)
            .unwrap();
        assert_eq!(labels, ClassLabelMap::builtin(SchemaVersion::V1));
    }

    #[test]
    fn sidecar_labels_are_used_when_present() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("crop_health_labels.json"),
            r#"{"version": "field-2025", "labels": {"0": "Thriving", "1": "Watch"}}"#,
        )
        .unwrap();
        let cfg = AppCfg::resolve(dir.path(), Overrides::default());
        let labels = FsModelRepo::new(&cfg)
            .load_labels(SchemaVersion::V2)
            .unwrap();
        assert_eq!(labels.version(), "field-2025");
        assert_eq!(labels.label(1), "Watch");
        assert_eq!(labels.label(2), "Unknown Class");
    }

    #[test]
    fn explicit_label_file_must_exist() {
        let dir = tempdir().unwrap();
        let cfg = AppCfg::resolve(
            dir.path(),
            Overrides {
                labels_path: Some(dir.path().join("labels-v9.json")),
                ..Overrides::default()
            },
        );
        let err = FsModelRepo::new(&cfg)
            .load_labels(SchemaVersion::V2)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
        assert!(err.to_string().contains("labels-v9.json"));
    }
}

//! Model contracts and the class label map.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::common::error::{PredictError, PredictResult};
use crate::features::domain::{FeatureSchema, SchemaVersion};

/// Placeholder label for class ids the label map does not know.
pub const UNKNOWN_CLASS: &str = "Unknown Class";

/// Anything that turns one aligned feature row into a class id.
pub trait Classifier {
    /// Number of columns the classifier expects in a row.
    fn feature_count(&self) -> usize;

    /// Predict the class id for a row of exactly `feature_count()` values.
    fn predict_class(&self, row: &[f64]) -> i64;
}

/// Read-only access to the artefacts a prediction needs.
pub trait ModelRepo {
    type Model: Classifier;

    /// Load the classifier and check it against `schema`.
    fn load_model(&self, schema: &FeatureSchema) -> PredictResult<Self::Model>;
    fn load_labels(&self, schema: SchemaVersion) -> PredictResult<ClassLabelMap>;
}

/// Class id to human readable label, tagged with the labelling scheme version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassLabelMap {
    version: String,
    labels: BTreeMap<i64, String>,
}

impl ClassLabelMap {
    pub fn new(version: impl Into<String>, labels: BTreeMap<i64, String>) -> Self {
        Self {
            version: version.into(),
            labels,
        }
    }

    /// Labels shipped with each schema generation.
    pub fn builtin(schema: SchemaVersion) -> Self {
        let names: [&str; 3] = match schema {
            SchemaVersion::V1 => ["Healthy", "Stressed", "Diseased"],
            SchemaVersion::V2 => ["Healthy", "Moderate", "Diseased"],
        };
        let labels = names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as i64, name.to_string()))
            .collect();
        Self::new(format!("builtin-{schema}"), labels)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, class_id: i64) -> Option<&str> {
        self.labels.get(&class_id).map(String::as_str)
    }

    /// Label for `class_id`, or [`UNKNOWN_CLASS`].
    pub fn label(&self, class_id: i64) -> &str {
        self.get(class_id).unwrap_or(UNKNOWN_CLASS)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// On-disk label file: `{"version": "...", "labels": {"0": "Healthy", ...}}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelFile {
    pub version: String,
    pub labels: BTreeMap<String, String>,
}

impl TryFrom<LabelFile> for ClassLabelMap {
    type Error = PredictError;

    fn try_from(file: LabelFile) -> PredictResult<Self> {
        let mut labels = BTreeMap::new();
        for (key, label) in file.labels {
            let id = key.trim().parse::<i64>().map_err(|_| {
                PredictError::unexpected(format!("label file key '{key}' is not an integer class id"))
            })?;
            if label.trim().is_empty() {
                return Err(PredictError::unexpected(format!(
                    "label file maps class {id} to an empty label"
                )));
            }
            labels.insert(id, label);
        }
        Ok(ClassLabelMap::new(file.version, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_maps_differ_only_in_class_one() {
        let v1 = ClassLabelMap::builtin(SchemaVersion::V1);
        let v2 = ClassLabelMap::builtin(SchemaVersion::V2);
        assert_eq!(v1.label(0), "Healthy");
        assert_eq!(v1.label(1), "Stressed");
        assert_eq!(v2.label(1), "Moderate");
        assert_eq!(v1.label(2), v2.label(2));
        assert_eq!(v2.version(), "builtin-v2");
    }

    #[test]
    fn unknown_ids_degrade_to_placeholder() {
        let map = ClassLabelMap::builtin(SchemaVersion::V2);
        assert_eq!(map.label(7), UNKNOWN_CLASS);
        assert_eq!(map.label(-1), UNKNOWN_CLASS);
        assert_eq!(map.get(7), None);
    }

    #[test]
    fn label_file_converts() {
        let file: LabelFile = serde_json::from_str(
            r#"{"version": "2024-06", "labels": {"0": "Healthy", "1": "Stressed", "4": "Flooded"}}"#,
        )
        .unwrap();
        let map = ClassLabelMap::try_from(file).unwrap();
        assert_eq!(map.version(), "2024-06");
        assert_eq!(map.len(), 3);
        assert_eq!(map.label(4), "Flooded");
    }

    #[test]
    fn label_file_rejects_bad_keys_and_empty_labels() {
        let bad_key: LabelFile =
            serde_json::from_str(r#"{"version": "x", "labels": {"zero": "Healthy"}}"#).unwrap();
        assert!(ClassLabelMap::try_from(bad_key).is_err());

        let empty: LabelFile =
            serde_json::from_str(r#"{"version": "x", "labels": {"0": " "}}"#).unwrap();
        assert!(ClassLabelMap::try_from(empty).is_err());
    }
}

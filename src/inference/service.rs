//! The predictor: derive, align, infer, label.

use std::time::Instant;

use tracing::{debug, warn};

use crate::common::error::{PredictError, PredictResult};
use crate::features::domain::{FeatureSchema, FeatureVector, SchemaVersion};
use crate::features::service as features;
use crate::model::domain::{ClassLabelMap, Classifier, ModelRepo, UNKNOWN_CLASS};

use super::domain::Prediction;

/// Owns one loaded model together with the schema and labels it was trained for.
pub struct Predictor<C> {
    model: C,
    schema: FeatureSchema,
    labels: ClassLabelMap,
}

impl<C: Classifier> Predictor<C> {
    /// Load the model and label map for `schema` from `repo`.
    pub fn load<R>(repo: &R, schema: SchemaVersion) -> PredictResult<Self>
    where
        R: ModelRepo<Model = C>,
    {
        let feature_schema = schema.schema();
        let model = repo.load_model(&feature_schema)?;
        let labels = repo.load_labels(schema)?;
        Self::new(model, feature_schema, labels)
    }

    pub fn new(model: C, schema: FeatureSchema, labels: ClassLabelMap) -> PredictResult<Self> {
        if model.feature_count() != schema.len() {
            return Err(PredictError::unexpected(format!(
                "classifier expects {} features, schema {} has {}",
                model.feature_count(),
                schema.version,
                schema.len()
            )));
        }
        Ok(Self {
            model,
            schema,
            labels,
        })
    }

    /// Predict one request. Unknown class ids still succeed with a placeholder label.
    pub fn predict(&self, mut request: FeatureVector) -> PredictResult<Prediction> {
        features::derive(&mut request, &self.schema)?;
        let row = features::align(&request, &self.schema)?;

        let start = Instant::now();
        let class_id = self.model.predict_class(&row);
        debug!(
            class_id,
            dur_us = start.elapsed().as_micros() as u64,
            "inference done"
        );

        let label = self.labels.label(class_id);
        if label == UNKNOWN_CLASS {
            warn!(
                class_id,
                labels = self.labels.version(),
                "class id has no label"
            );
        }

        Ok(Prediction {
            prediction: label.to_string(),
            class_id,
        })
    }
}

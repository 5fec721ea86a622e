//! Crop health predictor: one JSON feature vector in, one JSON prediction out.
pub mod api;
pub mod common;
pub mod features;
pub mod inference;
pub mod model;

pub use common::error::{ErrorKind, PredictError, PredictResult};
pub use features::domain::{FeatureVector, SchemaVersion};
pub use inference::domain::{Prediction, PredictionResult};
pub use inference::service::Predictor;

//! Inference: the predictor and the payloads it produces.

pub mod domain;
pub mod service;

pub use domain::{ErrorPayload, Prediction, PredictionResult};
pub use service::Predictor;

//! Wire payloads produced by a prediction: exactly one per invocation.

use serde::Serialize;

use crate::common::error::{PredictError, PredictResult};

/// Successful prediction: `{"prediction": "<label>", "class_id": <int>}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub prediction: String,
    pub class_id: i64,
}

/// Failure payload: `{"error": "...", "details"?: "...", "traceback"?: "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ErrorPayload {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            traceback: None,
        }
    }
}

impl From<&PredictError> for ErrorPayload {
    fn from(err: &PredictError) -> Self {
        Self {
            error: err.to_string(),
            details: err.details().map(str::to_owned),
            traceback: err.trace().map(str::to_owned),
        }
    }
}

/// Either outcome, serialised without a tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Success(Prediction),
    Failure(ErrorPayload),
}

impl PredictionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success(_))
    }

    /// Single-line JSON for stdout.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            serde_json::json!({ "error": format!("failed to serialise result: {err}") }).to_string()
        })
    }
}

impl From<PredictResult<Prediction>> for PredictionResult {
    fn from(result: PredictResult<Prediction>) -> Self {
        match result {
            Ok(prediction) => PredictionResult::Success(prediction),
            Err(err) => PredictionResult::Failure(ErrorPayload::from(&err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parsed(result: &PredictionResult) -> Value {
        serde_json::from_str(&result.to_json_line()).unwrap()
    }

    #[test]
    fn success_shape() {
        let result = PredictionResult::from(Ok(Prediction {
            prediction: "Healthy".into(),
            class_id: 0,
        }));
        assert!(result.is_success());
        assert_eq!(
            parsed(&result),
            json!({"prediction": "Healthy", "class_id": 0})
        );
    }

    #[test]
    fn plain_errors_only_carry_the_message() {
        let result = PredictionResult::from(Err(PredictError::schema_mismatch("SAVI")));
        assert!(!result.is_success());
        assert_eq!(
            parsed(&result),
            json!({"error": "Missing required feature 'SAVI'"})
        );
    }

    #[test]
    fn unexpected_errors_carry_details() {
        let err = PredictError::unexpected_with("boom", Some("root cause".into()), Some("at main".into()));
        let value = parsed(&PredictionResult::from(Err(err)));
        assert_eq!(value["error"], "boom");
        assert_eq!(value["details"], "root cause");
        assert_eq!(value["traceback"], "at main");
    }

    #[test]
    fn output_is_a_single_line() {
        let err = PredictError::unexpected_with("multi\nline", Some("a\nb".into()), None);
        let line = PredictionResult::from(Err(err)).to_json_line();
        assert!(!line.contains('\n'));
    }
}

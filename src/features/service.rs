//! Derivation and schema alignment of a single feature vector.

use tracing::debug;

use crate::common::error::{PredictError, PredictResult};

use super::domain::{FeatureSchema, FeatureVector};

/// Apply every derived-feature rule of `schema`, in declaration order.
pub fn derive(features: &mut FeatureVector, schema: &FeatureSchema) -> PredictResult<()> {
    for rule in schema.rules {
        let mut inputs = Vec::with_capacity(rule.inputs.len());
        for &input in rule.inputs {
            let value = features
                .number(input)?
                .ok_or_else(|| PredictError::missing_input(rule.name, input))?;
            inputs.push(value);
        }
        let value = rule.op.apply(&inputs);
        // NaN inputs stay missing; only overflow from finite inputs is an error.
        if !value.is_finite() && inputs.iter().all(|v| v.is_finite()) {
            return Err(PredictError::unexpected(format!(
                "derived feature '{}' is not finite ({value}) for inputs {inputs:?}",
                rule.name
            )));
        }
        debug!(feature = rule.name, value, "derived feature");
        features.insert(rule.name, value);
    }
    Ok(())
}

/// Build the model row by looking up each schema name in order.
///
/// Keys outside the schema are ignored; an absent schema key is an error.
pub fn align(features: &FeatureVector, schema: &FeatureSchema) -> PredictResult<Vec<f64>> {
    let mut row = Vec::with_capacity(schema.len());
    for &name in schema.names {
        let value = features
            .number(name)?
            .ok_or_else(|| PredictError::schema_mismatch(name))?;
        row.push(value);
    }
    debug!(
        schema = %schema.version,
        columns = row.len(),
        ignored = features.len().saturating_sub(row.len()),
        "aligned feature row"
    );
    Ok(row)
}

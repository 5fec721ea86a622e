//! Feature vectors, the fixed feature schemas and derived-feature rules.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Number, Value};

use crate::common::error::{PredictError, PredictResult};

/// Base columns shared by every schema version, in training order.
const BASE_FEATURES: [&str; 25] = [
    "Humidity_%",
    "Rainfall_m",
    "Temperature_C",
    "WindSpeed_m/s",
    "SolarRadiation",
    "Clay",
    "OrganicCarbon",
    "Sand",
    "Silt",
    "SoilMoisture",
    "EVI",
    "NDVI",
    "NDWI",
    "SAVI",
    "week_number",
    "month",
    "day_of_year",
    "region_East_Africa",
    "region_North_Africa",
    "region_South_Africa",
    "region_West_Africa",
    "season_Autumn",
    "season_Spring",
    "season_Summer",
    "season_Winter",
];

const V2_FEATURES: [&str; 27] = [
    "Humidity_%",
    "Rainfall_m",
    "Temperature_C",
    "WindSpeed_m/s",
    "SolarRadiation",
    "Clay",
    "OrganicCarbon",
    "Sand",
    "Silt",
    "SoilMoisture",
    "EVI",
    "NDVI",
    "NDWI",
    "SAVI",
    "week_number",
    "month",
    "day_of_year",
    "region_East_Africa",
    "region_North_Africa",
    "region_South_Africa",
    "region_West_Africa",
    "season_Autumn",
    "season_Spring",
    "season_Summer",
    "season_Winter",
    "NDVI_Rainfall",
    "SM_Temp",
];

/// Applied in this order.
const V2_RULES: [DerivedFeatureRule; 2] = [
    DerivedFeatureRule {
        name: "NDVI_Rainfall",
        op: RuleOp::Product,
        inputs: &["NDVI", "Rainfall_m"],
    },
    DerivedFeatureRule {
        name: "SM_Temp",
        op: RuleOp::Product,
        inputs: &["SoilMoisture", "Temperature_C"],
    },
];

/// Feature schema generations the model was trained against.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SchemaVersion {
    /// Base columns only.
    V1,
    /// Base columns plus interaction terms.
    #[default]
    V2,
}

impl SchemaVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::V2 => "v2",
        }
    }

    pub fn schema(&self) -> FeatureSchema {
        match self {
            SchemaVersion::V1 => FeatureSchema {
                version: *self,
                names: &BASE_FEATURES,
                rules: &[],
            },
            SchemaVersion::V2 => FeatureSchema {
                version: *self,
                names: &V2_FEATURES,
                rules: &V2_RULES,
            },
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(SchemaVersion::V1),
            "v2" | "2" => Ok(SchemaVersion::V2),
            other => Err(format!("unknown schema version '{other}' (expected v1 or v2)")),
        }
    }
}

/// How a derived feature combines its inputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RuleOp {
    Product,
}

impl RuleOp {
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            RuleOp::Product => values.iter().product(),
        }
    }
}

/// `name = op(inputs...)`, computed before schema alignment.
#[derive(Copy, Clone, Debug)]
pub struct DerivedFeatureRule {
    pub name: &'static str,
    pub op: RuleOp,
    pub inputs: &'static [&'static str],
}

/// Ordered feature names plus the rules that produce the derived ones.
#[derive(Copy, Clone, Debug)]
pub struct FeatureSchema {
    pub version: SchemaVersion,
    pub names: &'static [&'static str],
    pub rules: &'static [DerivedFeatureRule],
}

impl FeatureSchema {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One request's named feature values, exactly as the caller sent them.
///
/// Values are only coerced when a name is consumed, so unrelated keys with
/// odd types never cause a failure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    values: Map<String, Value>,
}

impl FeatureVector {
    /// Parse a request; the top-level value must be a JSON object.
    pub fn from_json(raw: &str) -> PredictResult<Self> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(values) => Ok(Self { values }),
            other => Err(PredictError::unexpected(format!(
                "input must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric value for `name`; `Ok(None)` when absent.
    ///
    /// Booleans map to 1/0 and `null` to NaN (treated as missing by the model).
    pub fn number(&self, name: &str) -> PredictResult<Option<f64>> {
        let Some(value) = self.values.get(name) else {
            return Ok(None);
        };
        match value {
            Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| {
                PredictError::unexpected(format!("feature '{name}' is not representable as f64"))
            }),
            Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
            Value::Null => Ok(Some(f64::NAN)),
            other => Err(PredictError::unexpected(format!(
                "feature '{name}' must be numeric, got {}",
                json_type(other)
            ))),
        }
    }

    /// Set `name`, replacing any caller-supplied value.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let value = Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.values.insert(name.into(), value);
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut fv = FeatureVector::default();
        for (k, v) in iter {
            fv.insert(k, v);
        }
        fv
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_extends_v1_with_derived_columns() {
        let v1 = SchemaVersion::V1.schema();
        let v2 = SchemaVersion::V2.schema();
        assert_eq!(v1.len(), 25);
        assert_eq!(v2.len(), 27);
        assert_eq!(&v2.names[..25], v1.names);
        assert_eq!(&v2.names[25..], &["NDVI_Rainfall", "SM_Temp"]);
        assert!(v1.rules.is_empty());

        let derived: Vec<_> = v2.rules.iter().map(|r| r.name).collect();
        assert_eq!(derived, vec!["NDVI_Rainfall", "SM_Temp"]);
        for rule in v2.rules {
            assert!(v2.names.contains(&rule.name));
        }
    }

    #[test]
    fn schema_version_parses() {
        assert_eq!("v1".parse::<SchemaVersion>(), Ok(SchemaVersion::V1));
        assert_eq!("V2".parse::<SchemaVersion>(), Ok(SchemaVersion::V2));
        assert!("v3".parse::<SchemaVersion>().is_err());
    }

    #[test]
    fn numbers_are_coerced_lazily() {
        let fv = FeatureVector::from_json(
            r#"{"NDVI": 0.5, "region_East_Africa": true, "EVI": null, "note": "hi"}"#,
        )
        .unwrap();
        assert_eq!(fv.number("NDVI").unwrap(), Some(0.5));
        assert_eq!(fv.number("region_East_Africa").unwrap(), Some(1.0));
        assert!(fv.number("EVI").unwrap().unwrap().is_nan());
        assert_eq!(fv.number("absent").unwrap(), None);
        assert!(fv.number("note").is_err());
    }

    #[test]
    fn non_object_input_is_rejected() {
        let err = FeatureVector::from_json("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("JSON object"));
        assert!(FeatureVector::from_json("not json").is_err());
    }

    #[test]
    fn product_rule() {
        assert_eq!(RuleOp::Product.apply(&[0.5, 10.0]), 5.0);
    }
}

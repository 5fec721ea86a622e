//! Feature handling: the fixed schemas, derived features and row alignment.

pub mod domain;
pub mod service;

pub use domain::{DerivedFeatureRule, FeatureSchema, FeatureVector, RuleOp, SchemaVersion};

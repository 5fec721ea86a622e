//! Gradient-boosted tree ensembles read from XGBoost's JSON model format
//! (`Booster.save_model("model.json")`).
//!
//! Only the parts needed for class prediction are read: objective, class
//! count, base score and the tree arrays. Categorical splits and the `dart`
//! booster are not supported and are rejected at load time.

use serde::Deserialize;

use crate::common::error::{PredictError, PredictResult};
use crate::features::domain::FeatureSchema;

use super::domain::Classifier;

/// XGBoost writes most scalars as strings (`"3"`, `"5E-1"`, `"[5E-1]"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Num(f64),
    Text(String),
}

impl Scalar {
    /// Every value held; bracketed strings may carry one value per output group.
    fn values(&self, field: &str) -> PredictResult<Vec<f64>> {
        match self {
            Scalar::Num(n) => Ok(vec![*n]),
            Scalar::Text(s) => {
                let trimmed = s.trim();
                let inner = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .unwrap_or(trimmed);
                inner
                    .split(',')
                    .map(|item| {
                        item.trim().parse::<f64>().map_err(|_| {
                            PredictError::unexpected(format!(
                                "model parameter '{field}' is not numeric: {s}"
                            ))
                        })
                    })
                    .collect()
            }
        }
    }

    fn as_f64(&self, field: &str) -> PredictResult<f64> {
        match self.values(field)?.as_slice() {
            [value] => Ok(*value),
            values => Err(PredictError::unexpected(format!(
                "model parameter '{field}' holds {} values, expected one",
                values.len()
            ))),
        }
    }

    fn as_usize(&self, field: &str) -> PredictResult<usize> {
        let value = self.as_f64(field)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(PredictError::unexpected(format!(
                "model parameter '{field}' must be a non-negative integer, got {value}"
            )));
        }
        Ok(value as usize)
    }
}

/// `default_left` is 0/1 in older dumps and booleans in newer ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawModel {
    learner: RawLearner,
}

#[derive(Debug, Deserialize)]
struct RawLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    learner_model_param: RawModelParam,
    objective: RawObjective,
    gradient_booster: RawBooster,
}

#[derive(Debug, Deserialize)]
struct RawModelParam {
    base_score: Option<Scalar>,
    num_class: Option<Scalar>,
    num_feature: Scalar,
}

#[derive(Debug, Deserialize)]
struct RawObjective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawBooster {
    name: String,
    model: Option<RawForest>,
}

#[derive(Debug, Deserialize)]
struct RawForest {
    trees: Vec<RawTree>,
    tree_info: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
}

/// How tree margins turn into a class id.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Objective {
    /// `binary:logistic` / `binary:logitraw`: base score is a probability.
    BinaryLogistic,
    /// `binary:hinge`: base score is already a margin.
    BinaryHinge,
    /// `multi:softprob` / `multi:softmax`: argmax over class margins.
    Multiclass,
}

impl Objective {
    fn parse(name: &str) -> PredictResult<Self> {
        match name {
            "binary:logistic" | "binary:logitraw" => Ok(Objective::BinaryLogistic),
            "binary:hinge" => Ok(Objective::BinaryHinge),
            "multi:softprob" | "multi:softmax" => Ok(Objective::Multiclass),
            other => Err(PredictError::unexpected(format!(
                "unsupported model objective '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f64),
}

/// One regression tree; node 0 is the root and children always follow their parent.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: RawTree, num_feature: usize, index: usize) -> PredictResult<Self> {
        let n = raw.left_children.len();
        let corrupt = |what: String| PredictError::unexpected(format!("tree {index}: {what}"));

        if n == 0 {
            return Err(corrupt("has no nodes".into()));
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(corrupt("node arrays have different lengths".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = raw.left_children[i];
            let right = raw.right_children[i];
            if left == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[i]));
                continue;
            }
            let child = |c: i64| -> PredictResult<usize> {
                if c <= i as i64 || c >= n as i64 {
                    Err(corrupt(format!("node {i} has invalid child {c}")))
                } else {
                    Ok(c as usize)
                }
            };
            let feature = raw.split_indices[i];
            if feature < 0 || feature as usize >= num_feature {
                return Err(corrupt(format!(
                    "node {i} splits on feature {feature}, model has {num_feature}"
                )));
            }
            nodes.push(Node::Split {
                feature: feature as usize,
                threshold: raw.split_conditions[i],
                left: child(left)?,
                right: child(right)?,
                default_left: raw.default_left[i].is_set(),
            });
        }
        Ok(Self { nodes })
    }

    /// Leaf value reached by `row`. Missing (NaN) values follow the default branch.
    pub fn leaf_value(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row.get(*feature).copied().unwrap_or(f64::NAN);
                    let go_left = if x.is_nan() { *default_left } else { x < *threshold };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// A `gbtree` ensemble ready for class prediction.
#[derive(Clone, Debug)]
pub struct GbTreeModel {
    objective: Objective,
    num_groups: usize,
    num_feature: usize,
    base_margin: Vec<f64>,
    trees: Vec<(Tree, usize)>,
    feature_names: Vec<String>,
}

impl GbTreeModel {
    /// Parse and validate an XGBoost JSON model.
    pub fn from_json_slice(bytes: &[u8]) -> PredictResult<Self> {
        let raw: RawModel = serde_json::from_slice(bytes)
            .map_err(|err| PredictError::with_source("cannot parse model artifact", &err))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawModel) -> PredictResult<Self> {
        let learner = raw.learner;
        let objective = Objective::parse(&learner.objective.name)?;

        if learner.gradient_booster.name != "gbtree" {
            return Err(PredictError::unexpected(format!(
                "unsupported booster '{}'",
                learner.gradient_booster.name
            )));
        }
        let forest = learner
            .gradient_booster
            .model
            .ok_or_else(|| PredictError::unexpected("model artifact has no trees"))?;

        let params = learner.learner_model_param;
        let num_feature = params.num_feature.as_usize("num_feature")?;
        let num_class = match &params.num_class {
            Some(s) => s.as_usize("num_class")?,
            None => 0,
        };
        let num_groups = match objective {
            Objective::Multiclass if num_class < 2 => {
                return Err(PredictError::unexpected(format!(
                    "multiclass objective with num_class = {num_class}"
                )))
            }
            Objective::Multiclass => num_class,
            _ => 1,
        };
        // Every output group needs at least one tree.
        if num_groups > forest.trees.len() {
            return Err(PredictError::unexpected(format!(
                "num_class = {num_groups} exceeds the {} trees in the model",
                forest.trees.len()
            )));
        }

        let base_scores = match &params.base_score {
            Some(s) => s.values("base_score")?,
            None => vec![0.5],
        };
        let base_scores = match base_scores.len() {
            1 => vec![base_scores[0]; num_groups],
            n if n == num_groups => base_scores,
            n => {
                return Err(PredictError::unexpected(format!(
                    "base_score holds {n} values for {num_groups} output groups"
                )))
            }
        };
        let base_margin = match objective {
            Objective::BinaryLogistic => base_scores
                .into_iter()
                .map(logit)
                .collect::<PredictResult<Vec<_>>>()?,
            Objective::BinaryHinge | Objective::Multiclass => base_scores,
        };

        if forest.tree_info.len() != forest.trees.len() {
            return Err(PredictError::unexpected(format!(
                "tree_info has {} entries for {} trees",
                forest.tree_info.len(),
                forest.trees.len()
            )));
        }

        let mut trees = Vec::with_capacity(forest.trees.len());
        for (index, (raw_tree, group)) in forest
            .trees
            .into_iter()
            .zip(forest.tree_info)
            .enumerate()
        {
            if group < 0 || group as usize >= num_groups {
                return Err(PredictError::unexpected(format!(
                    "tree {index} belongs to class {group}, model has {num_groups} output groups"
                )));
            }
            trees.push((Tree::from_raw(raw_tree, num_feature, index)?, group as usize));
        }

        if !learner.feature_names.is_empty() && learner.feature_names.len() != num_feature {
            return Err(PredictError::unexpected(format!(
                "model declares {} feature names for {num_feature} features",
                learner.feature_names.len()
            )));
        }

        Ok(Self {
            objective,
            num_groups,
            num_feature,
            base_margin,
            trees,
            feature_names: learner.feature_names,
        })
    }

    /// Reject a model trained on a different column layout than `schema`.
    pub fn check_schema(&self, schema: &FeatureSchema) -> PredictResult<()> {
        if self.num_feature != schema.len() {
            return Err(PredictError::unexpected(format!(
                "model expects {} features, schema {} has {}",
                self.num_feature,
                schema.version,
                schema.len()
            )));
        }
        if self.feature_names.is_empty() {
            return Ok(());
        }
        for (i, (declared, expected)) in self.feature_names.iter().zip(schema.names).enumerate() {
            if declared != expected {
                return Err(PredictError::unexpected(format!(
                    "feature_names mismatch at column {i}: model has '{declared}', schema {} has '{expected}'",
                    schema.version
                )));
            }
        }
        Ok(())
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw margin per output group.
    pub fn margins(&self, row: &[f64]) -> Vec<f64> {
        let mut margins = self.base_margin.clone();
        for (tree, group) in &self.trees {
            margins[*group] += tree.leaf_value(row);
        }
        margins
    }
}

impl Classifier for GbTreeModel {
    fn feature_count(&self) -> usize {
        self.num_feature
    }

    fn predict_class(&self, row: &[f64]) -> i64 {
        let margins = self.margins(row);
        if self.num_groups == 1 {
            return i64::from(margins[0] > 0.0);
        }
        let mut best = 0;
        for (class, margin) in margins.iter().enumerate().skip(1) {
            if *margin > margins[best] {
                best = class;
            }
        }
        best as i64
    }
}

fn logit(p: f64) -> PredictResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(PredictError::unexpected(format!(
            "base_score {p} is outside (0, 1) for a logistic objective"
        )));
    }
    Ok((p / (1.0 - p)).ln())
}

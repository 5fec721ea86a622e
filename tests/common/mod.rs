#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use crop_health::SchemaVersion;
use serde_json::{json, Map, Value};

pub const BIN: &str = "crop-health-predict";

/// A one-split tree: `x[feature] < threshold ? left : right`, NaN goes left.
pub fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Value {
    json!({
        "base_weights": [0.0, left, right],
        "left_children": [1, -1, -1],
        "right_children": [2, -1, -1],
        "split_indices": [feature, 0, 0],
        "split_conditions": [threshold, left, right],
        "default_left": [1, 0, 0],
        "tree_param": {"num_nodes": "3", "num_feature": "0"}
    })
}

pub fn leaf(value: f64) -> Value {
    json!({
        "left_children": [-1],
        "right_children": [-1],
        "split_indices": [0],
        "split_conditions": [value],
        "default_left": [0]
    })
}

/// XGBoost-style JSON for a multiclass `gbtree` model over `schema`.
pub fn model_json(schema: SchemaVersion, num_class: usize, trees: Vec<(Value, usize)>) -> Value {
    let names = schema.schema().names;
    let (trees, info): (Vec<Value>, Vec<usize>) = trees.into_iter().unzip();
    json!({
        "learner": {
            "attributes": {},
            "feature_names": names,
            "feature_types": [],
            "gradient_booster": {
                "model": {
                    "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": trees.len().to_string()},
                    "iteration_indptr": [],
                    "tree_info": info,
                    "trees": trees
                },
                "name": "gbtree"
            },
            "learner_model_param": {
                "base_score": "5E-1",
                "num_class": num_class.to_string(),
                "num_feature": names.len().to_string(),
                "num_target": "1"
            },
            "objective": {"name": "multi:softprob", "softmax_multiclass_param": {"num_class": num_class.to_string()}}
        },
        "version": [2, 0, 3]
    })
}

fn index_of(schema: SchemaVersion, name: &str) -> usize {
    schema
        .schema()
        .names
        .iter()
        .position(|n| *n == name)
        .expect("feature in schema")
}

/// v2 model: class 0 when NDVI_Rainfall >= 3, class 1 when SM_Temp < 5, else class 2.
pub fn crop_model_v2() -> Value {
    let s = SchemaVersion::V2;
    model_json(
        s,
        3,
        vec![
            (stump(index_of(s, "NDVI_Rainfall"), 3.0, -1.0, 1.0), 0),
            (stump(index_of(s, "SM_Temp"), 5.0, 1.0, -1.0), 1),
            (leaf(0.0), 2),
        ],
    )
}

/// v1 model: class 0 when NDVI >= 0.4, otherwise class 1.
pub fn crop_model_v1() -> Value {
    let s = SchemaVersion::V1;
    model_json(
        s,
        3,
        vec![
            (stump(index_of(s, "NDVI"), 0.4, -1.0, 1.0), 0),
            (stump(index_of(s, "NDVI"), 0.4, 0.5, -1.0), 1),
            (leaf(-2.0), 2),
        ],
    )
}

/// Eight classes where class 7 always wins.
pub fn eight_class_model() -> Value {
    let s = SchemaVersion::V2;
    let mut trees: Vec<(Value, usize)> = (0..7).map(|class| (leaf(-1.0), class)).collect();
    trees.push((leaf(2.0), 7));
    model_json(s, 8, trees)
}

pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(value).expect("serialise")).expect("write fixture");
    path
}

/// Every base feature with a neutral value, plus the Scenario A inputs.
pub fn full_request() -> Map<String, Value> {
    let mut request = Map::new();
    for name in SchemaVersion::V1.schema().names {
        request.insert(name.to_string(), json!(0));
    }
    request.insert("NDVI".into(), json!(0.5));
    request.insert("Rainfall_m".into(), json!(10));
    request.insert("SoilMoisture".into(), json!(0.3));
    request.insert("Temperature_C".into(), json!(20));
    request.insert("region_East_Africa".into(), json!(1));
    request.insert("season_Summer".into(), json!(1));
    request
}

pub fn parse_line(line: &str) -> Value {
    assert!(!line.contains('\n'), "output must be one line: {line}");
    serde_json::from_str(line).expect("stdout is JSON")
}

//! Model artefacts: the classifier contract, the XGBoost tree ensemble and
//! filesystem loading of both the model and its class labels.

pub mod domain;
pub mod repo_fs;
pub mod xgboost;

pub use domain::{ClassLabelMap, Classifier, ModelRepo, UNKNOWN_CLASS};
pub use repo_fs::FsModelRepo;
pub use xgboost::GbTreeModel;

//! Model training module
//!
//! Fits a bagged ensemble of regression trees on preprocessed tender history:
//! - Seeded train / evaluation partition
//! - Random forest regressor (parallel, reproducible)
//! - MAE, R² and ranked feature importances
//! - Minimum-sample readiness gate for callers

mod config;
mod engine;
mod guard;
mod metrics;
pub mod decision_tree;
pub mod random_forest;

pub use config::TrainingConfig;
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{train_test_split, ModelTrainer, SplitIndices};
pub use guard::{TrainingGuard, TrainingReadiness};
pub use metrics::{rank_importances, FeatureImportance, RegressionScores, TrainingMetrics};
pub use random_forest::{MaxFeatures, RandomForest};

//! Training configuration

use super::random_forest::MaxFeatures;
use serde::{Deserialize, Serialize};

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of trees in the forest
    pub n_estimators: usize,

    /// Maximum depth per tree
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    /// Features considered at each split
    pub max_features: MaxFeatures,

    /// Bootstrap sampling per tree
    pub bootstrap: bool,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Seed for the partition shuffle and the forest
    pub random_seed: u64,

    /// Minimum rows with target, base amount and date before training is offered
    pub min_training_samples: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 3,
            max_features: MaxFeatures::All,
            bootstrap: true,
            test_size: 0.2,
            random_seed: 42,
            min_training_samples: 15,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_test_size(mut self, size: f64) -> Self {
        self.test_size = size.clamp(0.0, 0.9);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_min_training_samples(mut self, n: usize) -> Self {
        self.min_training_samples = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.max_depth, Some(10));
        assert_eq!(config.min_samples_split, 5);
        assert_eq!(config.min_samples_leaf, 3);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.min_training_samples, 15);
    }

    #[test]
    fn test_partial_json() {
        let config: TrainingConfig = serde_json::from_str(r#"{"n_estimators": 10}"#).unwrap();
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.test_size, 0.2);
    }
}

//! Evaluation metrics reported after training

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Relative contribution of one feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Metrics returned to the caller of a training run; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Mean absolute error on the held-out partition, in percentage points
    pub mae: f64,
    /// R-squared on the held-out partition
    pub r2: f64,
    /// Rows used for the run (training + evaluation)
    pub n_samples: usize,
    pub n_train: usize,
    pub n_eval: usize,
    /// Sorted by descending importance
    pub feature_importances: Vec<FeatureImportance>,
    pub training_time_secs: f64,
}

impl TrainingMetrics {
    /// Most important feature, if any
    pub fn top_feature(&self) -> Option<&FeatureImportance> {
        self.feature_importances.first()
    }
}

/// Mean absolute error and R² of a set of predictions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionScores {
    pub mae: f64,
    pub r2: f64,
}

impl RegressionScores {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len() as f64;
        if y_true.is_empty() {
            return Self { mae: 0.0, r2: 0.0 };
        }

        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();

        // Constant targets: only a perfect fit explains them
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self { mae, r2 }
    }
}

/// Pair importances with their column names, sorted descending (stable on ties)
pub fn rank_importances(columns: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = columns
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_scores() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.1, 2.9, 4.0, 5.1];

        let scores = RegressionScores::compute(&y_true, &y_pred);
        assert!((scores.mae - 0.08).abs() < 1e-9);
        assert!(scores.r2 > 0.9);
    }

    #[test]
    fn test_constant_targets() {
        let y_true = array![18.0, 18.0];
        assert_eq!(RegressionScores::compute(&y_true, &array![18.0, 18.0]).r2, 1.0);
        assert_eq!(RegressionScores::compute(&y_true, &array![17.0, 18.0]).r2, 0.0);
    }

    #[test]
    fn test_rank_importances() {
        let columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_importances(&columns, &[0.2, 0.5, 0.3]);
        let names: Vec<&str> = ranked.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }
}

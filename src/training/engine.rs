//! Training engine: split, fit the forest, evaluate, persist

use crate::artifacts::{ModelArtifactBundle, ModelArtifactStore};
use crate::error::{Result, ThresholdError};
use crate::preprocessing::{frame_to_matrix, FeaturePreprocessor, FitOutput};
use super::config::TrainingConfig;
use super::metrics::{rank_importances, RegressionScores, TrainingMetrics};
use super::random_forest::RandomForest;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info};

/// Row indices of a reproducible train / evaluation partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

/// Shuffle `0..n` with a seeded generator and hold out `ceil(test_size * n)` rows.
///
/// At least one row lands on each side; fewer than two rows cannot be split.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if n < 2 {
        return Err(ThresholdError::InsufficientData(format!(
            "{} usable rows, at least 2 are needed for a train/evaluation split",
            n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_eval = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);
    let train = indices.split_off(n_eval);
    Ok(SplitIndices { train, eval: indices })
}

/// Fits the threshold forest on preprocessed history
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainingConfig,
    preprocessor: FeaturePreprocessor,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            preprocessor: FeaturePreprocessor::new(),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn build_forest(&self) -> RandomForest {
        RandomForest::new(self.config.n_estimators)
            .with_max_depth(self.config.max_depth)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_max_features(self.config.max_features)
            .with_bootstrap(self.config.bootstrap)
            .with_random_state(self.config.random_seed)
    }

    /// Train on the output of [`FeaturePreprocessor::fit`]
    pub fn train(&self, fit: FitOutput) -> Result<(ModelArtifactBundle, TrainingMetrics)> {
        let start = Instant::now();

        if fit.columns.is_empty() {
            return Err(ThresholdError::InsufficientData(
                "no usable feature columns".to_string(),
            ));
        }
        let x = frame_to_matrix(&fit.features, &fit.columns)?;
        let y = fit.target;
        if x.nrows() == 0 {
            return Err(ThresholdError::InsufficientData("feature table is empty".to_string()));
        }

        let split = train_test_split(x.nrows(), self.config.test_size, self.config.random_seed)?;
        let (x_train, y_train) = take_rows(&x, &y, &split.train);
        let (x_eval, y_eval) = take_rows(&x, &y, &split.eval);
        debug!(train = split.train.len(), eval = split.eval.len(), "Partitioned rows");

        let mut model = self.build_forest();
        model.fit(&x_train, &y_train)?;

        let y_pred = model.predict(&x_eval)?;
        let scores = RegressionScores::compute(&y_eval, &y_pred);
        let importances = model.feature_importances().unwrap_or(&[]);

        let metrics = TrainingMetrics {
            mae: scores.mae,
            r2: scores.r2,
            n_samples: x.nrows(),
            n_train: split.train.len(),
            n_eval: split.eval.len(),
            feature_importances: rank_importances(fit.columns.as_slice(), importances),
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            samples = metrics.n_samples,
            mae = metrics.mae,
            r2 = metrics.r2,
            top_feature = metrics.top_feature().map(|f| f.feature.as_str()).unwrap_or("-"),
            elapsed_secs = metrics.training_time_secs,
            "Model training complete"
        );

        let bundle = ModelArtifactBundle::new(model, fit.columns, fit.registry);
        Ok((bundle, metrics))
    }

    /// Preprocess a raw history frame, then train
    pub fn train_frame(&self, df: &DataFrame) -> Result<(ModelArtifactBundle, TrainingMetrics)> {
        let fit = self.preprocessor.fit(df)?;
        self.train(fit)
    }

    /// Preprocess, train and replace the stored bundle. Nothing is written
    /// unless every earlier step succeeded.
    pub fn train_and_persist(&self, df: &DataFrame, store: &ModelArtifactStore) -> Result<TrainingMetrics> {
        let (bundle, metrics) = self.train_frame(df)?;
        store.save(&bundle)?;
        Ok(metrics)
    }
}

fn take_rows(x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), rows), y.select(Axis(0), rows))
}

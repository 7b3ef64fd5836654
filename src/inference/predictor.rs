//! Single-record scoring against the stored bundle

use crate::artifacts::{ModelArtifactBundle, ModelArtifactStore};
use crate::error::{Result, ThresholdError};
use crate::preprocessing::{frame_to_matrix, FeaturePreprocessor, UNKNOWN_CATEGORY};
use crate::records::{columns, records_to_frame};
use super::request::PredictionRequest;
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Scores new tenders with whatever bundle the store currently holds.
///
/// The bundle is loaded on every call, so a retrain is picked up without
/// rebuilding the predictor. Prediction never writes to the store.
#[derive(Debug, Clone)]
pub struct Predictor {
    store: Arc<ModelArtifactStore>,
    preprocessor: FeaturePreprocessor,
}

impl Predictor {
    pub fn new(store: Arc<ModelArtifactStore>) -> Self {
        Self {
            store,
            preprocessor: FeaturePreprocessor::new(),
        }
    }

    pub fn store(&self) -> &ModelArtifactStore {
        &self.store
    }

    /// Predicted anomaly threshold, in percent
    pub fn predict(&self, request: &PredictionRequest) -> Result<f64> {
        let start = Instant::now();
        let bundle = self.store.require()?;
        request.validate()?;

        let frame = records_to_frame(&[request.to_record()])?;
        let threshold = self.score(&bundle, &frame)?;

        info!(
            bundle_id = %bundle.info.bundle_id,
            threshold,
            latency_us = start.elapsed().as_micros() as u64,
            "Predicted anomaly threshold"
        );
        Ok(threshold)
    }

    fn score(&self, bundle: &ModelArtifactBundle, frame: &DataFrame) -> Result<f64> {
        let features = self
            .preprocessor
            .transform(frame, &bundle.registry, &bundle.columns)?;
        let x = frame_to_matrix(&features, &bundle.columns)?;

        let row: Vec<(String, f64)> = bundle
            .columns
            .iter()
            .zip(x.row(0).iter())
            .map(|(name, &value)| (name.to_string(), value))
            .collect();
        debug!(features = ?row, "Aligned feature row");

        let fail = |message: String| ThresholdError::Prediction {
            message,
            features: row.clone(),
        };
        let predictions = bundle.model.predict(&x).map_err(|e| fail(e.to_string()))?;
        match predictions.get(0) {
            Some(value) if value.is_finite() => Ok(*value),
            Some(value) => Err(fail(format!("model returned {}", value))),
            None => Err(fail("model returned no prediction".to_string())),
        }
    }

    /// Category choices for input forms: the trained vocabulary plus
    /// `"Unknown"`, sorted. Empty when no model is trained.
    pub fn known_categories(&self) -> Vec<String> {
        let Some(bundle) = self.store.load() else {
            return Vec::new();
        };

        let mut categories = bundle.vocabulary(columns::WORK_CATEGORY).to_vec();
        categories.push(UNKNOWN_CATEGORY.to_string());
        categories.sort();
        categories.dedup();
        categories
    }
}

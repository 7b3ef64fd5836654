//! Tender Threshold - anomaly threshold prediction for procurement tenders
//!
//! Learns the historical anomaly threshold (the discount percentage above
//! which an offer is flagged as anomalously low) from past tenders and
//! predicts it for new ones.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`preprocessing`] - Fit/transform feature pipeline, encoder registry, column alignment
//! - [`training`] - Random forest regressor, seeded split, metrics, readiness gate
//! - [`artifacts`] - All-or-nothing persistence of the model bundle
//! - [`inference`] - Single-record prediction
//!
//! ## Supporting
//! - [`records`] - Tender records and the canonical column schema
//! - [`summary`] - Descriptive statistics of historical thresholds
//! - [`utils`] - CSV / JSON / Parquet loading
//! - [`config`] - Application configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline
pub mod preprocessing;
pub mod training;
pub mod artifacts;
pub mod inference;

// Supporting
pub mod records;
pub mod summary;
pub mod utils;
pub mod config;

// Services
pub mod cli;

pub use error::{Result, ThresholdError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, ThresholdError};

    // Records
    pub use crate::records::{columns, records_to_frame, TenderRecord};

    // Preprocessing
    pub use crate::preprocessing::{EncoderRegistry, FeaturePreprocessor, FitOutput, TrainedColumnOrder};

    // Training
    pub use crate::training::{ModelTrainer, TrainingConfig, TrainingGuard, TrainingMetrics, TrainingReadiness};

    // Artifacts
    pub use crate::artifacts::{ArtifactStoreConfig, ModelArtifactBundle, ModelArtifactStore};

    // Inference
    pub use crate::inference::{PredictionRequest, Predictor};

    // Summary and configuration
    pub use crate::config::AppConfig;
    pub use crate::summary::ThresholdSummary;
    pub use crate::utils::DataLoader;
}

//! Model artifact bundle and its persistence
//!
//! A bundle is the trained forest plus everything needed to rebuild its input
//! shape: the trained column order and the categorical vocabularies.

mod backend;
mod store;

pub use backend::{ArtifactBackend, FsBackend, MemoryBackend};
pub use store::{ArtifactStoreConfig, ModelArtifactStore};

use crate::error::{Result, ThresholdError};
use crate::preprocessing::{EncoderRegistry, TrainedColumnOrder};
use crate::training::RandomForest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity shared by the three files of one saved bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    pub bundle_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl BundleInfo {
    pub fn generate() -> Self {
        Self {
            bundle_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

/// Output of one successful training run
#[derive(Debug, Clone)]
pub struct ModelArtifactBundle {
    pub model: RandomForest,
    pub columns: TrainedColumnOrder,
    pub registry: EncoderRegistry,
    pub info: BundleInfo,
}

impl ModelArtifactBundle {
    pub fn new(model: RandomForest, columns: TrainedColumnOrder, registry: EncoderRegistry) -> Self {
        Self {
            model,
            columns,
            registry,
            info: BundleInfo::generate(),
        }
    }

    /// The model must accept exactly the trained columns
    pub fn validate(&self) -> Result<()> {
        self.columns.validate()?;
        if self.model.n_features() != self.columns.len() {
            return Err(ThresholdError::Shape {
                expected: format!("{} model inputs", self.columns.len()),
                actual: format!("{} model inputs", self.model.n_features()),
            });
        }
        Ok(())
    }

    /// Trained vocabulary of `column`, empty when it has none
    pub fn vocabulary(&self, column: &str) -> &[String] {
        self.registry.vocabulary(column).unwrap_or(&[])
    }
}

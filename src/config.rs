//! Application configuration

use crate::artifacts::ArtifactStoreConfig;
use crate::error::Result;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides the artifact directory
pub const MODEL_DIR_ENV: &str = "TENDER_MODEL_DIR";

/// Top-level configuration: training hyperparameters and artifact location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub training: TrainingConfig,
    pub artifacts: ArtifactStoreConfig,
}

impl AppConfig {
    /// Read a JSON config file; omitted fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.as_ref().display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Defaults or `path`, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(std::env::var(MODEL_DIR_ENV).ok()))
    }

    /// Apply the value of [`MODEL_DIR_ENV`], if set and non-empty
    pub fn with_env_overrides(mut self, model_dir: Option<String>) -> Self {
        if let Some(dir) = model_dir.filter(|d| !d.trim().is_empty()) {
            self.artifacts.directory = PathBuf::from(dir);
        }
        self
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts.directory = dir.into();
        self
    }
}

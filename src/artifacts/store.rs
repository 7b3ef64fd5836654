//! All-or-nothing persistence of the artifact bundle

use super::backend::{ArtifactBackend, FsBackend, MemoryBackend};
use super::{BundleInfo, ModelArtifactBundle};
use crate::error::{Result, ThresholdError};
use crate::preprocessing::{EncoderRegistry, TrainedColumnOrder};
use crate::training::RandomForest;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Location and file names of the persisted bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactStoreConfig {
    pub directory: PathBuf,
    pub model_file: String,
    pub columns_file: String,
    pub encoders_file: String,
}

impl Default for ArtifactStoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("models"),
            model_file: "threshold_forest.bin".to_string(),
            columns_file: "model_columns.json".to_string(),
            encoders_file: "label_encoders.json".to_string(),
        }
    }
}

impl ArtifactStoreConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    fn file_names(&self) -> [&str; 3] {
        [&self.model_file, &self.columns_file, &self.encoders_file]
    }
}

/// Binary model file: bincode payload plus integrity checksum
#[derive(Debug, Serialize, Deserialize)]
struct ModelEnvelope {
    magic: [u8; 4],
    format_version: u32,
    info: BundleInfo,
    model_data: Vec<u8>,
    checksum: u64,
}

impl ModelEnvelope {
    const MAGIC: [u8; 4] = *b"TTHR";
    const VERSION: u32 = 1;

    fn seal(info: BundleInfo, model: &RandomForest) -> Result<Self> {
        let model_data = bincode::serialize(model)?;
        Ok(Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            info,
            checksum: xxh3_64(&model_data),
            model_data,
        })
    }

    fn open(self) -> Result<(BundleInfo, RandomForest)> {
        if self.magic != Self::MAGIC || self.format_version != Self::VERSION {
            return Err(ThresholdError::Serialization(format!(
                "unsupported model file (magic {:?}, version {})",
                self.magic, self.format_version
            )));
        }
        if xxh3_64(&self.model_data) != self.checksum {
            return Err(ThresholdError::Serialization(
                "model checksum mismatch".to_string(),
            ));
        }
        let model = bincode::deserialize(&self.model_data)?;
        Ok((self.info, model))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnsFile {
    #[serde(flatten)]
    info: BundleInfo,
    columns: TrainedColumnOrder,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncodersFile {
    #[serde(flatten)]
    info: BundleInfo,
    encoders: EncoderRegistry,
}

/// Persists the model, the trained column order and the encoder registry as
/// three files sharing one bundle id. A load that sees files from different
/// saves, a missing file or a corrupt file reports "not trained".
pub struct ModelArtifactStore {
    backend: Arc<dyn ArtifactBackend>,
    config: ArtifactStoreConfig,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for ModelArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifactStore")
            .field("location", &self.backend.location())
            .field("config", &self.config)
            .finish()
    }
}

impl ModelArtifactStore {
    /// Store backed by `config.directory`
    pub fn open(config: ArtifactStoreConfig) -> Self {
        let backend = Arc::new(FsBackend::new(config.directory.clone()));
        Self::with_backend(backend, config)
    }

    /// Store that lives only in this process
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()), ArtifactStoreConfig::default())
    }

    pub fn with_backend(backend: Arc<dyn ArtifactBackend>, config: ArtifactStoreConfig) -> Self {
        Self {
            backend,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ArtifactStoreConfig {
        &self.config
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Replace the stored bundle. Everything is serialized before the first
    /// write, so a serialization failure leaves the previous bundle intact.
    pub fn save(&self, bundle: &ModelArtifactBundle) -> Result<()> {
        bundle.validate()?;

        let model_bytes = bincode::serialize(&ModelEnvelope::seal(bundle.info.clone(), &bundle.model)?)?;
        let columns_bytes = serde_json::to_vec_pretty(&ColumnsFile {
            info: bundle.info.clone(),
            columns: bundle.columns.clone(),
        })?;
        let encoders_bytes = serde_json::to_vec_pretty(&EncodersFile {
            info: bundle.info.clone(),
            encoders: bundle.registry.clone(),
        })?;

        let _guard = self.write_lock.lock();
        self.backend.write(&self.config.model_file, &model_bytes)?;
        self.backend.write(&self.config.columns_file, &columns_bytes)?;
        self.backend.write(&self.config.encoders_file, &encoders_bytes)?;

        info!(
            bundle_id = %bundle.info.bundle_id,
            location = %self.backend.location(),
            features = bundle.columns.len(),
            "Saved model artifact bundle"
        );
        Ok(())
    }

    /// The stored bundle, or `None` when no complete consistent bundle exists
    pub fn load(&self) -> Option<ModelArtifactBundle> {
        match self.try_load() {
            Ok(bundle) => Some(bundle),
            Err(ThresholdError::ModelNotTrained) => {
                debug!(location = %self.backend.location(), "No model artifact bundle");
                None
            }
            Err(e) => {
                warn!(location = %self.backend.location(), error = %e, "Ignoring unusable model artifact bundle");
                None
            }
        }
    }

    /// Like [`load`](Self::load) but maps absence to [`ThresholdError::ModelNotTrained`]
    pub fn require(&self) -> Result<ModelArtifactBundle> {
        self.load().ok_or(ThresholdError::ModelNotTrained)
    }

    pub fn is_trained(&self) -> bool {
        self.load().is_some()
    }

    /// Remove every bundle file
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        for name in self.config.file_names() {
            self.backend.remove(name)?;
        }
        info!(location = %self.backend.location(), "Cleared model artifact bundle");
        Ok(())
    }

    fn read_required(&self, name: &str) -> Result<Vec<u8>> {
        self.backend.read(name)?.ok_or(ThresholdError::ModelNotTrained)
    }

    fn try_load(&self) -> Result<ModelArtifactBundle> {
        let model_bytes = self.read_required(&self.config.model_file)?;
        let columns_bytes = self.read_required(&self.config.columns_file)?;
        let encoders_bytes = self.read_required(&self.config.encoders_file)?;

        let envelope: ModelEnvelope = bincode::deserialize(&model_bytes)?;
        let (info, model) = envelope.open()?;
        let columns: ColumnsFile = serde_json::from_slice(&columns_bytes)?;
        let encoders: EncodersFile = serde_json::from_slice(&encoders_bytes)?;

        if columns.info != info || encoders.info != info {
            return Err(ThresholdError::Serialization(format!(
                "bundle files disagree (model {}, columns {}, encoders {})",
                info.bundle_id, columns.info.bundle_id, encoders.info.bundle_id
            )));
        }

        let bundle = ModelArtifactBundle {
            model,
            columns: columns.columns,
            registry: encoders.encoders,
            info,
        };
        bundle.validate()?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn bundle() -> ModelArtifactBundle {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
        let y = array![10.0, 12.0, 14.0, 16.0];
        let mut model = RandomForest::new(3);
        model.fit(&x, &y).unwrap();

        let mut registry = EncoderRegistry::new();
        registry.fit("work_category", &["OG1".to_string(), "OG3".to_string()]);
        let columns = TrainedColumnOrder::new(vec!["base_amount".to_string(), "work_category".to_string()]);
        ModelArtifactBundle::new(model, columns, registry)
    }

    fn memory_store() -> (Arc<MemoryBackend>, ModelArtifactStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = ModelArtifactStore::with_backend(backend.clone(), ArtifactStoreConfig::default());
        (backend, store)
    }

    #[test]
    fn test_save_load_identity() {
        let (backend, store) = memory_store();
        let original = bundle();
        store.save(&original).unwrap();

        assert_eq!(
            backend.file_names(),
            vec![
                "label_encoders.json".to_string(),
                "model_columns.json".to_string(),
                "threshold_forest.bin".to_string(),
            ]
        );

        let loaded = store.load().unwrap();
        assert_eq!(loaded.columns, original.columns);
        assert_eq!(loaded.registry, original.registry);
        assert_eq!(loaded.info, original.info);
        assert_eq!(loaded.model.n_trees(), 3);
    }

    #[test]
    fn test_empty_store_is_not_trained() {
        let store = ModelArtifactStore::in_memory();
        assert!(!store.is_trained());
        assert!(matches!(store.require().unwrap_err(), ThresholdError::ModelNotTrained));
    }

    #[test]
    fn test_missing_file_is_not_trained() {
        let (backend, store) = memory_store();
        store.save(&bundle()).unwrap();
        backend.remove("label_encoders.json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_mixed_bundle_rejected() {
        let (backend, store) = memory_store();
        store.save(&bundle()).unwrap();
        let stale_columns = backend.read("model_columns.json").unwrap().unwrap();

        store.save(&bundle()).unwrap();
        backend.write("model_columns.json", &stale_columns).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_model_rejected() {
        let (backend, store) = memory_store();
        store.save(&bundle()).unwrap();

        let mut bytes = backend.read("threshold_forest.bin").unwrap().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        backend.write("threshold_forest.bin", &bytes).unwrap();

        assert!(!store.is_trained());
    }

    #[test]
    fn test_clear() {
        let (_, store) = memory_store();
        store.save(&bundle()).unwrap();
        assert!(store.is_trained());
        store.clear().unwrap();
        assert!(!store.is_trained());
    }

    #[test]
    fn test_fs_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ModelArtifactStore::open(ArtifactStoreConfig::new(dir.path()));
        let original = bundle();
        store.save(&original).unwrap();

        assert!(dir.path().join("threshold_forest.bin").exists());
        let reopened = ModelArtifactStore::open(ArtifactStoreConfig::new(dir.path()));
        assert_eq!(reopened.require().unwrap().info.bundle_id, original.info.bundle_id);
    }
}

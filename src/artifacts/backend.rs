//! Storage backends for artifact files

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Named-blob storage used by [`ModelArtifactStore`](super::ModelArtifactStore)
pub trait ArtifactBackend: Send + Sync {
    /// Read a file; `Ok(None)` when it does not exist
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Replace a file with `bytes`; readers see either the old or the new content
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Remove a file; removing a missing file is not an error
    fn remove(&self, name: &str) -> Result<()>;

    /// Human readable location, for logs
    fn location(&self) -> String;
}

/// Directory on the local file system
#[derive(Debug, Clone)]
pub struct FsBackend {
    base_dir: PathBuf,
}

impl FsBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }
}

impl ArtifactBackend for FsBackend {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;

        // Write to a sibling temp file, then rename over the target
        let target = self.path(name);
        let temp = self.path(&format!("{}.tmp", name));
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &target)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> String {
        self.base_dir.display().to_string()
    }
}

/// In-process backend for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryBackend {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the stored files, sorted
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ArtifactBackend for MemoryBackend {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.read().get(name).cloned())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.files.write().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.files.write().remove(name);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

//! Durable key-value state.
//!
//! A small JSON file-per-key store rooted at a state directory. Two
//! fixed keys are in use: the serialized threshold mapping and the
//! saved operator identity. Reads are lenient (missing or unparseable
//! entries are reported as absent), writes go through a temp file and
//! a rename so a crash never leaves a half-written entry behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key holding the serialized threshold mapping.
pub const THRESHOLDS_KEY: &str = "sensor-thresholds";

/// Key holding the serialized operator identity.
pub const IDENTITY_KEY: &str = "auth-user";

/// JSON file-per-key store under a state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read and deserialize an entry.
    ///
    /// Returns `None` when the entry is missing or fails to parse; a
    /// parse failure is logged since it means the entry was corrupted.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unparseable persisted state");
                None
            }
        }
    }

    /// Serialize and write an entry atomically.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));

        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Remove an entry. Missing entries are not an error.
    pub fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

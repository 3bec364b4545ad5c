use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{DurableStore, StoreError};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Extension of the sibling file written before it replaces the session file
const TEMP_EXTENSION: &str = "json.tmp";

/// Stores all keys as one JSON object on disk.
///
/// The file is created on the first write and removed once the last key
/// is deleted, so a logged-out user leaves nothing behind. Writes go to a
/// temporary sibling that is renamed over the session file.
///
/// Reads through `get` fail with `StoreError::Format` when the file cannot
/// be parsed. `set` and `delete` treat such a file as empty and overwrite
/// it, so an interrupted write never locks the store.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Store `session.json` inside the given directory.
    pub fn in_dir(dir: PathBuf) -> Self {
        Self::new(dir.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
                debug!(path = ?self.path, "Removed empty session file");
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension(TEMP_EXTENSION);
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Read entries for a write. An unparseable file is discarded; the
    /// returned flag tells the caller the file must be rewritten.
    fn read_for_update(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match self.read_all() {
            Ok(entries) => Ok((entries, false)),
            Err(StoreError::Format(e)) => {
                warn!(path = ?self.path, error = %e, "Session file is malformed, overwriting it");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let (mut entries, _) = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let (mut entries, malformed) = self.read_for_update()?;
        if entries.remove(key).is_some() || malformed {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

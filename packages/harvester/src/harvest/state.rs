//! Durable harvest state.
//!
//! The only state a harvest keeps between runs is the last harvested
//! datestamp per source, stored under [`crate::config::state_key`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{HarvesterError, Result};
use crate::harvest::temp::allocate_temp_path;

/// Key/value store for harvest state.
pub trait StateStore {
    fn get_state(&self, key: &str) -> Result<Option<String>>;
    fn save_state(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local state, for tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with one value.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.into(), value.into());
        }
        store
    }
}

fn poisoned() -> HarvesterError {
    HarvesterError::Io(std::io::Error::other("state store lock poisoned"))
}

impl StateStore for MemoryStateStore {
    fn get_state(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn save_state(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// State kept in a JSON object file.
///
/// Writes go to a temporary file in the same directory which then replaces
/// the state file, so readers never see a partial file.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl StateStore for FileStateStore {
    fn get_state(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.read_all()?.remove(key))
    }

    fn save_state(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = allocate_temp_path(Some(&dir), ".harvest-state-", ".json")?;
        let written = fs::write(&temp, serde_json::to_vec_pretty(&values)?)
            .and_then(|()| fs::rename(&temp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        tracing::debug!(path = %self.path.display(), key, value, "Saved harvest state");
        Ok(())
    }
}

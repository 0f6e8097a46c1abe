//! JSON file backend for persisted console state.
//!
//! The whole state lives in one JSON object. Writes go to a sibling temp file which
//! is then renamed over the original, so a batch either lands completely or not at
//! all. A file that is not a JSON object is logged and treated as empty; an entry
//! whose value is not a string is logged and treated as absent.

use super::{Storage, StorageBatch, StorageError};
use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> HashMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                warn!(path = %self.path.display(), "Failed to read state file: {err}");
                return HashMap::new();
            }
        };

        if raw.trim().is_empty() {
            return HashMap::new();
        }

        let object = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                warn!(path = %self.path.display(), "State file is not a JSON object; ignoring it");
                return HashMap::new();
            }
            Err(err) => {
                warn!(path = %self.path.display(), "Ignoring corrupt state file: {err}");
                return HashMap::new();
            }
        };

        object
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(value) => Some((key, value)),
                _ => {
                    warn!(path = %self.path.display(), key = %key, "Ignoring non-string state entry");
                    None
                }
            })
            .collect()
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec_pretty(values)?;
        let tmp_path = self.path.with_extension("tmp");

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = open_private(&tmp_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), keys = values.len(), "State file written");

        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn apply(&self, batch: StorageBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load();
        batch.apply_to(&mut values);
        self.persist(&values)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

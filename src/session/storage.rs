//! Namespaced JSON persistence — the local-storage analog.
//!
//! One record per namespace, written atomically (temp file + rename) so a
//! crash mid-write never corrupts the previous record.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::StorageError;

enum Backend {
    Dir(PathBuf),
    Memory(Mutex<HashMap<String, String>>),
}

/// Namespaced record store. Each namespace holds one JSON document.
pub struct Storage {
    backend: Backend,
}

impl Storage {
    /// Open (or create) a directory-backed store.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Storage opened");
        Ok(Self {
            backend: Backend::Dir(dir),
        })
    }

    /// In-memory store (for tests).
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(HashMap::new())),
        }
    }

    /// Persist a record under the namespace, replacing any previous value.
    pub fn save<T: Serialize>(&self, namespace: &str, value: &T) -> Result<(), StorageError> {
        validate_namespace(namespace)?;
        let json =
            serde_json::to_string_pretty(value).map_err(|source| StorageError::Serialize {
                namespace: namespace.to_string(),
                source,
            })?;

        match &self.backend {
            Backend::Dir(dir) => {
                let path = dir.join(format!("{namespace}.json"));
                let tmp = dir.join(format!("{namespace}.json.tmp"));
                std::fs::write(&tmp, &json)?;
                std::fs::rename(&tmp, &path)?;
                debug!(namespace = namespace, bytes = json.len(), "Record saved");
            }
            Backend::Memory(map) => {
                map.lock()
                    .expect("Storage mutex poisoned")
                    .insert(namespace.to_string(), json);
            }
        }
        Ok(())
    }

    /// Load the record for a namespace. `None` when nothing was ever saved.
    pub fn load<T: DeserializeOwned>(&self, namespace: &str) -> Result<Option<T>, StorageError> {
        validate_namespace(namespace)?;
        let raw = match &self.backend {
            Backend::Dir(dir) => {
                let path = dir.join(format!("{namespace}.json"));
                match std::fs::read_to_string(&path) {
                    Ok(raw) => raw,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e.into()),
                }
            }
            Backend::Memory(map) => {
                match map
                    .lock()
                    .expect("Storage mutex poisoned")
                    .get(namespace)
                    .cloned()
                {
                    Some(raw) => raw,
                    None => return Ok(None),
                }
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                namespace: namespace.to_string(),
                source,
            })
    }

    /// Delete the record for a namespace. No-op when absent.
    pub fn remove(&self, namespace: &str) -> Result<(), StorageError> {
        validate_namespace(namespace)?;
        match &self.backend {
            Backend::Dir(dir) => {
                let path = dir.join(format!("{namespace}.json"));
                match std::fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
            Backend::Memory(map) => {
                map.lock()
                    .expect("Storage mutex poisoned")
                    .remove(namespace);
                Ok(())
            }
        }
    }
}

/// Namespaces become file names, so only a safe character set is allowed.
fn validate_namespace(namespace: &str) -> Result<(), StorageError> {
    let valid = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidNamespace(namespace.to_string()))
    }
}

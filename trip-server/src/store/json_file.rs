//! JSON file repository.
//!
//! The whole repository is one pretty-printed JSON object mapping trip id to
//! value. Every write rewrites the file through a temporary sibling and a
//! rename, so a crash mid-write leaves the previous contents intact.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::TripId;

use super::{Repository, StoreError};

/// Repository persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileRepository<V> {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
    _value: PhantomData<fn() -> V>,
}

impl<V> JsonFileRepository<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Create a repository backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _value: PhantomData,
        }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole map. A missing file is an empty repository.
    fn load(&self) -> Result<BTreeMap<TripId, V>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the whole map, creating parent directories if needed.
    fn save(&self, map: &BTreeMap<TripId, V>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(map).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl<V> Repository<V> for JsonFileRepository<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, id: &TripId) -> Result<Option<V>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load()?;
        Ok(map.remove(id))
    }

    fn put(&self, id: &TripId, value: V) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load()?;
        map.insert(id.clone(), value);
        self.save(&map)
    }

    fn remove(&self, id: &TripId) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load()?;
        let existed = map.remove(id).is_some();
        if existed {
            self.save(&map)?;
        }
        Ok(existed)
    }

    fn ids(&self) -> Result<Vec<TripId>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.into_keys().collect())
    }
}

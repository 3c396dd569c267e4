//! In-memory repository.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::TripId;

use super::{Repository, StoreError};

/// Thread-safe in-memory repository.
///
/// Used in tests and wherever persistence across restarts is not needed.
#[derive(Debug)]
pub struct MemoryRepository<V> {
    inner: RwLock<BTreeMap<TripId, V>>,
}

impl<V> MemoryRepository<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for MemoryRepository<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> Repository<V> for MemoryRepository<V> {
    fn get(&self, id: &TripId) -> Result<Option<V>, StoreError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }

    fn put(&self, id: &TripId, value: V) -> Result<(), StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(id.clone(), value);
        Ok(())
    }

    fn remove(&self, id: &TripId) -> Result<bool, StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.remove(id).is_some())
    }

    fn ids(&self) -> Result<Vec<TripId>, StoreError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TripId {
        TripId::parse(s).unwrap()
    }

    #[test]
    fn put_get_remove() {
        let repo = MemoryRepository::new();
        assert_eq!(repo.get(&id("a")).unwrap(), None::<u32>);

        repo.put(&id("a"), 1).unwrap();
        repo.put(&id("b"), 2).unwrap();
        repo.put(&id("a"), 3).unwrap();

        assert_eq!(repo.get(&id("a")).unwrap(), Some(3));
        assert_eq!(repo.ids().unwrap(), vec![id("a"), id("b")]);
        assert_eq!(repo.len(), 2);

        assert!(repo.remove(&id("a")).unwrap());
        assert!(!repo.remove(&id("a")).unwrap());
        assert_eq!(repo.get(&id("a")).unwrap(), None);
    }

    #[test]
    fn usable_through_arc_dyn() {
        let repo: std::sync::Arc<dyn Repository<String>> =
            std::sync::Arc::new(MemoryRepository::new());
        repo.put(&id("x"), "hello".to_string()).unwrap();
        assert_eq!(repo.get(&id("x")).unwrap().as_deref(), Some("hello"));
    }
}

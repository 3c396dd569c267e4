//! Per-trip repositories.
//!
//! Every piece of state the engine keeps between requests is a value keyed
//! by trip id: the trip records themselves and the handles of scheduled
//! notifications. Both go through the [`Repository`] interface, which is
//! injected into the components that need it rather than living in a
//! process-wide global.

mod error;
mod json_file;
mod memory;

use std::sync::Arc;

use crate::domain::TripId;

pub use error::StoreError;
pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;

/// A key-value store of `V` keyed by trip id.
pub trait Repository<V>: Send + Sync {
    /// Look up the value for a trip.
    fn get(&self, id: &TripId) -> Result<Option<V>, StoreError>;

    /// Store a value, replacing any previous one.
    fn put(&self, id: &TripId, value: V) -> Result<(), StoreError>;

    /// Remove the value for a trip. Returns whether one existed.
    fn remove(&self, id: &TripId) -> Result<bool, StoreError>;

    /// All trip ids with a stored value, in ascending order.
    fn ids(&self) -> Result<Vec<TripId>, StoreError>;
}

impl<V, R> Repository<V> for Arc<R>
where
    R: Repository<V> + ?Sized,
{
    fn get(&self, id: &TripId) -> Result<Option<V>, StoreError> {
        (**self).get(id)
    }

    fn put(&self, id: &TripId, value: V) -> Result<(), StoreError> {
        (**self).put(id, value)
    }

    fn remove(&self, id: &TripId) -> Result<bool, StoreError> {
        (**self).remove(id)
    }

    fn ids(&self) -> Result<Vec<TripId>, StoreError> {
        (**self).ids()
    }
}

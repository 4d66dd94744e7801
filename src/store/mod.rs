//! Storage contract for the index.
//!
//! The index does not own its storage. It consumes anything satisfying
//! [`Store`]: a map from IDs to vectors plus, per hash table, a map from
//! hash code to the set of IDs in that bucket. The reference
//! implementation is the in-memory [`MemoryStore`]; a persistent
//! key-value engine slots in behind the same trait.
//!
//! The index requires point-read atomicity on [`Store::get_vector`] and
//! tolerates eventually-consistent iteration: a bucket iterator is lazy,
//! one-shot, and not required to stay consistent under concurrent
//! mutation.

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

/// Errors surfaced by a [`Store`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No vector stored under the requested ID.
    #[error("vector not found: {0}")]
    NotFound(String),

    /// I/O failure in a persistent backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend does not implement this operation.
    #[error("operation not supported by this store")]
    Unsupported,
}

/// Key-value storage consumed by the index.
///
/// Any method may block on I/O; store calls are the only expected
/// blocking sites in the train and search pipelines.
pub trait Store {
    /// Insert or replace the vector stored under `id`.
    fn set_vector(&mut self, id: &str, vec: Vec<f64>) -> Result<(), StoreError>;

    /// Point-read the vector stored under `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the ID has no vector.
    fn get_vector(&self, id: &str) -> Result<Vec<f64>, StoreError>;

    /// Add `id` to the bucket at `(table, hash)`. Idempotent.
    fn set_hash(&mut self, table: usize, hash: u64, id: &str) -> Result<(), StoreError>;

    /// Lazy, one-shot iterator over the IDs in the bucket at
    /// `(table, hash)`. An absent bucket yields an empty iterator.
    fn hash_iter(
        &self,
        table: usize,
        hash: u64,
    ) -> Result<Box<dyn Iterator<Item = String> + '_>, StoreError>;

    /// Drop all vectors and all buckets.
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Durability hint issued between training batches. No-op by default.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Remove `id` from the bucket at `(table, hash)`. Administrative
    /// surgery; backends may leave this unimplemented.
    fn pop_hash(&mut self, _table: usize, _hash: u64, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }

    /// Re-insert `id` into the bucket at `(table, hash)`. Administrative
    /// surgery; backends may leave this unimplemented.
    fn put_hash(&mut self, _table: usize, _hash: u64, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }
}

// A mutable borrow of a store is itself a store, so an index can share
// a backend it does not own (e.g. load a dumped hasher over the store a
// previous index populated).
impl<S: Store + ?Sized> Store for &mut S {
    fn set_vector(&mut self, id: &str, vec: Vec<f64>) -> Result<(), StoreError> {
        (**self).set_vector(id, vec)
    }

    fn get_vector(&self, id: &str) -> Result<Vec<f64>, StoreError> {
        (**self).get_vector(id)
    }

    fn set_hash(&mut self, table: usize, hash: u64, id: &str) -> Result<(), StoreError> {
        (**self).set_hash(table, hash, id)
    }

    fn hash_iter(
        &self,
        table: usize,
        hash: u64,
    ) -> Result<Box<dyn Iterator<Item = String> + '_>, StoreError> {
        (**self).hash_iter(table, hash)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        (**self).clear()
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        (**self).flush()
    }

    fn pop_hash(&mut self, table: usize, hash: u64, id: &str) -> Result<(), StoreError> {
        (**self).pop_hash(table, hash, id)
    }

    fn put_hash(&mut self, table: usize, hash: u64, id: &str) -> Result<(), StoreError> {
        (**self).put_hash(table, hash, id)
    }
}

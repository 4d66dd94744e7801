//! In-memory reference store.

use std::collections::{HashMap, HashSet};

use super::{Store, StoreError};

/// A bucket keeps both a membership set (O(1) idempotency checks) and
/// the insertion order, so iteration is deterministic within a run.
#[derive(Debug, Default)]
struct Bucket {
    order: Vec<String>,
    members: HashSet<String>,
}

impl Bucket {
    fn insert(&mut self, id: &str) {
        if self.members.insert(id.to_owned()) {
            self.order.push(id.to_owned());
        }
    }

    fn remove(&mut self, id: &str) {
        if self.members.remove(id) {
            self.order.retain(|existing| existing != id);
        }
    }
}

/// Hash-of-hash-of-set store backed by process memory.
///
/// The reference [`Store`] implementation: vectors keyed by ID, buckets
/// keyed by `(table, hash)`. Suitable for tests and for corpora that fit
/// in RAM.
#[derive(Debug, Default)]
pub struct MemoryStore {
    vectors: HashMap<String, Vec<f64>>,
    buckets: HashMap<(usize, u64), Bucket>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True when no vectors are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl Store for MemoryStore {
    fn set_vector(&mut self, id: &str, vec: Vec<f64>) -> Result<(), StoreError> {
        self.vectors.insert(id.to_owned(), vec);
        Ok(())
    }

    fn get_vector(&self, id: &str) -> Result<Vec<f64>, StoreError> {
        self.vectors
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }

    fn set_hash(&mut self, table: usize, hash: u64, id: &str) -> Result<(), StoreError> {
        self.buckets.entry((table, hash)).or_default().insert(id);
        Ok(())
    }

    fn hash_iter(
        &self,
        table: usize,
        hash: u64,
    ) -> Result<Box<dyn Iterator<Item = String> + '_>, StoreError> {
        match self.buckets.get(&(table, hash)) {
            Some(bucket) => Ok(Box::new(bucket.order.iter().cloned())),
            None => Ok(Box::new(std::iter::empty())),
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.vectors.clear();
        self.buckets.clear();
        Ok(())
    }

    fn pop_hash(&mut self, table: usize, hash: u64, id: &str) -> Result<(), StoreError> {
        if let Some(bucket) = self.buckets.get_mut(&(table, hash)) {
            bucket.remove(id);
        }
        Ok(())
    }

    fn put_hash(&mut self, table: usize, hash: u64, id: &str) -> Result<(), StoreError> {
        self.set_hash(table, hash, id)
    }
}

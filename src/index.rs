//! Train and search orchestration.
//!
//! [`Index`] wires the hashing engine to a [`Store`] and a [`Metric`].
//! Training bulk-inserts a corpus: sample (μ, σ), generate hyperplanes,
//! clear the store, then write every vector and its N bucket
//! memberships in batches. Search gathers candidates from the N buckets
//! matching the query's hash codes, reranks them with exact distances,
//! and returns the top K within the threshold.
//!
//! # Concurrency
//!
//! [`Index::train`] takes `&mut self` and the search methods take
//! `&self`, so the borrow checker enforces the single-writer contract:
//! queries either see the fully-old or the fully-new index, never a
//! half-trained one. Callers sharing an index across threads wrap it in
//! a `RwLock` (or swap an `Arc`); the index itself needs no locking
//! because the hasher is immutable between trainings.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::hasher::{Hasher, MAX_PLANES};
use crate::metric::Metric;
use crate::serialize;
use crate::store::{Store, StoreError};
use crate::vector;

/// Index tuning knobs.
///
/// `max_candidates` may be zero, in which case every search returns an
/// empty result set without touching the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Required input dimensionality D.
    pub dims: usize,
    /// Number of independent hash tables N.
    pub n_permutes: usize,
    /// Bits per hash code P, at most 64.
    pub n_planes: usize,
    /// Multiplies `‖σ‖₂` to scale plane offsets.
    pub bias_multiplier: f64,
    /// Records sampled for (μ, σ) estimation.
    pub sample_size: usize,
    /// Training insert batch size; the store is flushed between batches.
    pub batch_size: usize,
    /// Per-query budget of distinct candidate IDs.
    pub max_candidates: usize,
    /// Seed for hyperplane generation and sampling. `None` draws from
    /// OS entropy; set it for reproducible indices in tests.
    pub seed: Option<u64>,
}

impl Config {
    /// Defaults tuned for corpora in the 10^4..10^6 range.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            n_permutes: 8,
            n_planes: 16,
            bias_multiplier: 1.0,
            sample_size: 1000,
            batch_size: 500,
            max_candidates: 5000,
            seed: None,
        }
    }

    /// Check every field range.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.dims == 0 {
            return Err(IndexError::InvalidConfig(
                "dims must be a positive integer".into(),
            ));
        }
        if self.n_permutes == 0 {
            return Err(IndexError::InvalidConfig(
                "n_permutes must be a positive integer".into(),
            ));
        }
        if self.n_planes == 0 || self.n_planes > MAX_PLANES {
            return Err(IndexError::InvalidConfig(format!(
                "n_planes must be in 1..={MAX_PLANES}, got {}",
                self.n_planes
            )));
        }
        if !self.bias_multiplier.is_finite() || self.bias_multiplier < 0.0 {
            return Err(IndexError::InvalidConfig(format!(
                "bias_multiplier must be finite and non-negative, got {}",
                self.bias_multiplier
            )));
        }
        if self.sample_size == 0 {
            return Err(IndexError::InvalidConfig(
                "sample_size must be a positive integer".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(IndexError::InvalidConfig(
                "batch_size must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// An (ID, vector) pair supplied at training time.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Opaque ID, unique within an index.
    pub id: String,
    /// The vector, `config.dims` long.
    pub vec: Vec<f64>,
}

impl Record {
    pub fn new(id: impl Into<String>, vec: Vec<f64>) -> Self {
        Self { id: id.into(), vec }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub dist: f64,
}

/// Heap key: distance first, then arrival order so equal distances pop
/// in first-insertion order. Distances are never NaN here; NaN fails
/// the threshold comparison before insertion.
#[derive(Debug)]
struct HeapEntry {
    dist: f64,
    seq: u64,
    id: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Approximate nearest-neighbor index over random-hyperplane LSH.
///
/// Created empty, trained exactly once (or re-trained, which replaces
/// the previous corpus wholesale), then queried from any number of
/// threads. See the module docs for the concurrency contract.
#[derive(Debug)]
pub struct Index<S: Store> {
    config: Config,
    metric: Metric,
    store: S,
    hasher: Option<Hasher>,
}

impl<S: Store> Index<S> {
    /// Validate the configuration and wrap the store.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidConfig`] on any out-of-range field.
    pub fn new(config: Config, store: S, metric: Metric) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metric,
            store,
            hasher: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store, for administrative
    /// surgery such as [`Store::pop_hash`] / [`Store::put_hash`].
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Whether the index has been trained (and can serve queries).
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.hasher.is_some()
    }

    /// The trained hasher, if any.
    #[must_use]
    pub fn hasher(&self) -> Option<&Hasher> {
        self.hasher.as_ref()
    }

    /// Bulk-train on a corpus, replacing any previous state.
    ///
    /// Computes sampled (μ, σ), generates fresh hyperplanes, clears the
    /// store, then writes each record's vector and its N bucket
    /// memberships, flushing the store after every `batch_size` records.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidConfig`] on an empty corpus,
    /// [`IndexError::DimensionMismatch`] on a ragged one, and
    /// [`IndexError::Train`] wrapping the first store failure. After a
    /// store failure the index state is undefined; discard it.
    pub fn train(&mut self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Err(IndexError::InvalidConfig(
                "cannot train on an empty record set".into(),
            ));
        }
        for record in records {
            if record.vec.len() != self.config.dims {
                return Err(IndexError::DimensionMismatch {
                    expected: self.config.dims,
                    actual: record.vec.len(),
                });
            }
        }

        let mut rng: Box<dyn RngCore> = match self.config.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(rand::rng()),
        };
        let rows: Vec<&[f64]> = records.iter().map(|r| r.vec.as_slice()).collect();
        let (mean, std) = vector::sampled_mean_std(&rows, self.config.sample_size, rng.as_mut())?;
        let hasher = Hasher::generate(&self.config, self.metric, mean, &std, rng.as_mut())?;

        // From here on the previous index is gone; a failure leaves the
        // store partially written and the index untrained.
        self.hasher = None;
        self.store.clear().map_err(IndexError::Train)?;
        for batch in records.chunks(self.config.batch_size) {
            for record in batch {
                self.store
                    .set_vector(&record.id, record.vec.clone())
                    .map_err(IndexError::Train)?;
                let codes = hasher.hash(&record.vec)?;
                for (table, &code) in codes.iter().enumerate() {
                    self.store
                        .set_hash(table, code, &record.id)
                        .map_err(IndexError::Train)?;
                }
            }
            self.store.flush().map_err(IndexError::Train)?;
        }
        self.hasher = Some(hasher);
        Ok(())
    }

    /// Return up to `k` stored vectors within `distance_threshold` of
    /// `query`, sorted by distance ascending (ties in first-seen order).
    ///
    /// Buckets are walked in table order; a global dedup set caps the
    /// work at `max_candidates` distinct IDs. Candidates whose vector
    /// has gone missing from the store, or that the metric reports as
    /// degenerate (zero vectors under the angular metric), are skipped
    /// silently so storage skew cannot fail the query.
    ///
    /// There is no cancellation: a query runs to completion or fails
    /// with the first store error it meets.
    ///
    /// # Errors
    ///
    /// [`IndexError::EmptyIndex`] if untrained,
    /// [`IndexError::DimensionMismatch`] on a wrong-length query, and
    /// [`IndexError::Store`] on store failures other than a missing
    /// vector.
    pub fn search(
        &self,
        query: &[f64],
        k: usize,
        distance_threshold: f64,
    ) -> Result<Vec<Neighbor>> {
        let hasher = self.hasher.as_ref().ok_or(IndexError::EmptyIndex)?;
        if query.len() != self.config.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dims,
                actual: query.len(),
            });
        }

        let codes = hasher.hash(query)?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
        let mut seq = 0u64;

        'tables: for (table, &code) in codes.iter().enumerate() {
            for id in self.store.hash_iter(table, code)? {
                if seen.len() >= self.config.max_candidates {
                    break 'tables;
                }
                if seen.contains(&id) {
                    continue;
                }
                seen.insert(id.clone());

                let vec = match self.store.get_vector(&id) {
                    Ok(vec) => vec,
                    Err(StoreError::NotFound(_)) => continue,
                    Err(err) => return Err(err.into()),
                };
                let Some(dist) = self.metric.distance(query, &vec) else {
                    continue;
                };
                if dist <= distance_threshold {
                    heap.push(Reverse(HeapEntry { dist, seq, id }));
                    seq += 1;
                }
            }
        }

        let mut neighbors = Vec::with_capacity(k.min(heap.len()));
        while neighbors.len() < k {
            let Some(Reverse(entry)) = heap.pop() else {
                break;
            };
            neighbors.push(Neighbor {
                id: entry.id,
                dist: entry.dist,
            });
        }
        Ok(neighbors)
    }

    /// Serialize the trained hasher and config as a self-describing
    /// byte stream. The store is not part of the stream; it persists
    /// itself or is rebuilt by re-training.
    ///
    /// # Errors
    ///
    /// [`IndexError::EmptyIndex`] if untrained.
    pub fn dump(&self) -> Result<Vec<u8>> {
        let hasher = self.hasher.as_ref().ok_or(IndexError::EmptyIndex)?;
        serialize::encode(&self.config, hasher)
    }

    /// Replace this index's config and hasher from a byte stream
    /// produced by [`Index::dump`].
    ///
    /// # Errors
    ///
    /// [`IndexError::Format`] on truncated or mismatched input,
    /// [`IndexError::EmptyIndex`] if the stream describes zero
    /// instances.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        let (config, hasher) = serialize::decode(bytes)?;
        self.config = config;
        self.hasher = Some(hasher);
        Ok(())
    }
}

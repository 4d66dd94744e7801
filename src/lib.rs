//! proxima: random-hyperplane LSH for approximate nearest neighbor search.
//!
//! Given a corpus of dense `f64` vectors, answer "up to K vectors within
//! distance D of the query" in sub-linear expected time by only
//! inspecting vectors that share at least one hash code with the query
//! across N independent random projections.
//!
//! # How it works
//!
//! 1. **Train**: sample the corpus mean μ and per-dimension std σ,
//!    generate N families of P random hyperplanes (offsets scaled to
//!    `‖σ‖₂`, so planes cut through the data), then bucket every record
//!    under its P-bit code in each of the N tables.
//! 2. **Search**: hash the query, union the N matching buckets
//!    (deduplicated, budgeted), rerank candidates with the exact metric,
//!    return the top K under the distance threshold.
//!
//! Storage is pluggable via the [`Store`] trait: [`MemoryStore`] for
//! tests and RAM-resident corpora, a persistent KV engine behind the
//! same trait for everything else. Distances are pluggable via
//! [`Metric`] (Euclidean or angular; the angular variant forces planes
//! through the origin, the classic cosine-LSH construction).
//!
//! # Example
//!
//! ```
//! use proxima::{Config, Index, MemoryStore, Metric, Record};
//!
//! # fn main() -> proxima::Result<()> {
//! let mut config = Config::new(2);
//! config.seed = Some(42);
//! let mut index = Index::new(config, MemoryStore::new(), Metric::Euclidean)?;
//!
//! index.train(&[
//!     Record::new("a", vec![1.0, 0.0]),
//!     Record::new("b", vec![0.0, 1.0]),
//! ])?;
//!
//! let neighbors = index.search(&[1.0, 0.0], 1, f64::INFINITY)?;
//! assert_eq!(neighbors[0].id, "a");
//! assert!(neighbors[0].dist < 1e-9);
//! # Ok(())
//! # }
//! ```
//!
//! # When LSH
//!
//! | Criterion         | LSH            | Graph indices (HNSW etc.) |
//! |-------------------|----------------|---------------------------|
//! | Insert cost       | O(1) per item  | O(log n) + graph updates  |
//! | Theory guarantees | Yes            | Empirical                 |
//! | External storage  | Natural fit    | Awkward                   |
//! | Best recall/speed | Lower          | Higher                    |
//!
//! Reach for LSH when inserts dominate, when the corpus lives in a
//! key-value store rather than RAM, or when provable collision
//! probabilities matter more than squeezing out the last percent of
//! recall.

pub mod error;
pub mod hasher;
pub mod index;
pub mod metric;
mod serialize;
pub mod store;
pub mod vector;

pub use error::{IndexError, Result};
pub use hasher::{HashCodes, Hasher, HasherInstance, Plane};
pub use index::{Config, Index, Neighbor, Record};
pub use metric::Metric;
pub use store::{MemoryStore, Store, StoreError};

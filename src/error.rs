//! Error types for proxima.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during index construction, training, search,
/// and serialization.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Invalid configuration (bad dimensionality, plane count out of range, ...).
    ///
    /// Raised at construction; not retriable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dimension mismatch between the configured index and a record or query.
    ///
    /// Fatal to that call; the index remains usable.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Training aborted on its first store failure.
    ///
    /// Partial index state is undefined; callers should discard the index.
    #[error("training failed")]
    Train(#[source] StoreError),

    /// Store failure propagated out of a query.
    #[error("store error")]
    Store(#[from] StoreError),

    /// Corrupt or incompatible byte stream.
    #[error("format error: {0}")]
    Format(String),

    /// Operation requires a trained index (or a dump described zero instances).
    #[error("index is empty")]
    EmptyIndex,
}

/// Result type alias for proxima operations.
pub type Result<T> = std::result::Result<T, IndexError>;

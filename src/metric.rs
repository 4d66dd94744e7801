//! Distance metrics for the index.
//!
//! The index is polymorphic over a tiny capability set: compute a
//! distance, and say whether the geometry is angular (which changes how
//! hyperplanes are generated, see [`crate::hasher`]). A tagged enum
//! covers both shipped metrics; it is `Copy` and shared freely after
//! construction.

use crate::vector;

/// Distance metric for dense vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Euclidean (L2) distance.
    Euclidean,
    /// Angular distance $1 - \cos(a,b)$, in `[0, 2]`.
    Angular,
}

impl Metric {
    /// Whether hyperplane generation should force planes through the
    /// origin of the mean-shifted space.
    #[inline]
    #[must_use]
    pub fn is_angular(self) -> bool {
        matches!(self, Metric::Angular)
    }

    /// Distance between two vectors.
    ///
    /// Returns `None` when the angular metric meets a zero vector on
    /// either side: the angle is undefined there, and search skips the
    /// offending candidate instead of surfacing an error.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f64], b: &[f64]) -> Option<f64> {
        match self {
            Metric::Euclidean => Some(vector::l2_distance(a, b)),
            Metric::Angular => {
                if vector::is_zero(a) || vector::is_zero(b) {
                    None
                } else {
                    Some(vector::cosine_distance(a, b))
                }
            }
        }
    }
}

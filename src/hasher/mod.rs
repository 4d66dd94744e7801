//! Random-hyperplane hashing engine.
//!
//! A [`HasherInstance`] is one family of P random hyperplanes (P ≤ 64)
//! that maps a vector to a P-bit code packed into a `u64`: bit *i* is
//! set iff the vector sits in the non-negative half-space of plane *i*.
//! A [`Hasher`] holds N independent instances plus the global mean
//! vector (subtracted before hashing) and the offset scale derived from
//! the corpus spread.
//!
//! Plane offsets are drawn from `[-‖c‖·bias, ‖c‖·bias]`, so the
//! plane-to-origin distance `|d|/‖c‖` never exceeds `bias`. With `bias`
//! tuned to `‖σ‖₂` of the corpus, planes cut through the data rather
//! than missing it. Under the angular metric `bias` is forced to 0,
//! which is the standard random-projection construction for cosine LSH:
//! every plane passes through the origin of the mean-shifted space.
//!
//! # References
//!
//! - Charikar (2002): "Similarity estimation techniques from rounding
//!   algorithms"
//! - Indyk & Motwani (1998): "Approximate nearest neighbors: towards
//!   removing the curse of dimensionality"

use rand::Rng;
use rayon::prelude::*;
use smallvec::{SmallVec, smallvec};

use crate::error::{IndexError, Result};
use crate::index::Config;
use crate::metric::Metric;
use crate::vector;

/// Hash codes may pack at most this many bits into a `u64`.
pub const MAX_PLANES: usize = 64;

/// Instance counts at or above this fan hashing out across threads.
const PARALLEL_FANOUT: usize = 8;

/// Hash codes for one vector, one `u64` per table, indexed by table.
///
/// Inline capacity covers typical table counts without heap traffic.
pub type HashCodes = SmallVec<[u64; 16]>;

/// A hyperplane `c·x = d` in the mean-shifted space.
///
/// Immutable after generation. The sign of [`Plane::signed_distance`]
/// classifies a point into one of the two half-spaces; it is stable
/// under uniform scaling of `coefs`, so planes are not normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Coefficient vector `c`. Never the zero vector.
    pub coefs: Vec<f64>,
    /// Scalar offset `d`.
    pub offset: f64,
}

impl Plane {
    /// Signed distance `c·v - d`, up to the scale of `‖c‖`.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, v: &[f64]) -> f64 {
        vector::dot(&self.coefs, v) - self.offset
    }
}

/// One family of up to 64 hyperplanes producing a bit-packed hash code.
#[derive(Debug, Clone, PartialEq)]
pub struct HasherInstance {
    planes: Vec<Plane>,
}

impl HasherInstance {
    /// Build an instance from an ordered plane list.
    ///
    /// Bit *i* of every code this instance produces corresponds to
    /// `planes[i]`, for the lifetime of the instance.
    #[must_use]
    pub fn new(planes: Vec<Plane>) -> Self {
        debug_assert!(planes.len() <= MAX_PLANES);
        Self { planes }
    }

    /// The planes, in bit order.
    #[must_use]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Hash an already mean-shifted vector.
    ///
    /// Bit *i* is set iff the sign bit of the signed distance to plane
    /// *i* is clear. Testing the sign bit rather than comparing against
    /// `0.0` keeps `-0.0` out of the non-negative half-space.
    #[must_use]
    pub fn hash(&self, shifted: &[f64]) -> u64 {
        let mut code = 0u64;
        for (i, plane) in self.planes.iter().enumerate() {
            if !plane.signed_distance(shifted).is_sign_negative() {
                code |= 1 << i;
            }
        }
        code
    }
}

/// N independent hyperplane families sharing one mean shift.
///
/// Written only by [`Hasher::generate`] (or deserialization); read-only
/// afterwards, so it may be shared across query threads without
/// locking.
#[derive(Debug, Clone, PartialEq)]
pub struct Hasher {
    dims: usize,
    bias: f64,
    mean: Vec<f64>,
    instances: Vec<HasherInstance>,
}

impl Hasher {
    /// Generate N fresh instances from the sampled corpus statistics.
    ///
    /// `bias` becomes `‖std‖₂ · config.bias_multiplier`, zeroed under an
    /// angular metric so planes pass through the origin. The caller owns
    /// the random source; there is no process-wide PRNG state.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidConfig`] when `dims`, `n_permutes`, or
    /// `n_planes` is out of range; [`IndexError::DimensionMismatch`]
    /// when the statistics do not match `config.dims`.
    pub fn generate<R: Rng + ?Sized>(
        config: &Config,
        metric: Metric,
        mean: Vec<f64>,
        std: &[f64],
        rng: &mut R,
    ) -> Result<Self> {
        if config.dims == 0 {
            return Err(IndexError::InvalidConfig(
                "dims must be a positive integer".into(),
            ));
        }
        if config.n_planes == 0 || config.n_planes > MAX_PLANES {
            return Err(IndexError::InvalidConfig(format!(
                "n_planes must be in 1..={MAX_PLANES}, got {}",
                config.n_planes
            )));
        }
        if config.n_permutes == 0 {
            return Err(IndexError::InvalidConfig(
                "n_permutes must be a positive integer".into(),
            ));
        }
        if mean.len() != config.dims {
            return Err(IndexError::DimensionMismatch {
                expected: config.dims,
                actual: mean.len(),
            });
        }
        if std.len() != config.dims {
            return Err(IndexError::DimensionMismatch {
                expected: config.dims,
                actual: std.len(),
            });
        }

        let bias = if metric.is_angular() {
            0.0
        } else {
            vector::norm(std) * config.bias_multiplier
        };

        let instances = (0..config.n_permutes)
            .map(|_| {
                let planes = (0..config.n_planes)
                    .map(|_| random_plane(config.dims, bias, rng))
                    .collect();
                HasherInstance::new(planes)
            })
            .collect();

        Ok(Self {
            dims: config.dims,
            bias,
            mean,
            instances,
        })
    }

    pub(crate) fn from_parts(
        dims: usize,
        bias: f64,
        mean: Vec<f64>,
        instances: Vec<HasherInstance>,
    ) -> Self {
        Self {
            dims,
            bias,
            mean,
            instances,
        }
    }

    /// Input dimensionality.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Offset scale the planes were drawn with.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Global mean vector subtracted before hashing.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// The hyperplane families, in table order.
    #[must_use]
    pub fn instances(&self) -> &[HasherInstance] {
        &self.instances
    }

    /// Number of hash tables.
    #[must_use]
    pub fn n_tables(&self) -> usize {
        self.instances.len()
    }

    /// Hash a vector with every instance.
    ///
    /// The mean shift is computed once and shared. Each instance writes
    /// its code into its own slot of the pre-sized result; at eight
    /// tables or more the slots are filled from the rayon pool, below
    /// that sequentially.
    ///
    /// # Errors
    ///
    /// [`IndexError::DimensionMismatch`] when the input length differs
    /// from the configured dimensionality.
    pub fn hash(&self, vec: &[f64]) -> Result<HashCodes> {
        if vec.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual: vec.len(),
            });
        }
        let shifted = vector::sub(vec, &self.mean);
        let mut codes: HashCodes = smallvec![0; self.instances.len()];
        if self.instances.len() >= PARALLEL_FANOUT {
            codes
                .as_mut_slice()
                .par_iter_mut()
                .enumerate()
                .for_each(|(k, slot)| *slot = self.instances[k].hash(&shifted));
        } else {
            for (k, slot) in codes.iter_mut().enumerate() {
                *slot = self.instances[k].hash(&shifted);
            }
        }
        Ok(codes)
    }
}

/// Sample one plane: coefficients uniform in [-1, 1], offset uniform in
/// `[-‖c‖·bias, ‖c‖·bias]`.
fn random_plane<R: Rng + ?Sized>(dims: usize, bias: f64, rng: &mut R) -> Plane {
    loop {
        let coefs: Vec<f64> = (0..dims).map(|_| rng.random_range(-1.0..=1.0)).collect();
        let norm = vector::norm(&coefs);
        if norm == 0.0 {
            // All-zero draw; resample rather than emit a degenerate plane.
            continue;
        }
        let span = norm * bias;
        let offset = if span > 0.0 {
            rng.random_range(-span..=span)
        } else {
            0.0
        };
        return Plane { coefs, offset };
    }
}

//! Dense `f64` vector kernels.
//!
//! Everything the hashing engine and the search pipeline need: dot
//! products, L2 and cosine distance, elementwise helpers, and the
//! sampled per-dimension mean/std estimator used to seed hyperplane
//! generation. All functions are pure and allocation is explicit.

use rand::Rng;
use rand::seq::index;

use crate::error::{IndexError, Result};

/// Dot product of two equal-length vectors.
#[inline]
#[must_use]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm.
#[inline]
#[must_use]
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Euclidean (L2) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Cosine distance $1 - \cos(a,b)$, in `[0, 2]`.
///
/// 0 means identical direction. Assumes both inputs have nonzero norm;
/// callers that can meet zero vectors go through [`crate::Metric`],
/// which screens them out first.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let cos = dot(a, b) / (norm(a) * norm(b));
    1.0 - cos.clamp(-1.0, 1.0)
}

/// True when every component is exactly `0.0`.
#[inline]
#[must_use]
pub fn is_zero(v: &[f64]) -> bool {
    v.iter().all(|&x| x == 0.0)
}

/// Elementwise sum.
#[must_use]
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
}

/// Elementwise difference `a - b`.
#[must_use]
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(x, y)| x - y).collect()
}

/// Scalar multiple.
#[must_use]
pub fn scale(v: &[f64], c: f64) -> Vec<f64> {
    v.iter().map(|x| x * c).collect()
}

/// Per-dimension mean and unbiased standard deviation over a uniform
/// sample of `sample_size` vectors drawn without replacement (the whole
/// input when it is smaller).
///
/// Single pass via Welford's algorithm. With a single sampled vector the
/// standard deviation is zero in every dimension.
///
/// # Errors
///
/// [`IndexError::DimensionMismatch`] if any sampled vector differs in
/// length from the first.
pub fn sampled_mean_std<R: Rng + ?Sized>(
    vectors: &[&[f64]],
    sample_size: usize,
    rng: &mut R,
) -> Result<(Vec<f64>, Vec<f64>)> {
    if vectors.is_empty() || sample_size == 0 {
        return Err(IndexError::InvalidConfig(
            "mean/std estimation needs at least one vector and a positive sample size".into(),
        ));
    }
    let amount = sample_size.min(vectors.len());
    let picked = index::sample(rng, vectors.len(), amount);

    let dims = vectors[picked.index(0)].len();
    let mut mean = vec![0.0; dims];
    let mut m2 = vec![0.0; dims];
    let mut count = 0usize;

    for idx in picked.iter() {
        let v = vectors[idx];
        if v.len() != dims {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: v.len(),
            });
        }
        count += 1;
        let n = count as f64;
        for (d, &x) in v.iter().enumerate() {
            let delta = x - mean[d];
            mean[d] += delta / n;
            m2[d] += delta * (x - mean[d]);
        }
    }

    let std = if count > 1 {
        let denom = (count - 1) as f64;
        m2.into_iter().map(|s| (s / denom).sqrt()).collect()
    } else {
        vec![0.0; dims]
    };
    Ok((mean, std))
}

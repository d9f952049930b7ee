//! Statistical helpers over sample slices.
//!
//! Population statistics (`ddof = 0`) are used throughout, so that the signal
//! quality metric and the POS alpha ratio match their textbook definitions.

use num_traits::Float;

/// Arithmetic mean of a slice. Returns zero for an empty slice.
pub fn mean<F: Float>(values: &[F]) -> F {
    if values.is_empty() {
        return F::zero();
    }

    let sum = values.iter().fold(F::zero(), |acc, &x| acc + x);
    sum / len_as::<F>(values.len())
}

/// Population variance of a slice. Returns zero for an empty slice.
pub fn variance<F: Float>(values: &[F]) -> F {
    if values.is_empty() {
        return F::zero();
    }

    let mean = mean(values);
    let sum_sq = values
        .iter()
        .map(|&x| (x - mean).powi(2))
        .fold(F::zero(), |acc, x| acc + x);
    sum_sq / len_as::<F>(values.len())
}

/// Population standard deviation of a slice.
pub fn std_dev<F: Float>(values: &[F]) -> F {
    variance(values).sqrt()
}

/// Median of a slice (upper median for even lengths). `None` for an empty slice.
pub fn median<F: Float>(values: &[F]) -> Option<F> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(sorted[sorted.len() / 2])
}

#[inline]
fn len_as<F: Float>(len: usize) -> F {
    F::from(len).unwrap_or_else(F::infinity)
}

//! Utility functions for vital-sign signal processing.
//!
//! # Modules
//!
//! - [`generation`] - Synthetic signal generation for tests, benchmarks and demos

pub mod generation;

pub use generation::*;

/// Convert a duration in seconds to a whole number of samples (rounded).
///
/// Negative or non-finite products yield zero.
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> usize {
    let samples = (seconds * sample_rate).round();
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Convert a number of samples to a duration in seconds.
pub fn samples_to_seconds(samples: usize, sample_rate: f64) -> f64 {
    samples as f64 / sample_rate
}

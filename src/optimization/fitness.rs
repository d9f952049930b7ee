//! Signal-quality fitness for filter parameter search.
//!
//! The optimizer minimises, so fitness is the *negative* signal-to-noise ratio
//! of the filtered waveform:
//!
//! ```text
//! fitness = -(mean(y)^2 / (var(y) + 1e-8))
//! ```
//!
//! Any candidate that cannot be evaluated scores [`FITNESS_PENALTY`] instead.
//! Evaluation never fails: an invalid triple, a filter error or a non-finite
//! result all collapse to the penalty, so a bad candidate is simply maximally
//! unfit.

use crate::VitalsResult;
use crate::operations::iir_filtering::bandpass_filter;
use crate::operations::statistics::{mean, variance};
use crate::operations::types::{MAX_FILTER_ORDER, MIN_FILTER_ORDER};

/// Score given to candidates that cannot be evaluated.
pub const FITNESS_PENALTY: f64 = 1e9;

/// Added to the variance so a constant waveform doesn't divide by zero.
const SNR_EPSILON: f64 = 1e-8;

/// Minimum signal length for evaluation, in seconds of samples.
pub const MIN_FITNESS_DURATION_SECONDS: f64 = 3.0;

/// Negative signal-to-noise ratio of a waveform, or the penalty if non-finite.
///
/// An empty waveform scores the penalty.
pub fn snr_fitness(filtered: &[f64]) -> f64 {
    if filtered.is_empty() {
        return FITNESS_PENALTY;
    }

    let m = mean(filtered);
    let score = -(m * m / (variance(filtered) + SNR_EPSILON));
    if score.is_finite() { score } else { FITNESS_PENALTY }
}

/// Score a `(lowcut, highcut, order)` position on a signal.
///
/// `filter` receives `(signal, lowcut, highcut, sample_rate, order)`, which is
/// the shape of [`bandpass_filter`]. The order coordinate is checked against
/// `[2, 8]` before being truncated to an integer.
///
/// # Returns
///
/// [`snr_fitness`] of the filtered signal, or [`FITNESS_PENALTY`] when
/// - the position doesn't have exactly 3 coordinates,
/// - `lowcut >= highcut` or any coordinate is non-finite,
/// - the order is below 2 or above 8,
/// - the signal is shorter than `3 * sample_rate` samples,
/// - the filter returns an error or non-finite samples.
pub fn evaluate_filter_fitness<F>(signal: &[f64], sample_rate: f64, filter: F, position: &[f64]) -> f64
where
    F: Fn(&[f64], f64, f64, f64, usize) -> VitalsResult<Vec<f64>>,
{
    let &[lowcut, highcut, order] = position else {
        return FITNESS_PENALTY;
    };

    if !(lowcut.is_finite() && highcut.is_finite() && order.is_finite()) || lowcut >= highcut {
        return FITNESS_PENALTY;
    }

    if order < MIN_FILTER_ORDER as f64 || order > MAX_FILTER_ORDER as f64 {
        return FITNESS_PENALTY;
    }

    if (signal.len() as f64) < MIN_FITNESS_DURATION_SECONDS * sample_rate {
        return FITNESS_PENALTY;
    }

    match filter(signal, lowcut, highcut, sample_rate, order.trunc() as usize) {
        Ok(filtered) if filtered.iter().all(|x| x.is_finite()) => snr_fitness(&filtered),
        _ => FITNESS_PENALTY,
    }
}

/// Fitness of band-pass parameters on a fixed signal.
///
/// Binds a signal and sample rate so that [`FitnessEvaluator::evaluate`] has the
/// `Fn(&[f64]) -> f64` shape the optimizer expects.
///
/// # Examples
///
/// ```rust
/// use vitals_dsp::optimization::{FITNESS_PENALTY, FitnessEvaluator};
/// use vitals_dsp::sine_wave;
///
/// let signal = sine_wave(1.2, 10.0, 30.0, 1.0);
/// let evaluator = FitnessEvaluator::new(&signal, 30.0);
///
/// assert!(evaluator.evaluate(&[0.8, 2.5, 4.0]) < FITNESS_PENALTY);
/// assert_eq!(evaluator.evaluate(&[2.5, 0.8, 4.0]), FITNESS_PENALTY);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FitnessEvaluator<'a> {
    signal: &'a [f64],
    sample_rate: f64,
}

impl<'a> FitnessEvaluator<'a> {
    /// Create an evaluator over `signal` sampled at `sample_rate` Hz.
    pub const fn new(signal: &'a [f64], sample_rate: f64) -> Self {
        Self {
            signal,
            sample_rate,
        }
    }

    /// The signal being scored.
    pub const fn signal(&self) -> &'a [f64] {
        self.signal
    }

    /// Score a `(lowcut, highcut, order)` position with the zero-phase Butterworth band-pass.
    pub fn evaluate(&self, position: &[f64]) -> f64 {
        evaluate_filter_fitness(self.signal, self.sample_rate, bandpass_filter, position)
    }

    /// Score a position with a custom filter function.
    pub fn evaluate_with<F>(&self, filter: F, position: &[f64]) -> f64
    where
        F: Fn(&[f64], f64, f64, f64, usize) -> VitalsResult<Vec<f64>>,
    {
        evaluate_filter_fitness(self.signal, self.sample_rate, filter, position)
    }
}

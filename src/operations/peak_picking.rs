//! Peak picking and rate estimation for physiological waveforms.
//!
//! A rate is estimated by counting the cycles of a band-passed waveform: every
//! accepted local maximum is one heartbeat or one breath. Two things make the
//! raw count unreliable, and this module handles both:
//!
//! - **Plateaus**: a flat-topped maximum spans several equal samples. It is
//!   reported once, at the middle of the plateau.
//! - **Sub-peaks**: residual noise produces small ripples near a true maximum.
//!   A minimum peak separation, derived from the shortest plausible cycle, is
//!   enforced by keeping the tallest peak and discarding its close neighbours.
//!
//! ## Rate formula
//!
//! `rate = peak_count * 60 / duration_seconds`, where
//! `duration_seconds = waveform_length / sample_rate`.
//!
//! Heart rate typically uses a 0.5 s minimum period and respiration a 2 s one,
//! see [`PeakPickingConfig`].

use serde::{Deserialize, Serialize};

use crate::operations::types::PeakPickingConfig;
use crate::{ParameterError, VitalsResult};

/// Result of a rate estimation: cycles per minute and where the cycles peaked.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RateEstimate {
    /// Estimated rate in cycles per minute (BPM for pulse, breaths/min for respiration)
    pub rate_per_minute: f64,
    /// Sample indices of the accepted peaks, in increasing order
    pub peak_indices: Vec<usize>,
}

impl RateEstimate {
    /// An estimate with no peaks and a rate of zero.
    pub const fn zero() -> Self {
        Self {
            rate_per_minute: 0.0,
            peak_indices: Vec::new(),
        }
    }

    /// Number of detected cycles.
    pub fn peak_count(&self) -> usize {
        self.peak_indices.len()
    }
}

/// Find local maxima separated by at least `min_separation` samples.
///
/// A sample (or a run of equal samples) is a local maximum when it is strictly
/// greater than both neighbours. The first and last samples are never peaks.
/// Flat plateaus are reported at their middle index, rounding down.
///
/// When two candidates are closer than `min_separation`, the taller one wins
/// and ties keep the earlier index. A separation of 0 or 1 disables the
/// constraint.
///
/// # Returns
///
/// Peak indices in increasing order.
///
/// # Examples
///
/// ```rust
/// use vitals_dsp::operations::peak_picking::find_peaks;
///
/// let signal = [0.0, 1.0, 0.0, 0.5, 0.0, 2.0, 2.0, 2.0, 0.0];
/// assert_eq!(find_peaks(&signal, 1), vec![1, 3, 6]);
/// assert_eq!(find_peaks(&signal, 3), vec![1, 6]);
/// ```
pub fn find_peaks(signal: &[f64], min_separation: usize) -> Vec<usize> {
    let candidates = local_maxima(signal);
    if min_separation <= 1 {
        return candidates.into_iter().map(|(index, _)| index).collect();
    }
    apply_temporal_constraints(&candidates, min_separation)
}

/// Estimate a rate in cycles per minute from a filtered waveform.
///
/// # Arguments
///
/// * `waveform` - Band-passed waveform, one value per sample
/// * `sample_rate` - Sampling rate in Hz
/// * `min_period_seconds` - Shortest plausible cycle; peaks closer than this
///   are merged
///
/// # Returns
///
/// The rate together with the peak indices. An empty waveform or one without
/// peaks gives a rate of zero, which is a valid result rather than an error.
///
/// # Errors
///
/// Returns a parameter error if the sample rate is not positive or the minimum
/// period is negative or non-finite.
///
/// # Examples
///
/// ```rust
/// use vitals_dsp::operations::peak_picking::estimate_rate;
/// use vitals_dsp::sine_wave;
///
/// // 1.2 Hz for 10 s at 30 Hz: 12 beats, 72 BPM.
/// let waveform = sine_wave(1.2, 10.0, 30.0, 1.0);
/// let estimate = estimate_rate(&waveform, 30.0, 0.5).unwrap();
/// assert_eq!(estimate.peak_count(), 12);
/// assert!((estimate.rate_per_minute - 72.0).abs() < 1e-9);
/// ```
pub fn estimate_rate(
    waveform: &[f64],
    sample_rate: f64,
    min_period_seconds: f64,
) -> VitalsResult<RateEstimate> {
    estimate_rate_with(waveform, sample_rate, &PeakPickingConfig::new(min_period_seconds))
}

/// [`estimate_rate`] with an explicit peak picking configuration.
pub fn estimate_rate_with(
    waveform: &[f64],
    sample_rate: f64,
    config: &PeakPickingConfig,
) -> VitalsResult<RateEstimate> {
    config.validate()?;

    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ParameterError::invalid_value("sample_rate", "must be positive").into());
    }

    if waveform.is_empty() {
        return Ok(RateEstimate::zero());
    }

    let peak_indices = find_peaks(waveform, config.min_peak_separation(sample_rate));
    let duration_seconds = waveform.len() as f64 / sample_rate;
    let rate_per_minute = peak_indices.len() as f64 * 60.0 / duration_seconds;

    Ok(RateEstimate {
        rate_per_minute,
        peak_indices,
    })
}

/// Local maxima as `(index, height)` pairs, plateaus resolved to their middle.
fn local_maxima(signal: &[f64]) -> Vec<(usize, f64)> {
    let mut maxima = Vec::new();
    if signal.len() < 3 {
        return maxima;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            // Walk to the end of a possible plateau.
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }

            if signal[ahead] < signal[i] {
                let left_edge = i;
                let right_edge = ahead - 1;
                maxima.push(((left_edge + right_edge) / 2, signal[i]));
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    maxima
}

/// Enforce a minimum separation between peaks, strongest first.
///
/// Candidates are visited from tallest to shortest; a candidate is kept only if
/// it lies at least `min_separation` samples from every peak already kept.
/// Ties in height keep the earlier index.
fn apply_temporal_constraints(candidates: &[(usize, f64)], min_separation: usize) -> Vec<usize> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut sorted_candidates = candidates.to_vec();
    sorted_candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut selected_peaks: Vec<usize> = Vec::new();
    for &(index, _height) in &sorted_candidates {
        let valid = selected_peaks
            .iter()
            .all(|&selected| index.abs_diff(selected) >= min_separation);

        if valid {
            selected_peaks.push(index);
        }
    }

    selected_peaks.sort_unstable();
    selected_peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generation::{sine_wave, white_noise};
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_find_peaks_basic() {
        let signal = [0.1, 0.3, 0.8, 0.2, 0.4, 0.9, 0.1];
        assert_eq!(find_peaks(&signal, 1), vec![2, 5]);
    }

    #[test]
    fn test_endpoints_are_not_peaks() {
        assert!(find_peaks(&[5.0, 1.0, 0.0, 1.0, 5.0], 1).is_empty());
        assert!(find_peaks(&[1.0, 2.0], 1).is_empty());
        assert!(find_peaks(&[], 1).is_empty());
    }

    #[test]
    fn test_plateau_reports_middle() {
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 0.0], 1), vec![1]);
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 1.0, 0.0], 1), vec![2]);
        // A plateau that runs into a rise is a shoulder, not a peak.
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 2.0, 0.0], 1), vec![3]);
        // A plateau that runs to the end is not a peak.
        assert!(find_peaks(&[0.0, 1.0, 1.0, 1.0], 1).is_empty());
    }

    #[test]
    fn test_temporal_constraints() {
        let candidates = vec![(10, 0.8), (15, 0.9), (25, 0.7), (30, 0.6)];
        let peaks = apply_temporal_constraints(&candidates, 10);

        // 15 beats 10; 25 is exactly 10 from 15 and stays; 30 is too close to 25.
        assert_eq!(peaks, vec![15, 25]);
    }

    #[test]
    fn test_min_separation_is_respected() {
        let noisy: Vec<f64> = sine_wave(1.0, 10.0, 30.0, 1.0)
            .iter()
            .zip(white_noise(300, 0.3, Some(7)))
            .map(|(s, n)| s + n)
            .collect();

        let peaks = find_peaks(&noisy, 15);
        assert!(!peaks.is_empty());
        for pair in peaks.windows(2) {
            assert!(pair[1] - pair[0] >= 15);
        }
    }

    #[test]
    fn test_heart_rate_from_sine() {
        let waveform = sine_wave(1.2, 10.0, 30.0, 1.0);
        let estimate = estimate_rate(&waveform, 30.0, 0.5).unwrap();

        assert_eq!(estimate.peak_count(), 12);
        assert_approx_eq!(estimate.rate_per_minute, 72.0, 1e-9);
    }

    #[test]
    fn test_respiration_rate_from_sine() {
        let waveform = sine_wave(0.25, 60.0, 30.0, 3.0);
        let config = PeakPickingConfig::respiration();
        let estimate = estimate_rate_with(&waveform, 30.0, &config).unwrap();

        assert_eq!(estimate.peak_count(), 15);
        assert_approx_eq!(estimate.rate_per_minute, 15.0, 1e-9);
    }

    #[test]
    fn test_rate_within_tolerance_for_various_frequencies() {
        for &freq in &[0.9, 1.5, 2.0] {
            let waveform = sine_wave(freq, 20.0, 30.0, 1.0);
            let estimate = estimate_rate(&waveform, 30.0, 0.4).unwrap();
            let expected = freq * 60.0;
            assert!(
                (estimate.rate_per_minute - expected).abs() <= 0.05 * expected,
                "{freq} Hz gave {}",
                estimate.rate_per_minute
            );
        }
    }

    #[test]
    fn test_degenerate_inputs_give_zero_rate() {
        let flat = vec![1.0; 90];
        assert_eq!(estimate_rate(&flat, 30.0, 0.5).unwrap(), RateEstimate::zero());
        assert_eq!(estimate_rate(&[], 30.0, 0.5).unwrap(), RateEstimate::zero());
    }

    #[test]
    fn test_invalid_parameters() {
        let waveform = sine_wave(1.2, 5.0, 30.0, 1.0);
        assert!(estimate_rate(&waveform, 0.0, 0.5).is_err());
        assert!(estimate_rate(&waveform, 30.0, -1.0).is_err());
        assert!(estimate_rate(&waveform, 30.0, f64::NAN).is_err());
    }
}

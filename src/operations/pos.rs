//! Plane-Orthogonal-to-Skin (POS) pulse extraction.
//!
//! Turns a buffer of per-frame mean RGB values of a skin region into a single
//! pulsatile waveform (Wang et al., "Algorithmic Principles of Remote PPG", 2017).
//!
//! ## Algorithm
//!
//! For every trailing window of `w = round(1.6 * fps)` frames:
//!
//! 1. Temporally normalise each channel by its own mean over the window, which
//!    removes slow illumination drift.
//! 2. Project the normalised window onto the two chrominance axes of
//!    `P = [[0, 1, -1], [-2, 1, 1]]`, giving `S1` and `S2`. Both axes are
//!    orthogonal to `[1, 1, 1]`, so pure intensity changes cancel.
//! 3. Combine `H = S1 + (σ(S1) / σ(S2)) · S2`; the ratio tunes the second axis
//!    to cancel specular and motion distortion.
//! 4. De-mean `H` and overlap-add it into the output.
//!
//! The first `w` output positions have not accumulated a full set of windows and
//! are left at zero.

use ndarray::{Array1, Array2, ArrayView2, Axis, array, s};

use crate::operations::iir_filtering::bandpass_filter_with;
use crate::operations::types::FilterParams;
use crate::{ParameterError, VitalsError, VitalsResult};

/// Guards divisions by channel means and standard deviations.
const EPSILON: f64 = 1e-9;

/// Window length in seconds, about two heartbeats at resting rates.
pub const POS_WINDOW_SECONDS: f64 = 1.6;

/// Number of frames in one POS window for a given frame rate.
pub fn pos_window_length(sample_rate: f64) -> usize {
    let frames = (POS_WINDOW_SECONDS * sample_rate).round();
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}

/// Transpose insertion-ordered RGB triplets into a `(3, frames)` array.
pub fn rgb_to_channels(rgb: &[[f64; 3]]) -> Array2<f64> {
    Array2::from_shape_fn((3, rgb.len()), |(c, i)| rgb[i][c])
}

/// Compute the raw (unfiltered) POS waveform from RGB triplets.
///
/// # Arguments
/// * `rgb` - Per-frame `(R, G, B)` means in capture order
/// * `sample_rate` - Frame rate in frames per second
///
/// # Returns
/// A waveform with one sample per frame. If there are fewer frames than one
/// window, the waveform is all zeros.
///
/// # Errors
///
/// Fails if the sample rate is not positive or is too low to give a window
/// of at least two frames.
pub fn pos_raw(rgb: &[[f64; 3]], sample_rate: f64) -> VitalsResult<Array1<f64>> {
    pos_raw_channels(rgb_to_channels(rgb).view(), sample_rate)
}

/// [`pos_raw`] over channels already laid out as a `(3, frames)` array.
///
/// # Errors
///
/// Fails if `channels` doesn't have exactly three rows, or for the sample-rate
/// conditions of [`pos_raw`].
pub fn pos_raw_channels(channels: ArrayView2<f64>, sample_rate: f64) -> VitalsResult<Array1<f64>> {
    if channels.nrows() != 3 {
        return Err(VitalsError::DimensionMismatch(format!(
            "POS expects 3 colour channels, got {}",
            channels.nrows()
        )));
    }

    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ParameterError::invalid_value("sample_rate", "must be positive").into());
    }

    let window = pos_window_length(sample_rate);
    if window < 2 {
        return Err(ParameterError::invalid_value(
            "sample_rate",
            format!("{sample_rate} fps gives a POS window of {window} frames, need at least 2"),
        )
        .into());
    }

    let frames = channels.ncols();
    let projection = array![[0.0, 1.0, -1.0], [-2.0, 1.0, 1.0]];
    let mut pulse = Array1::<f64>::zeros(frames);

    for n in window..frames {
        let m = n + 1 - window;
        let cn = channels.slice(s![.., m..=n]);

        let channel_means = cn.sum_axis(Axis(1)) / window as f64;
        let normalised = &cn / &(channel_means + EPSILON).insert_axis(Axis(1));

        let projected = projection.dot(&normalised);
        let s1 = projected.row(0);
        let s2 = projected.row(1);

        let alpha = s1.std(0.0) / (s2.std(0.0) + EPSILON);
        let mut h = &s1 + &(&s2 * alpha);
        let h_mean = h.mean().unwrap_or(0.0);
        h -= h_mean;

        // Positions below `window` are reserved for the warm-up region.
        let first = m.max(window);
        let mut target = pulse.slice_mut(s![first..=n]);
        target += &h.slice(s![first - m..]);
    }

    Ok(pulse)
}

/// Extract the band-passed pulse waveform from RGB triplets.
///
/// Runs [`pos_raw`] and applies a zero-phase Butterworth band-pass with the
/// given parameters. The output has one sample per frame.
///
/// # Errors
///
/// Returns [`VitalsError::InvalidFilterDesign`] when the band is invalid for the
/// frame rate, or when there are too few frames for zero-phase filtering. An
/// empty buffer therefore fails rather than producing a spurious waveform;
/// callers should check for a minimum recording duration first.
///
/// # Examples
///
/// ```rust
/// use vitals_dsp::operations::pos::extract_pulse;
/// use vitals_dsp::{FilterParams, synthetic_rgb_trace};
///
/// let rgb = synthetic_rgb_trace(1.2, 10.0, 30.0, 0.01, 0.0, Some(1));
/// let pulse = extract_pulse(&rgb, 30.0, &FilterParams::pulse()).unwrap();
/// assert_eq!(pulse.len(), rgb.len());
///
/// assert!(extract_pulse(&[], 30.0, &FilterParams::pulse()).is_err());
/// ```
pub fn extract_pulse(
    rgb: &[[f64; 3]],
    sample_rate: f64,
    params: &FilterParams,
) -> VitalsResult<Vec<f64>> {
    let raw = pos_raw(rgb, sample_rate)?.to_vec();
    bandpass_filter_with(&raw, params, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::peak_picking::find_peaks;
    use crate::operations::statistics::median;
    use crate::utils::generation::synthetic_rgb_trace;

    const FS: f64 = 30.0;

    #[test]
    fn test_window_length() {
        assert_eq!(pos_window_length(30.0), 48);
        assert_eq!(pos_window_length(25.0), 40);
        assert_eq!(pos_window_length(0.0), 0);
    }

    #[test]
    fn test_rgb_to_channels_transposes() {
        let channels = rgb_to_channels(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(channels.dim(), (3, 2));
        assert_eq!(channels[[0, 1]], 4.0);
        assert_eq!(channels[[2, 0]], 3.0);
    }

    #[test]
    fn test_warm_up_region_is_zero() {
        let rgb = synthetic_rgb_trace(1.2, 10.0, FS, 0.01, 0.5, Some(3));
        let raw = pos_raw(&rgb, FS).unwrap();
        let window = pos_window_length(FS);

        assert_eq!(raw.len(), rgb.len());
        assert!(raw.iter().take(window).all(|&x| x == 0.0));
        assert!(raw.iter().skip(window).any(|&x| x != 0.0));
    }

    #[test]
    fn test_short_buffer_gives_zero_waveform() {
        let rgb = synthetic_rgb_trace(1.2, 1.0, FS, 0.01, 0.0, None);
        let raw = pos_raw(&rgb, FS).unwrap();
        assert_eq!(raw.len(), 30);
        assert!(raw.iter().all(|&x| x == 0.0));

        assert!(pos_raw(&[], FS).unwrap().is_empty());
    }

    #[test]
    fn test_intensity_changes_cancel() {
        // Equal relative modulation in every channel lies along [1, 1, 1].
        let rgb: Vec<[f64; 3]> = (0..300)
            .map(|i| {
                let gain = 1.0 + 0.2 * (i as f64 / 40.0).sin();
                [150.0 * gain, 110.0 * gain, 90.0 * gain]
            })
            .collect();
        let raw = pos_raw(&rgb, FS).unwrap();
        assert!(raw.iter().all(|x| x.abs() < 1e-6));
    }

    #[test]
    fn test_constant_zero_channel_is_finite() {
        let rgb: Vec<[f64; 3]> = (0..200)
            .map(|i| [120.0 + (i as f64 * 0.3).sin(), 0.0, 80.0])
            .collect();
        let raw = pos_raw(&rgb, FS).unwrap();
        assert!(raw.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_recovers_pulse_period() {
        let rgb = synthetic_rgb_trace(1.2, 30.0, FS, 0.01, 0.0, None);
        let pulse = extract_pulse(&rgb, FS, &FilterParams::pulse()).unwrap();
        assert_eq!(pulse.len(), rgb.len());

        let window = pos_window_length(FS);
        let peaks = find_peaks(&pulse[window..], 15);
        let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();

        // 1.2 Hz at 30 fps is one beat every 25 frames.
        let typical = median(&intervals).unwrap();
        assert!((24.0..=26.0).contains(&typical), "median interval {typical}");
    }

    #[test]
    fn test_empty_buffer_fails_to_filter() {
        let err = extract_pulse(&[], FS, &FilterParams::pulse()).unwrap_err();
        assert!(err.is_filter_error());
    }

    #[test]
    fn test_invalid_inputs() {
        let rgb = synthetic_rgb_trace(1.2, 5.0, FS, 0.01, 0.0, None);
        assert!(pos_raw(&rgb, 0.0).is_err());
        assert!(pos_raw(&rgb, 0.5).is_err());

        let two_rows = Array2::<f64>::zeros((2, 10));
        assert!(pos_raw_channels(two_rows.view(), FS).is_err());
    }
}

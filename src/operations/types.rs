//! Supporting configuration types for the signal operations.
//!
//! This module contains the filter parameter triple and the peak picking
//! configuration used by the band-pass filter and the rate estimator.

use serde::{Deserialize, Serialize};

use crate::{ParameterError, VitalsResult};

/// Lowest filter order accepted by [`FilterParams`].
pub const MIN_FILTER_ORDER: usize = 2;
/// Highest filter order accepted by [`FilterParams`].
///
/// Higher orders in transfer-function form become numerically unstable at the
/// low normalised cutoffs typical of physiological signals.
pub const MAX_FILTER_ORDER: usize = 8;

/// Band-pass filter parameters.
///
/// A `(lowcut, highcut, order)` triple with `0 < lowcut < highcut` (Hz) and
/// `MIN_FILTER_ORDER <= order <= MAX_FILTER_ORDER`. Whether the cutoffs are
/// below Nyquist depends on the sample rate, see [`FilterParams::validate_for`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Lower cutoff frequency in Hz
    pub lowcut: f64,
    /// Upper cutoff frequency in Hz
    pub highcut: f64,
    /// Butterworth prototype order
    pub order: usize,
}

impl FilterParams {
    /// Create validated filter parameters.
    ///
    /// # Errors
    ///
    /// Returns a parameter error if the cutoffs are non-positive, non-finite or
    /// out of order, or if the order is outside `[2, 8]`.
    pub fn new(lowcut: f64, highcut: f64, order: usize) -> VitalsResult<Self> {
        let params = Self {
            lowcut,
            highcut,
            order,
        };
        params.validate()?;
        Ok(params)
    }

    /// Default pass band for the rPPG pulse waveform (0.8–2.5 Hz, 48–150 BPM).
    pub const fn pulse() -> Self {
        Self {
            lowcut: 0.8,
            highcut: 2.5,
            order: 4,
        }
    }

    /// Default pass band for chest displacement (0.1–0.7 Hz, 6–42 breaths/min).
    pub const fn respiration() -> Self {
        Self {
            lowcut: 0.1,
            highcut: 0.7,
            order: 4,
        }
    }

    /// Validate the parameters independent of the sample rate.
    pub fn validate(&self) -> VitalsResult<()> {
        if !self.lowcut.is_finite() || self.lowcut <= 0.0 {
            return Err(ParameterError::invalid_value("lowcut", "must be a positive frequency").into());
        }

        if !self.highcut.is_finite() || self.highcut <= self.lowcut {
            return Err(ParameterError::invalid_value("highcut", "must be greater than lowcut").into());
        }

        if !(MIN_FILTER_ORDER..=MAX_FILTER_ORDER).contains(&self.order) {
            return Err(ParameterError::out_of_range(
                "order",
                self.order as f64,
                MIN_FILTER_ORDER as f64,
                MAX_FILTER_ORDER as f64,
            )
            .into());
        }

        Ok(())
    }

    /// Validate the parameters for a given sample rate (cutoffs below Nyquist).
    pub fn validate_for(&self, sample_rate: f64) -> VitalsResult<()> {
        self.validate()?;

        let nyquist = sample_rate / 2.0;
        if self.highcut >= nyquist {
            return Err(ParameterError::out_of_range("highcut", self.highcut, self.lowcut, nyquist).into());
        }

        Ok(())
    }

    /// Shortest signal these parameters can filter with zero phase.
    ///
    /// The band-pass is padded by `3 * (2 * order + 1)` samples on each side
    /// and the signal must be longer than the padding.
    pub const fn min_signal_len(&self) -> usize {
        3 * (2 * self.order + 1) + 1
    }

    /// Build parameters from an optimizer position `[lowcut, highcut, order]`.
    ///
    /// The order coordinate is truncated towards zero, matching how the fitness
    /// evaluator interprets it.
    pub fn from_position(position: &[f64]) -> VitalsResult<Self> {
        match position {
            [lowcut, highcut, order] if order.is_finite() && *order >= 0.0 => {
                Self::new(*lowcut, *highcut, order.trunc() as usize)
            }
            [_, _, order] => {
                Err(ParameterError::invalid_value("order", format!("{order} is not a valid filter order")).into())
            }
            _ => Err(crate::VitalsError::DimensionMismatch(format!(
                "filter position must have 3 coordinates, got {}",
                position.len()
            ))),
        }
    }

    /// Position of these parameters in the optimizer search space.
    pub fn to_position(&self) -> [f64; 3] {
        [self.lowcut, self.highcut, self.order as f64]
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::pulse()
    }
}

/// Configuration for peak picking with a minimum-period constraint.
///
/// Local maxima closer together than one physiological cycle are merged,
/// keeping the tallest one, so that noisy sub-peaks are not double counted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPickingConfig {
    /// Minimum time between two accepted peaks, in seconds
    pub min_period_seconds: f64,
}

impl PeakPickingConfig {
    /// Create a peak picking configuration with the given minimum period.
    pub const fn new(min_period_seconds: f64) -> Self {
        Self { min_period_seconds }
    }

    /// Configuration for heart rate: peaks at least 0.5 s apart (≤ 120 BPM).
    pub const fn heart_rate() -> Self {
        Self::new(0.5)
    }

    /// Configuration for respiration: peaks at least 2 s apart (≤ 30 breaths/min).
    pub const fn respiration() -> Self {
        Self::new(2.0)
    }

    /// Minimum peak separation in samples for a given sample rate.
    ///
    /// Rounded up, and never less than one sample.
    pub fn min_peak_separation(&self, sample_rate: f64) -> usize {
        let samples = (self.min_period_seconds * sample_rate).ceil();
        if samples.is_finite() && samples >= 1.0 {
            samples as usize
        } else {
            1
        }
    }

    /// Validate the peak picking configuration.
    pub fn validate(&self) -> VitalsResult<()> {
        if !self.min_period_seconds.is_finite() || self.min_period_seconds < 0.0 {
            return Err(ParameterError::invalid_value(
                "min_period_seconds",
                "Minimum period must be finite and non-negative",
            )
            .into());
        }

        Ok(())
    }
}

impl Default for PeakPickingConfig {
    fn default() -> Self {
        Self::heart_rate()
    }
}

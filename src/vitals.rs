//! Session-level estimation of heart rate and respiration rate.
//!
//! A capture loop pushes one RGB mean per video frame (from the face region)
//! and one vertical displacement per frame (from the shoulders) into
//! [`SignalBuffers`]. [`VitalsEstimator`] turns the buffers into rates:
//!
//! - **Heart rate**: POS pulse extraction, band-pass with the pulse filter,
//!   peak counting with a 0.5 s minimum period.
//! - **Respiration rate**: band-pass of the displacement trace with the
//!   respiration filter, peak counting with a 2 s minimum period.
//!
//! Both filters can be re-tuned on the current buffers with the Cat Swarm
//! Optimizer. Tuned parameters are returned to the caller, who decides whether
//! to install them with [`VitalsEstimator::with_pulse_filter`] or
//! [`VitalsEstimator::with_respiration_filter`].
//!
//! ```rust
//! use vitals_dsp::vitals::{SignalBuffers, VitalsEstimator};
//! use vitals_dsp::synthetic_rgb_trace;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut buffers = SignalBuffers::new();
//! for [r, g, b] in synthetic_rgb_trace(1.2, 30.0, 30.0, 0.01, 0.0, Some(2)) {
//!     buffers.push_rgb(r, g, b);
//! }
//!
//! let vitals = VitalsEstimator::default().estimate(&buffers)?;
//! assert!((vitals.heart_rate() - 72.0).abs() < 7.2);
//! assert_eq!(vitals.respiration_rate(), 0.0); // no displacement samples yet
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::operations::iir_filtering::bandpass_filter_with;
use crate::operations::peak_picking::{RateEstimate, estimate_rate_with};
use crate::operations::pos::{extract_pulse, pos_raw};
use crate::operations::statistics::mean;
use crate::operations::types::{FilterParams, PeakPickingConfig};
use crate::optimization::cat_swarm::CatSwarmOptimizer;
use crate::optimization::fitness::{FITNESS_PENALTY, FitnessEvaluator};
use crate::optimization::types::{CatSwarmConfig, SearchBounds};
use crate::{ParameterError, VitalsError, VitalsResult};

/// Per-frame measurements accumulated during a capture session.
///
/// The two buffers are independent: displacement tracking usually starts a
/// few frames after the face is found, so the lengths may differ. A buffer
/// with a capacity keeps a rolling window, dropping its oldest samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalBuffers {
    rgb: Vec<[f64; 3]>,
    displacement: Vec<f64>,
    capacity: Option<usize>,
}

impl SignalBuffers {
    /// Empty, unbounded buffers.
    pub const fn new() -> Self {
        Self {
            rgb: Vec::new(),
            displacement: Vec::new(),
            capacity: None,
        }
    }

    /// Empty buffers that keep at most `max_frames` samples each (at least one).
    pub const fn with_capacity(max_frames: usize) -> Self {
        Self {
            rgb: Vec::new(),
            displacement: Vec::new(),
            capacity: Some(if max_frames == 0 { 1 } else { max_frames }),
        }
    }

    /// Empty buffers holding the most recent `seconds` of frames.
    ///
    /// # Errors
    ///
    /// Fails if `seconds * sample_rate` isn't a finite number of at least one frame.
    pub fn with_capacity_seconds(seconds: f64, sample_rate: f64) -> VitalsResult<Self> {
        let frames = seconds * sample_rate;
        if !frames.is_finite() || frames < 1.0 {
            return Err(ParameterError::invalid_value(
                "seconds",
                format!("{seconds} s at {sample_rate} fps holds no frames"),
            )
            .into());
        }
        Ok(Self::with_capacity(frames as usize))
    }

    /// Maximum number of samples kept per buffer, `None` if unbounded.
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append the mean colour of the skin region for one frame.
    pub fn push_rgb(&mut self, r: f64, g: f64, b: f64) {
        self.rgb.push([r, g, b]);
        evict_oldest(&mut self.rgb, self.capacity);
    }

    /// Append the vertical chest/shoulder position for one frame.
    pub fn push_displacement(&mut self, y: f64) {
        self.displacement.push(y);
        evict_oldest(&mut self.displacement, self.capacity);
    }

    /// Append the mean y-coordinate of tracked `[x, y]` feature points.
    ///
    /// Frames where tracking lost every point are skipped. Returns whether a
    /// sample was appended.
    pub fn push_feature_points(&mut self, points: &[[f64; 2]]) -> bool {
        let ys: Vec<f64> = points.iter().map(|p| p[1]).filter(|y| y.is_finite()).collect();
        if ys.is_empty() {
            return false;
        }
        self.push_displacement(mean(&ys));
        true
    }

    /// RGB means in capture order.
    pub fn rgb(&self) -> &[[f64; 3]] {
        &self.rgb
    }

    /// Displacement samples in capture order.
    pub fn displacement(&self) -> &[f64] {
        &self.displacement
    }

    /// Number of RGB frames captured.
    pub fn frames(&self) -> usize {
        self.rgb.len()
    }

    /// Discard all samples, e.g. when the subject leaves the frame. The
    /// capacity is kept.
    pub fn clear(&mut self) {
        self.rgb.clear();
        self.displacement.clear();
    }
}

fn evict_oldest<T>(buffer: &mut Vec<T>, capacity: Option<usize>) {
    if let Some(capacity) = capacity {
        if buffer.len() > capacity {
            let excess = buffer.len() - capacity;
            buffer.drain(..excess);
        }
    }
}

/// Configuration for a [`VitalsEstimator`].
///
/// Missing fields take their defaults when deserialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    /// Video frame rate in frames per second
    pub sample_rate: f64,
    /// Band-pass applied to the POS waveform
    pub pulse_filter: FilterParams,
    /// Band-pass applied to the displacement trace
    pub respiration_filter: FilterParams,
    /// Peak picking for heart rate
    pub heart_rate_peaks: PeakPickingConfig,
    /// Peak picking for respiration rate
    pub respiration_peaks: PeakPickingConfig,
    /// Buffers shorter than this produce a zero rate instead of an estimate
    pub min_duration_seconds: f64,
    /// Length of the rolling window kept by [`VitalsEstimator::session_buffers`];
    /// `None` keeps every sample
    pub max_duration_seconds: Option<f64>,
    /// Optimizer settings used when tuning filters
    pub optimizer: CatSwarmConfig,
    /// Search space for pulse filter tuning
    pub pulse_bounds: SearchBounds,
    /// Search space for respiration filter tuning
    pub respiration_bounds: SearchBounds,
}

impl VitalsConfig {
    /// Number of samples needed before a rate is estimated.
    pub fn min_samples(&self) -> usize {
        let samples = (self.min_duration_seconds * self.sample_rate).ceil();
        if samples.is_finite() && samples > 0.0 {
            samples as usize
        } else {
            0
        }
    }

    /// Number of samples kept per buffer, if the window is bounded.
    pub fn max_samples(&self) -> Option<usize> {
        self.max_duration_seconds
            .map(|seconds| (seconds * self.sample_rate).max(1.0) as usize)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> VitalsResult<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ParameterError::invalid_value("sample_rate", "must be positive").into());
        }

        self.pulse_filter.validate_for(self.sample_rate)?;
        self.respiration_filter.validate_for(self.sample_rate)?;
        self.heart_rate_peaks.validate()?;
        self.respiration_peaks.validate()?;
        self.optimizer.validate()?;

        if !self.min_duration_seconds.is_finite() || self.min_duration_seconds < 0.0 {
            return Err(ParameterError::invalid_value(
                "min_duration_seconds",
                "must be finite and non-negative",
            )
            .into());
        }

        if let Some(max) = self.max_duration_seconds {
            let holds_a_frame = max * self.sample_rate >= 1.0;
            if !max.is_finite() || max < self.min_duration_seconds || !holds_a_frame {
                return Err(ParameterError::invalid_value(
                    "max_duration_seconds",
                    format!("{max} s must be finite and cover min_duration_seconds"),
                )
                .into());
            }
        }

        for (name, bounds) in [
            ("pulse_bounds", &self.pulse_bounds),
            ("respiration_bounds", &self.respiration_bounds),
        ] {
            if bounds.dim() != 3 {
                return Err(VitalsError::DimensionMismatch(format!(
                    "{name} must have 3 dimensions (lowcut, highcut, order), got {}",
                    bounds.dim()
                )));
            }
        }

        Ok(())
    }
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            pulse_filter: FilterParams::pulse(),
            respiration_filter: FilterParams::respiration(),
            heart_rate_peaks: PeakPickingConfig::heart_rate(),
            respiration_peaks: PeakPickingConfig::respiration(),
            min_duration_seconds: 3.0,
            max_duration_seconds: Some(30.0),
            optimizer: CatSwarmConfig::new(),
            pulse_bounds: SearchBounds::pulse_filter(),
            respiration_bounds: SearchBounds::respiration_filter(),
        }
    }
}

/// A filtered waveform and the rate counted on it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RateReading {
    /// Band-passed waveform; empty when the buffer was too short
    pub waveform: Vec<f64>,
    /// Rate and peak positions on `waveform`
    pub estimate: RateEstimate,
}

impl RateReading {
    /// A reading with no waveform and a zero rate.
    pub const fn empty() -> Self {
        Self {
            waveform: Vec::new(),
            estimate: RateEstimate::zero(),
        }
    }
}

/// Heart rate and respiration rate from one pass over the buffers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VitalSigns {
    /// Pulse waveform and heart rate
    pub pulse: RateReading,
    /// Respiration waveform and respiration rate
    pub respiration: RateReading,
}

impl VitalSigns {
    /// Heart rate in beats per minute (0 if unavailable).
    pub const fn heart_rate(&self) -> f64 {
        self.pulse.estimate.rate_per_minute
    }

    /// Respiration rate in breaths per minute (0 if unavailable).
    pub const fn respiration_rate(&self) -> f64 {
        self.respiration.estimate.rate_per_minute
    }
}

/// Outcome of a filter tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunedFilter {
    /// Best `(lowcut, highcut, order)` position found, order not yet truncated
    pub position: Vec<f64>,
    /// Fitness at `position`; [`FITNESS_PENALTY`] if nothing usable was found
    pub score: f64,
    /// Usable filter parameters, present only when `score` beats the penalty
    pub params: Option<FilterParams>,
}

impl TunedFilter {
    /// Whether tuning produced usable parameters.
    pub const fn is_usable(&self) -> bool {
        self.params.is_some()
    }
}

/// Estimates vital signs from capture buffers and tunes its own filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VitalsEstimator {
    config: VitalsConfig,
}

impl VitalsEstimator {
    /// Create an estimator with a validated configuration.
    pub fn new(config: VitalsConfig) -> VitalsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub const fn config(&self) -> &VitalsConfig {
        &self.config
    }

    /// Empty buffers sized to the configured rolling window.
    pub fn session_buffers(&self) -> SignalBuffers {
        match self.config.max_samples() {
            Some(frames) => SignalBuffers::with_capacity(frames),
            None => SignalBuffers::new(),
        }
    }

    /// Same estimator with a different pulse filter.
    ///
    /// # Errors
    ///
    /// Fails if the parameters are invalid at the configured sample rate.
    pub fn with_pulse_filter(mut self, params: FilterParams) -> VitalsResult<Self> {
        params.validate_for(self.config.sample_rate)?;
        self.config.pulse_filter = params;
        Ok(self)
    }

    /// Same estimator with a different respiration filter.
    ///
    /// # Errors
    ///
    /// Fails if the parameters are invalid at the configured sample rate.
    pub fn with_respiration_filter(mut self, params: FilterParams) -> VitalsResult<Self> {
        params.validate_for(self.config.sample_rate)?;
        self.config.respiration_filter = params;
        Ok(self)
    }

    /// Heart rate from RGB means.
    ///
    /// Returns [`RateReading::empty`] if fewer than
    /// [`min_samples`](VitalsConfig::min_samples) frames are available, or too
    /// few for the pulse filter ([`FilterParams::min_signal_len`]).
    pub fn heart_rate(&self, rgb: &[[f64; 3]]) -> VitalsResult<RateReading> {
        if !self.has_enough("pulse", rgb.len(), &self.config.pulse_filter) {
            return Ok(RateReading::empty());
        }

        let waveform = extract_pulse(rgb, self.config.sample_rate, &self.config.pulse_filter)?;
        let estimate =
            estimate_rate_with(&waveform, self.config.sample_rate, &self.config.heart_rate_peaks)?;
        Ok(RateReading { waveform, estimate })
    }

    /// Respiration rate from a displacement trace.
    ///
    /// Returns [`RateReading::empty`] if fewer than
    /// [`min_samples`](VitalsConfig::min_samples) samples are available, or too
    /// few for the respiration filter.
    pub fn respiration_rate(&self, displacement: &[f64]) -> VitalsResult<RateReading> {
        if !self.has_enough("respiration", displacement.len(), &self.config.respiration_filter) {
            return Ok(RateReading::empty());
        }

        let waveform = bandpass_filter_with(
            displacement,
            &self.config.respiration_filter,
            self.config.sample_rate,
        )?;
        let estimate =
            estimate_rate_with(&waveform, self.config.sample_rate, &self.config.respiration_peaks)?;
        Ok(RateReading { waveform, estimate })
    }

    /// Heart rate and respiration rate from session buffers.
    pub fn estimate(&self, buffers: &SignalBuffers) -> VitalsResult<VitalSigns> {
        Ok(VitalSigns {
            pulse: self.heart_rate(buffers.rgb())?,
            respiration: self.respiration_rate(buffers.displacement())?,
        })
    }

    /// Tune the pulse filter on the raw (unfiltered) POS waveform of `rgb`.
    pub fn tune_pulse_filter(&self, rgb: &[[f64; 3]]) -> VitalsResult<TunedFilter> {
        let raw = pos_raw(rgb, self.config.sample_rate)?;
        self.tune_filter(&raw.to_vec(), &self.config.pulse_bounds)
    }

    /// Tune the respiration filter on a displacement trace.
    pub fn tune_respiration_filter(&self, displacement: &[f64]) -> VitalsResult<TunedFilter> {
        self.tune_filter(displacement, &self.config.respiration_bounds)
    }

    /// Tune band-pass parameters for an arbitrary waveform within `bounds`.
    ///
    /// # Errors
    ///
    /// Fails if `bounds` isn't 3-dimensional. A signal that is too short is
    /// not an error: every candidate is penalised and `params` is `None`.
    pub fn tune_filter(&self, signal: &[f64], bounds: &SearchBounds) -> VitalsResult<TunedFilter> {
        if bounds.dim() != 3 {
            return Err(VitalsError::DimensionMismatch(format!(
                "filter search space must have 3 dimensions, got {}",
                bounds.dim()
            )));
        }

        let evaluator = FitnessEvaluator::new(signal, self.config.sample_rate);
        let result = CatSwarmOptimizer::new(
            |position: &[f64]| evaluator.evaluate(position),
            bounds.clone(),
            self.config.optimizer,
        )?
        .run();

        let params = if result.best_score < FITNESS_PENALTY {
            FilterParams::from_position(&result.best_position).ok()
        } else {
            None
        };

        debug!(
            samples = signal.len(),
            score = result.best_score,
            ?params,
            "Filter tuning finished"
        );

        Ok(TunedFilter {
            position: result.best_position,
            score: result.best_score,
            params,
        })
    }

    fn has_enough(&self, channel: &str, available: usize, filter: &FilterParams) -> bool {
        let required = self.config.min_samples().max(filter.min_signal_len());
        if available < required {
            warn!(
                channel,
                required,
                available,
                "Not enough samples to estimate a rate, reporting 0"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generation::{breathing_displacement, synthetic_rgb_trace};

    const FS: f64 = 30.0;

    fn seeded_estimator() -> VitalsEstimator {
        let config = VitalsConfig {
            optimizer: CatSwarmConfig::new().with_seed(42),
            ..VitalsConfig::default()
        };
        VitalsEstimator::new(config).unwrap()
    }

    #[test]
    fn test_buffers() {
        let mut buffers = SignalBuffers::new();
        buffers.push_rgb(1.0, 2.0, 3.0);
        buffers.push_rgb(4.0, 5.0, 6.0);
        buffers.push_displacement(240.0);

        assert_eq!(buffers.frames(), 2);
        assert_eq!(buffers.rgb()[1], [4.0, 5.0, 6.0]);
        assert_eq!(buffers.displacement(), &[240.0]);

        buffers.clear();
        assert_eq!(buffers, SignalBuffers::default());
    }

    #[test]
    fn test_bounded_buffers_drop_oldest_samples() {
        let mut buffers = SignalBuffers::with_capacity(3);
        for i in 0..5 {
            let x = i as f64;
            buffers.push_rgb(x, x, x);
            buffers.push_displacement(x);
        }

        assert_eq!(buffers.capacity(), Some(3));
        assert_eq!(buffers.frames(), 3);
        assert_eq!(buffers.rgb(), &[[2.0; 3], [3.0; 3], [4.0; 3]]);
        assert_eq!(buffers.displacement(), &[2.0, 3.0, 4.0]);

        buffers.clear();
        assert_eq!(buffers.capacity(), Some(3));
        assert_eq!(SignalBuffers::with_capacity(0).capacity(), Some(1));
    }

    #[test]
    fn test_capacity_in_seconds() {
        let buffers = SignalBuffers::with_capacity_seconds(30.0, FS).unwrap();
        assert_eq!(buffers.capacity(), Some(900));
        assert!(SignalBuffers::with_capacity_seconds(0.0, FS).is_err());
        assert!(SignalBuffers::with_capacity_seconds(f64::NAN, FS).is_err());
    }

    #[test]
    fn test_session_buffers_keep_a_rolling_window() {
        let estimator = VitalsEstimator::default();
        let mut buffers = estimator.session_buffers();
        assert_eq!(buffers.capacity(), Some(900));

        let trace = synthetic_rgb_trace(1.2, 40.0, FS, 0.01, 0.0, Some(5));
        for &[r, g, b] in &trace {
            buffers.push_rgb(r, g, b);
        }
        assert_eq!(buffers.frames(), 900);
        assert_eq!(buffers.rgb(), &trace[300..]);

        let unbounded = VitalsEstimator::new(VitalsConfig {
            max_duration_seconds: None,
            ..VitalsConfig::default()
        })
        .unwrap();
        assert_eq!(unbounded.session_buffers().capacity(), None);
    }

    #[test]
    fn test_feature_points_reduce_to_mean_y() {
        let mut buffers = SignalBuffers::new();
        assert!(buffers.push_feature_points(&[[10.0, 240.0], [20.0, 244.0], [30.0, f64::NAN]]));
        assert!(!buffers.push_feature_points(&[]));
        assert_eq!(buffers.displacement(), &[242.0]);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = VitalsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_samples(), 90);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let zero_rate = VitalsConfig {
            sample_rate: 0.0,
            ..VitalsConfig::default()
        };
        assert!(VitalsEstimator::new(zero_rate).is_err());

        // 2.5 Hz is above Nyquist at 4 fps.
        let slow_camera = VitalsConfig {
            sample_rate: 4.0,
            ..VitalsConfig::default()
        };
        assert!(VitalsEstimator::new(slow_camera).is_err());

        let flat_bounds = VitalsConfig {
            pulse_bounds: SearchBounds::new(vec![(0.6, 1.2), (2.0, 3.0)]).unwrap(),
            ..VitalsConfig::default()
        };
        assert!(matches!(
            VitalsEstimator::new(flat_bounds),
            Err(VitalsError::DimensionMismatch(_))
        ));

        let window_too_short = VitalsConfig {
            max_duration_seconds: Some(2.0),
            ..VitalsConfig::default()
        };
        assert!(VitalsEstimator::new(window_too_short).is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "sample_rate": 25.0,
            "pulse_filter": { "lowcut": 0.7, "highcut": 3.0, "order": 5 },
            "optimizer": { "n_cats": 16 },
            "respiration_bounds": [[0.1, 0.2], [0.5, 0.9], [2.0, 6.0]]
        }"#;
        let config: VitalsConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.sample_rate, 25.0);
        assert_eq!(config.pulse_filter.order, 5);
        assert_eq!(config.optimizer.n_cats, 16);
        assert_eq!(config.optimizer.max_iter, 25);
        assert_eq!(config.respiration_bounds.as_slice()[2], (2.0, 6.0));
        assert_eq!(config.respiration_filter, FilterParams::respiration());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_heart_rate_from_synthetic_face() {
        let rgb = synthetic_rgb_trace(1.2, 30.0, FS, 0.01, 0.5, Some(4));
        let reading = VitalsEstimator::default().heart_rate(&rgb).unwrap();

        assert_eq!(reading.waveform.len(), rgb.len());
        let bpm = reading.estimate.rate_per_minute;
        assert!((bpm - 72.0).abs() <= 7.2, "estimated {bpm} BPM");
    }

    #[test]
    fn test_respiration_rate_from_displacement() {
        let displacement = breathing_displacement(15.0, 60.0, FS, 240.0, 5.0);
        let reading = VitalsEstimator::default().respiration_rate(&displacement).unwrap();

        let br = reading.estimate.rate_per_minute;
        assert!((br - 15.0).abs() <= 1.5, "estimated {br} breaths/min");
    }

    #[test]
    fn test_short_buffers_report_zero() {
        let estimator = VitalsEstimator::default();
        let mut buffers = SignalBuffers::new();
        for [r, g, b] in synthetic_rgb_trace(1.2, 2.0, FS, 0.01, 0.0, Some(1)) {
            buffers.push_rgb(r, g, b);
            buffers.push_displacement(240.0);
        }

        let vitals = estimator.estimate(&buffers).unwrap();
        assert_eq!(vitals, VitalSigns::default());
        assert_eq!(vitals.heart_rate(), 0.0);
        assert_eq!(vitals.respiration_rate(), 0.0);
    }

    #[test]
    fn test_guard_covers_filter_padding() {
        // At 15 fps, 3 s is 45 frames but an order 8 band-pass needs 52.
        let config = VitalsConfig {
            sample_rate: 15.0,
            pulse_filter: FilterParams::new(0.8, 2.5, 8).unwrap(),
            respiration_filter: FilterParams::new(0.1, 0.7, 8).unwrap(),
            ..VitalsConfig::default()
        };
        let estimator = VitalsEstimator::new(config).unwrap();
        assert_eq!(estimator.config().min_samples(), 45);

        let rgb = synthetic_rgb_trace(1.2, 3.0, 15.0, 0.01, 0.0, Some(3));
        assert_eq!(rgb.len(), 45);
        assert_eq!(estimator.heart_rate(&rgb).unwrap(), RateReading::empty());
        assert_eq!(
            estimator.respiration_rate(&[240.0; 45]).unwrap(),
            RateReading::empty()
        );

        let rgb = synthetic_rgb_trace(1.2, 4.0, 15.0, 0.01, 0.0, Some(3));
        assert_eq!(estimator.heart_rate(&rgb).unwrap().waveform.len(), 60);
    }

    #[test]
    fn test_tune_pulse_filter() {
        let rgb = synthetic_rgb_trace(1.2, 10.0, FS, 0.01, 0.5, Some(6));
        let estimator = seeded_estimator();
        let tuned = estimator.tune_pulse_filter(&rgb).unwrap();

        let params = tuned.params.unwrap();
        assert!(estimator.config().pulse_bounds.contains(&tuned.position));
        assert!(params.lowcut < params.highcut);
        assert!(tuned.score < FITNESS_PENALTY);

        let retuned = estimator.with_pulse_filter(params).unwrap();
        assert_eq!(retuned.config().pulse_filter, params);
        assert!(retuned.heart_rate(&rgb).is_ok());
    }

    #[test]
    fn test_tune_respiration_filter() {
        let amplitude = 5.0;
        let displacement = breathing_displacement(12.0, 30.0, FS, 240.0, amplitude);
        let estimator = seeded_estimator();
        let tuned = estimator.tune_respiration_filter(&displacement).unwrap();

        assert!(tuned.is_usable());
        assert!(SearchBounds::respiration_filter().contains(&tuned.position));

        // Tuned filters near 0.05 Hz at high order must still be stable.
        let params = tuned.params.unwrap();
        let retuned = estimator.with_respiration_filter(params).unwrap();
        let reading = retuned.respiration_rate(&displacement).unwrap();
        let peak = reading.waveform.iter().fold(0.0_f64, |m, y| m.max(y.abs()));
        assert!(peak < 3.0 * amplitude, "{params:?} gave peak {peak}");
    }

    #[test]
    fn test_tuning_short_signal_gives_no_params() {
        let estimator = seeded_estimator();
        let tuned = estimator
            .tune_filter(&[0.0; 60], &SearchBounds::pulse_filter())
            .unwrap();

        assert_eq!(tuned.score, FITNESS_PENALTY);
        assert!(tuned.params.is_none());

        let bad_bounds = SearchBounds::new(vec![(0.0, 1.0)]).unwrap();
        assert!(estimator.tune_filter(&[0.0; 120], &bad_bounds).is_err());
    }

    #[test]
    fn test_with_filter_validates() {
        let estimator = VitalsEstimator::default();
        let too_high = FilterParams::new(0.8, 20.0, 4).unwrap();
        assert!(estimator.clone().with_pulse_filter(too_high).is_err());
        assert!(estimator.with_respiration_filter(FilterParams::respiration()).is_ok());
    }
}

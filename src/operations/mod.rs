//! Signal operations on video-derived measurements.
//!
//! Each module covers one step of the extraction pipeline and works on plain
//! slices of `f64` samples, so the steps compose freely.
//!
//! ## Module Organization
//!
//! - [`iir_filtering`] - Butterworth band-pass design and zero-phase filtering
//! - [`pos`] - POS chrominance pulse extraction from RGB means
//! - [`peak_picking`] - Peak detection and rate estimation
//! - [`statistics`] - Population statistics used by the quality metric
//! - [`types`] - Filter parameters and peak picking configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use vitals_dsp::operations::*;
//! use vitals_dsp::synthetic_rgb_trace;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rgb = synthetic_rgb_trace(1.2, 20.0, 30.0, 0.01, 0.0, Some(7));
//!
//! let pulse = extract_pulse(&rgb, 30.0, &FilterParams::pulse())?;
//! let estimate = estimate_rate_with(&pulse, 30.0, &PeakPickingConfig::heart_rate())?;
//! println!("{:.0} BPM", estimate.rate_per_minute);
//! # Ok(())
//! # }
//! ```

pub mod iir_filtering;
pub mod peak_picking;
pub mod pos;
pub mod statistics;
pub mod types;

pub use iir_filtering::{
    FilterCoefficients, IirFilter, SecondOrderSections, bandpass_filter, bandpass_filter_with,
    design_butterworth_bandpass, design_butterworth_bandpass_sos, filtfilt, lfilter, lfilter_zi,
    sosfilt, sosfilt_zi, sosfiltfilt,
};
pub use peak_picking::{RateEstimate, estimate_rate, estimate_rate_with, find_peaks};
pub use pos::{extract_pulse, pos_raw, pos_window_length, rgb_to_channels};
pub use types::{FilterParams, MAX_FILTER_ORDER, MIN_FILTER_ORDER, PeakPickingConfig};

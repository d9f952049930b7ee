// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::vec_box)] // Avoids using `Vec<Box<T>>` when unnecessary
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![warn(clippy::missing_const_for_fn)] // Suggests making eligible functions `const`
#![deny(missing_docs)] // Documentation is a must for release

//! # vitals_dsp
//!
//! Contactless vital-sign estimation for Rust: heart rate from the colour of a
//! face in video (remote photoplethysmography, rPPG) and respiration rate from
//! the vertical motion of the shoulders, with band-pass filters that tune
//! themselves to the signal at hand.
//!
//! ## Overview
//!
//! The crate is the numeric core of a camera-based vital-signs monitor. It
//! consumes per-frame measurements produced elsewhere (mean RGB of a skin
//! region, a shoulder landmark's y-coordinate) and returns waveforms, peak
//! positions and rates. It does no capture, face detection or drawing.
//!
//! The pipeline:
//!
//! 1. **POS** ([`operations::pos`]) projects RGB means onto a plane orthogonal
//!    to skin tone, leaving the blood-volume pulse.
//! 2. **Band-pass** ([`operations::iir_filtering`]) applies a Butterworth filter
//!    forwards and backwards, so peaks keep their timing.
//! 3. **Peak counting** ([`operations::peak_picking`]) converts peaks into a
//!    rate per minute.
//! 4. **Self-tuning** ([`optimization`]) searches `(lowcut, highcut, order)` with
//!    Cat Swarm Optimization, scoring each candidate by the signal-to-noise
//!    ratio of the filtered signal.
//!
//! [`vitals::VitalsEstimator`] ties the steps together for a capture session.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! vitals_dsp = "0.1.0"
//! ```
//!
//! ## Features
//!
//! - `parallel-processing`: update cats of the swarm in parallel with `rayon`.
//!   Results are identical to the sequential build for the same seed.
//!
//! ## Error Handling
//!
//! The library uses a hierarchical error system:
//!
//! ```rust
//! use vitals_dsp::{FilterParams, ParameterError, VitalsError};
//!
//! match FilterParams::new(2.5, 0.8, 4) {
//!     Ok(_) => unreachable!(),
//!     Err(VitalsError::Parameter(ParameterError::InvalidValue { parameter, .. })) => {
//!         assert_eq!(parameter, "highcut");
//!     }
//!     Err(other) => panic!("unexpected error: {other}"),
//! }
//! ```
//!
//! ## Quick Start
//!
//! ### Heart rate from RGB means
//!
//! ```rust
//! use vitals_dsp::{FilterParams, estimate_rate, extract_pulse, synthetic_rgb_trace};
//!
//! // 30 s of a 72 BPM face at 30 fps
//! let rgb = synthetic_rgb_trace(1.2, 30.0, 30.0, 0.01, 0.0, Some(1));
//!
//! let pulse = extract_pulse(&rgb, 30.0, &FilterParams::pulse()).unwrap();
//! let heart_rate = estimate_rate(&pulse, 30.0, 0.5).unwrap();
//! assert!((heart_rate.rate_per_minute - 72.0).abs() < 7.2);
//! ```
//!
//! ### Respiration rate from shoulder motion
//!
//! ```rust
//! use vitals_dsp::{bandpass_filter, breathing_displacement, estimate_rate};
//!
//! let y = breathing_displacement(15.0, 60.0, 30.0, 240.0, 4.0);
//! let breathing = bandpass_filter(&y, 0.1, 0.7, 30.0, 4).unwrap();
//! let rate = estimate_rate(&breathing, 30.0, 2.0).unwrap();
//! assert!((rate.rate_per_minute - 15.0).abs() <= 1.5);
//! ```
//!
//! ### Tuning a filter
//!
//! ```rust
//! use vitals_dsp::optimization::{CatSwarmConfig, FitnessEvaluator, cat_swarm_optimize};
//! use vitals_dsp::sine_wave;
//!
//! let signal = sine_wave(1.2, 10.0, 30.0, 1.0);
//! let evaluator = FitnessEvaluator::new(&signal, 30.0);
//! let result = cat_swarm_optimize(
//!     |p: &[f64]| evaluator.evaluate(p),
//!     &[(0.6, 1.2), (2.0, 3.0), (2.0, 8.0)],
//!     &CatSwarmConfig::new().with_seed(42),
//! )
//! .unwrap();
//! println!("best (lowcut, highcut, order) = {:?}", result.best_position);
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber: filter
//! design and optimizer runs at `debug`, optimizer iterations at `trace`, and
//! degenerate session results at `warn`.
//!
//! ## License
//!
//! MIT License

mod error;

pub mod operations;
pub mod optimization;
pub mod utils;
pub mod vitals;

pub use crate::error::{ParameterError, VitalsError, VitalsResult};
pub use crate::operations::{
    FilterParams, PeakPickingConfig, RateEstimate, bandpass_filter, estimate_rate,
    extract_pulse, pos_raw,
};
pub use crate::optimization::{
    CatSwarmConfig, CatSwarmOptimizer, FitnessEvaluator, OptimizationResult, SearchBounds,
    cat_swarm_optimize,
};
pub use crate::utils::{
    generation::{
        PULSE_SIGNATURE, breathing_displacement, sine_wave, synthetic_rgb_trace, white_noise,
    },
    samples_to_seconds, seconds_to_samples,
};
pub use crate::vitals::{
    RateReading, SignalBuffers, TunedFilter, VitalSigns, VitalsConfig, VitalsEstimator,
};

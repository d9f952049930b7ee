//! Signal generation utilities.
//!
//! Deterministic synthetic signals that stand in for the capture layer:
//! pure tones, seeded noise, per-frame RGB skin traces carrying a pulse, and
//! chest displacement traces carrying a breathing rhythm.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::utils::seconds_to_samples;

/// Relative amplitude of the blood-volume pulse in the R, G and B channels.
///
/// The pulsatile component of skin reflectance is strongest in green and
/// weakest in red.
pub const PULSE_SIGNATURE: [f64; 3] = [0.33, 0.77, 0.53];

/// Generates a sine wave with the specified parameters.
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `duration` - Duration of the signal in seconds
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude` - Peak amplitude
///
/// # Returns
/// `round(duration * sample_rate)` samples of `amplitude * sin(2π f t)`.
pub fn sine_wave(frequency: f64, duration: f64, sample_rate: f64, amplitude: f64) -> Vec<f64> {
    let num_samples = seconds_to_samples(duration, sample_rate);
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Generates uniform white noise in `[-amplitude, amplitude)`.
///
/// With `Some(seed)` the output is reproducible; with `None` the generator is
/// seeded from the operating system.
pub fn white_noise(num_samples: usize, amplitude: f64, seed: Option<u64>) -> Vec<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    (0..num_samples)
        .map(|_| (rng.random::<f64>() - 0.5) * 2.0 * amplitude)
        .collect()
}

/// Generates per-frame mean RGB values of a skin region with a cardiac pulse.
///
/// Each channel is `base[c] * (1 + strength * PULSE_SIGNATURE[c] * sin(2π f t))`
/// plus optional seeded noise, with a fixed light skin tone as `base`.
///
/// # Arguments
/// * `pulse_hz` - Heart rate in Hz (1.2 Hz = 72 BPM)
/// * `duration` - Duration in seconds
/// * `sample_rate` - Frame rate in frames per second
/// * `strength` - Relative pulse amplitude, typically around 0.01
/// * `noise` - Amplitude of additive noise in 0–255 units (0 for a clean trace)
/// * `seed` - Seed for the noise generator
pub fn synthetic_rgb_trace(
    pulse_hz: f64,
    duration: f64,
    sample_rate: f64,
    strength: f64,
    noise: f64,
    seed: Option<u64>,
) -> Vec<[f64; 3]> {
    const SKIN_TONE: [f64; 3] = [182.0, 128.0, 104.0];

    let num_frames = seconds_to_samples(duration, sample_rate);
    let jitter = white_noise(3 * num_frames, noise, seed);

    (0..num_frames)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let pulse = (2.0 * PI * pulse_hz * t).sin();
            let mut frame = [0.0; 3];
            for (c, value) in frame.iter_mut().enumerate() {
                *value = SKIN_TONE[c] * (1.0 + strength * PULSE_SIGNATURE[c] * pulse)
                    + jitter[3 * i + c];
            }
            frame
        })
        .collect()
}

/// Generates a vertical shoulder/chest displacement trace in pixel units.
///
/// `baseline + amplitude * sin(2π f t)` with `f = breaths_per_minute / 60`.
pub fn breathing_displacement(
    breaths_per_minute: f64,
    duration: f64,
    sample_rate: f64,
    baseline: f64,
    amplitude: f64,
) -> Vec<f64> {
    sine_wave(breaths_per_minute / 60.0, duration, sample_rate, amplitude)
        .into_iter()
        .map(|y| baseline + y)
        .collect()
}

//! IIR (Infinite Impulse Response) band-pass filtering.
//!
//! This module designs digital Butterworth band-pass filters and applies them
//! either causally ([`IirFilter`], [`lfilter`]) or zero-phase ([`filtfilt`],
//! [`bandpass_filter`]).
//!
//! ## Design
//!
//! The analog Butterworth prototype of order `N` has its poles evenly spaced on
//! the left half of the unit circle. It is transformed to a band-pass response
//! around the pre-warped cutoffs, giving `2N` poles and `N` zeros at the origin,
//! then mapped to the z-plane with the bilinear transform. Zeros at infinity map
//! to `z = -1`, zeros at the origin map to `z = 1`. Finally the zeros and poles
//! are either expanded into numerator/denominator polynomials
//! ([`design_butterworth_bandpass`]) or grouped into conjugate pairs, one biquad
//! per pair ([`design_butterworth_bandpass_sos`]). The expanded form loses
//! precision as the order grows and the band moves towards 0 Hz, until its
//! denominator is no longer stable; [`bandpass_filter`] always uses sections.
//!
//! ## Zero-phase application
//!
//! [`filtfilt`] and [`sosfiltfilt`] run the filter forward, then backward over
//! the reversed result.
//! The combined response is `|H(f)|²` with no phase shift, so peak positions in
//! the output line up with the input. Edge transients are suppressed by extending
//! the signal with an odd reflection of `3 * max(len(a), len(b))` samples on each
//! side and starting both passes from the filter's steady-state initial conditions.

use std::f64::consts::PI;

use num_complex::Complex64;
use tracing::debug;

use crate::operations::types::FilterParams;
use crate::{VitalsError, VitalsResult};

/// Numerator/denominator coefficients of a digital filter.
///
/// Coefficients are in descending powers of `z⁻¹` and normalised so that `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    /// Feed-forward coefficients (b coefficients)
    pub b: Vec<f64>,
    /// Feed-back coefficients (a coefficients)
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    /// Create coefficients, normalising by `a[0]`.
    ///
    /// # Errors
    ///
    /// Fails if either vector is empty or `a[0]` is zero or non-finite.
    pub fn new(b: Vec<f64>, a: Vec<f64>) -> VitalsResult<Self> {
        if b.is_empty() || a.is_empty() {
            return Err(VitalsError::invalid_filter_design(
                "filter coefficients must not be empty",
            ));
        }

        let a0 = a[0];
        if a0 == 0.0 || !a0.is_finite() {
            return Err(VitalsError::invalid_filter_design(
                "leading denominator coefficient must be finite and non-zero",
            ));
        }

        Ok(Self {
            b: b.into_iter().map(|x| x / a0).collect(),
            a: a.into_iter().map(|x| x / a0).collect(),
        })
    }

    /// Length of the filter state (`max(len(a), len(b)) - 1`).
    pub fn state_len(&self) -> usize {
        self.b.len().max(self.a.len()) - 1
    }

    /// Number of samples added on each side by [`filtfilt`].
    pub fn pad_len(&self) -> usize {
        3 * self.b.len().max(self.a.len())
    }

    /// Whether every root of `a` lies strictly inside the unit circle.
    ///
    /// Runs the Schur-Cohn step-down recursion: the filter is stable exactly
    /// when every reflection coefficient has magnitude below one.
    pub fn is_stable(&self) -> bool {
        let mut poly = self.a.clone();
        while poly.len() > 1 {
            let m = poly.len() - 1;
            let k = poly[m] / poly[0];
            if !k.is_finite() || k.abs() >= 1.0 {
                return false;
            }
            let denom = 1.0 - k * k;
            poly = (0..m).map(|i| (poly[i] - k * poly[m - i]) / denom).collect();
        }
        true
    }

    /// Both coefficient vectors zero-padded to the same length.
    fn padded(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.b.len().max(self.a.len());
        let mut b = self.b.clone();
        let mut a = self.a.clone();
        b.resize(n, 0.0);
        a.resize(n, 0.0);
        (b, a)
    }
}

/// IIR filter implementation with internal state.
///
/// Uses the transposed direct form II, so the state vector has
/// `max(len(a), len(b)) - 1` entries and can be seeded with initial conditions.
#[derive(Debug, Clone)]
pub struct IirFilter {
    /// Feed-forward coefficients (b coefficients)
    pub b_coeffs: Vec<f64>,
    /// Feed-back coefficients (a coefficients), `a[0] == 1`
    pub a_coeffs: Vec<f64>,
    /// Transposed direct form II delay line
    pub state: Vec<f64>,
}

impl IirFilter {
    /// Create a new IIR filter with zeroed state.
    pub fn new(coefficients: &FilterCoefficients) -> Self {
        let (b_coeffs, a_coeffs) = coefficients.padded();
        let state = vec![0.0; b_coeffs.len() - 1];

        Self {
            b_coeffs,
            a_coeffs,
            state,
        }
    }

    /// Create a new IIR filter starting from the given state.
    ///
    /// # Errors
    ///
    /// Fails if `state` doesn't have [`FilterCoefficients::state_len`] entries.
    pub fn with_state(coefficients: &FilterCoefficients, state: Vec<f64>) -> VitalsResult<Self> {
        let mut filter = Self::new(coefficients);
        if state.len() != filter.state.len() {
            return Err(VitalsError::DimensionMismatch(format!(
                "filter state must have {} entries, got {}",
                filter.state.len(),
                state.len()
            )));
        }
        filter.state = state;
        Ok(filter)
    }

    /// Process a single sample through the filter.
    ///
    /// ```text
    /// y[n]   = b[0]*x[n] + z[0]
    /// z[i]   = b[i+1]*x[n] - a[i+1]*y[n] + z[i+1]
    /// z[N-1] = b[N]*x[n] - a[N]*y[n]
    /// ```
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let output = self.b_coeffs[0] * input + self.state.first().copied().unwrap_or(0.0);

        let order = self.state.len();
        for i in 0..order {
            let next = if i + 1 < order { self.state[i + 1] } else { 0.0 };
            self.state[i] = self.b_coeffs[i + 1] * input - self.a_coeffs[i + 1] * output + next;
        }

        output
    }

    /// Process a slice of samples through the filter.
    pub fn process_samples(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Reset the filter's internal state.
    pub fn reset(&mut self) {
        self.state.fill(0.0);
    }

    /// Get the frequency response at specified frequencies.
    ///
    /// Returns (magnitude, phase) response vectors.
    pub fn frequency_response(
        &self,
        frequencies: &[f64],
        sample_rate: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut magnitudes = Vec::with_capacity(frequencies.len());
        let mut phases = Vec::with_capacity(frequencies.len());

        for &freq in frequencies {
            let omega = 2.0 * PI * freq / sample_rate;
            let z_inv = Complex64::from_polar(1.0, -omega);

            let numerator = evaluate_polynomial(&self.b_coeffs, z_inv);
            let denominator = evaluate_polynomial(&self.a_coeffs, z_inv);

            let h = numerator / denominator;
            magnitudes.push(h.norm());
            phases.push(h.arg());
        }

        (magnitudes, phases)
    }
}

/// Evaluate `c[0] + c[1]*x + c[2]*x² + ...` with Horner's scheme.
fn evaluate_polynomial(coeffs: &[f64], x: Complex64) -> Complex64 {
    coeffs
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * x + c)
}

/// A cascade of biquads applied one after another.
///
/// Equivalent to the product of the sections' transfer functions, but each
/// section only carries one pole pair, so rounding in one section can't move
/// the poles of another.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondOrderSections {
    /// Biquads in application order, three `b` and three `a` coefficients each
    pub sections: Vec<FilterCoefficients>,
}

impl SecondOrderSections {
    /// Number of samples added on each side by [`sosfiltfilt`].
    ///
    /// Matches [`FilterCoefficients::pad_len`] of the expanded filter,
    /// `3 * (2 * sections + 1)`.
    pub fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Whether every section is stable.
    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(FilterCoefficients::is_stable)
    }

    /// Get the frequency response of the whole cascade.
    ///
    /// Returns (magnitude, phase) response vectors.
    pub fn frequency_response(
        &self,
        frequencies: &[f64],
        sample_rate: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        frequencies
            .iter()
            .map(|&freq| {
                let z_inv = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
                let h = self
                    .sections
                    .iter()
                    .fold(Complex64::new(1.0, 0.0), |acc, section| {
                        acc * evaluate_polynomial(&section.b, z_inv)
                            / evaluate_polynomial(&section.a, z_inv)
                    });
                (h.norm(), h.arg())
            })
            .unzip()
    }
}

/// Zeros, poles and gain of a digital filter.
struct ZeroPoleGain {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

/// Design a digital Butterworth band-pass filter.
///
/// # Arguments
/// * `order` - Order of the analog low-pass prototype; the band-pass filter has `2 * order` poles
/// * `lowcut` - Lower -3 dB frequency in Hz
/// * `highcut` - Upper -3 dB frequency in Hz
/// * `sample_rate` - Sample rate in Hz
///
/// # Errors
///
/// Returns [`VitalsError::InvalidFilterDesign`] when `order == 0`, the sample
/// rate isn't positive, either cutoff is non-positive, `lowcut >= highcut`, or
/// either cutoff is at or above Nyquist. High orders with cutoffs close to 0 Hz
/// also fail: the expanded denominator loses its poles to rounding and is
/// rejected as unstable. [`design_butterworth_bandpass_sos`] has no such limit.
pub fn design_butterworth_bandpass(
    order: usize,
    lowcut: f64,
    highcut: f64,
    sample_rate: f64,
) -> VitalsResult<FilterCoefficients> {
    let zpk = butterworth_bandpass_zpk(order, lowcut, highcut, sample_rate)?;

    let b: Vec<f64> = poly(&zpk.zeros).into_iter().map(|c| c.re * zpk.gain).collect();
    let a: Vec<f64> = poly(&zpk.poles).into_iter().map(|c| c.re).collect();
    let coefficients = FilterCoefficients::new(b, a)?;

    if !coefficients.is_stable() {
        return Err(VitalsError::invalid_filter_design(format!(
            "order {order} band-pass {lowcut}-{highcut} Hz is numerically unstable \
             as a single transfer function at {sample_rate} Hz"
        )));
    }

    debug!(order, lowcut, highcut, sample_rate, "designed Butterworth band-pass");
    Ok(coefficients)
}

/// Design a digital Butterworth band-pass filter as cascaded second-order sections.
///
/// Each conjugate pole pair becomes one biquad with zeros at `z = 1` and
/// `z = -1`; the overall gain sits on the first section. The cascade has the
/// same response as [`design_butterworth_bandpass`] but stays accurate when
/// the poles crowd around `z = 1`.
///
/// # Errors
///
/// Returns [`VitalsError::InvalidFilterDesign`] for the parameter conditions
/// of [`design_butterworth_bandpass`], or for a pole on or outside the unit circle.
pub fn design_butterworth_bandpass_sos(
    order: usize,
    lowcut: f64,
    highcut: f64,
    sample_rate: f64,
) -> VitalsResult<SecondOrderSections> {
    let zpk = butterworth_bandpass_zpk(order, lowcut, highcut, sample_rate)?;

    if let Some(unstable) = zpk.poles.iter().find(|p| p.norm() >= 1.0) {
        return Err(VitalsError::invalid_filter_design(format!(
            "designed pole {unstable} lies on or outside the unit circle"
        )));
    }

    let denominators = pair_poles(&zpk.poles)?;
    let mut sections = Vec::with_capacity(denominators.len());
    for (i, a) in denominators.into_iter().enumerate() {
        let scale = if i == 0 { zpk.gain } else { 1.0 };
        sections.push(FilterCoefficients::new(
            vec![scale, 0.0, -scale],
            a.to_vec(),
        )?);
    }

    debug!(
        order,
        lowcut,
        highcut,
        sample_rate,
        sections = sections.len(),
        "designed Butterworth band-pass sections"
    );
    Ok(SecondOrderSections { sections })
}

fn butterworth_bandpass_zpk(
    order: usize,
    lowcut: f64,
    highcut: f64,
    sample_rate: f64,
) -> VitalsResult<ZeroPoleGain> {
    if order == 0 {
        return Err(VitalsError::invalid_filter_design(
            "Filter order must be greater than 0",
        ));
    }

    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(VitalsError::invalid_filter_design(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }

    let nyquist = sample_rate / 2.0;
    let low = lowcut / nyquist;
    let high = highcut / nyquist;

    if !(low.is_finite() && high.is_finite()) || low <= 0.0 || high <= 0.0 {
        return Err(VitalsError::invalid_filter_design(format!(
            "cutoffs must be positive, got {lowcut} Hz and {highcut} Hz"
        )));
    }
    if low >= high {
        return Err(VitalsError::invalid_filter_design(format!(
            "lowcut ({lowcut} Hz) must be below highcut ({highcut} Hz)"
        )));
    }
    if high >= 1.0 {
        return Err(VitalsError::invalid_filter_design(format!(
            "highcut ({highcut} Hz) must be below Nyquist ({nyquist} Hz)"
        )));
    }

    // Work at a normalised sample rate of 2, so Nyquist is 1.
    let fs = 2.0;
    let warped_low = 2.0 * fs * (PI * low / fs).tan();
    let warped_high = 2.0 * fs * (PI * high / fs).tan();
    let bandwidth = warped_high - warped_low;
    let centre = (warped_low * warped_high).sqrt();

    // Analog Butterworth prototype: p_k = -exp(iπm/2N), m = -N+1, -N+3, ..., N-1
    let n = order as f64;
    let prototype = (0..order).map(|k| {
        let m = -n + 1.0 + 2.0 * k as f64;
        -Complex64::from_polar(1.0, PI * m / (2.0 * n))
    });

    // Low-pass to band-pass: each pole splits into two, N zeros land at the origin.
    let mut analog_poles = Vec::with_capacity(2 * order);
    let mut lower_branch = Vec::with_capacity(order);
    for p in prototype {
        let scaled = p * (bandwidth / 2.0);
        let offset = (scaled * scaled - centre * centre).sqrt();
        analog_poles.push(scaled + offset);
        lower_branch.push(scaled - offset);
    }
    analog_poles.extend(lower_branch);
    let analog_gain = bandwidth.powi(order as i32);

    // Bilinear transform.
    let fs2 = Complex64::new(2.0 * fs, 0.0);
    let poles: Vec<Complex64> = analog_poles
        .iter()
        .map(|&p| (fs2 + p) / (fs2 - p))
        .collect();
    let mut zeros = vec![Complex64::new(1.0, 0.0); order];
    zeros.extend(std::iter::repeat_n(Complex64::new(-1.0, 0.0), order));

    let pole_product = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let zero_product = fs2.powi(order as i32);
    let gain = analog_gain * (zero_product / pole_product).re;

    Ok(ZeroPoleGain { zeros, poles, gain })
}

/// Group poles into real second-order denominators `[1, a1, a2]`.
///
/// Complex poles pair with their conjugates, real poles pair with each other.
/// Sections are ordered by pole radius, the poles nearest the unit circle last.
fn pair_poles(poles: &[Complex64]) -> VitalsResult<Vec<[f64; 3]>> {
    const IMAG_TOL: f64 = 1e-10;

    let mut upper: Vec<Complex64> = poles.iter().filter(|p| p.im > IMAG_TOL).copied().collect();
    let lower = poles.iter().filter(|p| p.im < -IMAG_TOL).count();
    let mut real: Vec<f64> = poles
        .iter()
        .filter(|p| p.im.abs() <= IMAG_TOL)
        .map(|p| p.re)
        .collect();

    if upper.len() != lower || real.len() % 2 != 0 {
        return Err(VitalsError::invalid_filter_design(
            "poles do not form conjugate pairs",
        ));
    }

    upper.sort_by(|a, b| a.norm().total_cmp(&b.norm()));
    real.sort_by(|a, b| a.abs().total_cmp(&b.abs()));

    let mut sections: Vec<[f64; 3]> = upper
        .iter()
        .map(|p| [1.0, -2.0 * p.re, p.norm_sqr()])
        .collect();
    sections.extend(real.chunks_exact(2).map(|r| [1.0, -(r[0] + r[1]), r[0] * r[1]]));
    sections.sort_by(|a, b| a[2].abs().total_cmp(&b[2].abs()));

    Ok(sections)
}

/// Expand a set of roots into polynomial coefficients, highest power first.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

/// Filter a signal once, forward in time.
///
/// # Arguments
/// * `coefficients` - Filter to apply
/// * `input` - Samples to filter
/// * `initial_state` - Optional initial delay line, [`FilterCoefficients::state_len`] entries
pub fn lfilter(
    coefficients: &FilterCoefficients,
    input: &[f64],
    initial_state: Option<&[f64]>,
) -> VitalsResult<Vec<f64>> {
    let mut filter = match initial_state {
        Some(state) => IirFilter::with_state(coefficients, state.to_vec())?,
        None => IirFilter::new(coefficients),
    };
    Ok(filter.process_samples(input))
}

/// Steady-state initial conditions for the step response of a filter.
///
/// Scaling the result by the first input sample starts [`lfilter`] as if the
/// signal had been constant at that value forever, which removes the start-up
/// transient. Solves `(I - Aᵀ) zi = b[1:] - a[1:] * b[0]` where `A` is the
/// companion matrix of `a`.
///
/// # Errors
///
/// Fails if the system is singular, which happens when the filter has a pole at `z = 1`.
pub fn lfilter_zi(coefficients: &FilterCoefficients) -> VitalsResult<Vec<f64>> {
    let (b, a) = coefficients.padded();
    let n = b.len() - 1;
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut matrix = vec![vec![0.0; n]; n];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[i] = 1.0;
        row[0] += a[i + 1];
        if i + 1 < n {
            row[i + 1] -= 1.0;
        }
    }
    let rhs: Vec<f64> = (0..n).map(|i| b[i + 1] - a[i + 1] * b[0]).collect();

    solve_linear_system(matrix, rhs).ok_or_else(|| {
        VitalsError::invalid_filter_design("cannot compute steady-state initial conditions")
    })
}

/// Gaussian elimination with partial pivoting. `None` if the matrix is singular.
fn solve_linear_system(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            matrix[i][col]
                .abs()
                .partial_cmp(&matrix[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if matrix[pivot][col].abs() < f64::EPSILON {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..n {
            let factor = matrix[row][col] / matrix[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }

    solution.iter().all(|x| x.is_finite()).then_some(solution)
}

/// Apply a filter forward and backward for zero phase distortion.
///
/// # Errors
///
/// Returns [`VitalsError::InvalidFilterDesign`] if the input isn't longer than
/// [`FilterCoefficients::pad_len`] samples, or if the output is not finite.
pub fn filtfilt(coefficients: &FilterCoefficients, input: &[f64]) -> VitalsResult<Vec<f64>> {
    let zi = lfilter_zi(coefficients)?;
    zero_phase(input, coefficients.pad_len(), |signal, x0| {
        let state: Vec<f64> = zi.iter().map(|&z| z * x0).collect();
        lfilter(coefficients, signal, Some(&state))
    })
}

/// Filter a signal once through every section of a cascade.
///
/// # Arguments
/// * `sos` - Sections to apply, in order
/// * `input` - Samples to filter
/// * `initial_state` - Optional delay line per section, as from [`sosfilt_zi`]
pub fn sosfilt(
    sos: &SecondOrderSections,
    input: &[f64],
    initial_state: Option<&[Vec<f64>]>,
) -> VitalsResult<Vec<f64>> {
    if let Some(states) = initial_state {
        if states.len() != sos.sections.len() {
            return Err(VitalsError::DimensionMismatch(format!(
                "expected one initial state per section ({}), got {}",
                sos.sections.len(),
                states.len()
            )));
        }
    }

    let mut output = input.to_vec();
    for (i, section) in sos.sections.iter().enumerate() {
        let state = initial_state.map(|states| states[i].as_slice());
        output = lfilter(section, &output, state)?;
    }
    Ok(output)
}

/// Steady-state initial conditions of a cascade for a unit step.
///
/// Each section's [`lfilter_zi`] is scaled by the DC gain of the sections
/// before it.
///
/// # Errors
///
/// Fails if any section has a pole at `z = 1`.
pub fn sosfilt_zi(sos: &SecondOrderSections) -> VitalsResult<Vec<Vec<f64>>> {
    let mut scale = 1.0;
    let mut states: Vec<Vec<f64>> = Vec::with_capacity(sos.sections.len());
    for section in &sos.sections {
        let zi = lfilter_zi(section)?;
        states.push(zi.iter().map(|z| z * scale).collect());
        scale *= section.b.iter().sum::<f64>() / section.a.iter().sum::<f64>();
    }
    Ok(states)
}

/// [`filtfilt`] over a cascade of second-order sections.
///
/// # Errors
///
/// Returns [`VitalsError::InvalidFilterDesign`] if the input isn't longer than
/// [`SecondOrderSections::pad_len`] samples, or if the output is not finite.
pub fn sosfiltfilt(sos: &SecondOrderSections, input: &[f64]) -> VitalsResult<Vec<f64>> {
    let zi = sosfilt_zi(sos)?;
    zero_phase(input, sos.pad_len(), |signal, x0| {
        let states: Vec<Vec<f64>> = zi
            .iter()
            .map(|section| section.iter().map(|&z| z * x0).collect())
            .collect();
        sosfilt(sos, signal, Some(&states))
    })
}

/// Run `pass` forward then backward over an odd extension of `input`.
///
/// `pass` receives the samples and the first sample, to scale its
/// steady-state initial conditions.
fn zero_phase<F>(input: &[f64], edge: usize, pass: F) -> VitalsResult<Vec<f64>>
where
    F: Fn(&[f64], f64) -> VitalsResult<Vec<f64>>,
{
    if input.len() <= edge {
        return Err(VitalsError::invalid_filter_design(format!(
            "signal of {} samples is too short for zero-phase filtering, need more than {edge}",
            input.len()
        )));
    }

    let extended = odd_extension(input, edge);
    let mut forward = pass(&extended, extended[0])?;

    forward.reverse();
    let mut backward = pass(&forward, forward[0])?;
    backward.reverse();

    let output = backward[edge..backward.len() - edge].to_vec();
    if output.iter().any(|x| !x.is_finite()) {
        return Err(VitalsError::invalid_filter_design(
            "filter is numerically unstable for this signal",
        ));
    }

    Ok(output)
}

/// Extend a signal at both ends by point reflection about its end samples.
///
/// Requires `edge < input.len()`.
fn odd_extension(input: &[f64], edge: usize) -> Vec<f64> {
    let n = input.len();
    let first = input[0];
    let last = input[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * edge);
    extended.extend((1..=edge).rev().map(|i| 2.0 * first - input[i]));
    extended.extend_from_slice(input);
    extended.extend((1..=edge).map(|i| 2.0 * last - input[n - 1 - i]));
    extended
}

/// Apply a zero-phase Butterworth band-pass filter to a sample sequence.
///
/// Normalised cutoffs are `lowcut / (sample_rate / 2)` and `highcut / (sample_rate / 2)`.
/// The filter runs as second-order sections through [`sosfiltfilt`]. The output
/// has the same length as the input.
///
/// # Errors
///
/// Returns [`VitalsError::InvalidFilterDesign`] for any of the conditions in
/// [`design_butterworth_bandpass_sos`] and [`sosfiltfilt`].
///
/// # Examples
///
/// ```rust
/// use vitals_dsp::operations::iir_filtering::bandpass_filter;
/// use vitals_dsp::sine_wave;
///
/// let signal = sine_wave(1.2, 10.0, 30.0, 1.0);
/// let filtered = bandpass_filter(&signal, 0.8, 2.5, 30.0, 4).unwrap();
/// assert_eq!(filtered.len(), signal.len());
///
/// assert!(bandpass_filter(&signal, 2.5, 0.8, 30.0, 4).is_err());
/// ```
pub fn bandpass_filter(
    samples: &[f64],
    lowcut: f64,
    highcut: f64,
    sample_rate: f64,
    order: usize,
) -> VitalsResult<Vec<f64>> {
    let sos = design_butterworth_bandpass_sos(order, lowcut, highcut, sample_rate)?;
    sosfiltfilt(&sos, samples)
}

/// [`bandpass_filter`] with the cutoffs and order taken from [`FilterParams`].
pub fn bandpass_filter_with(
    samples: &[f64],
    params: &FilterParams,
    sample_rate: f64,
) -> VitalsResult<Vec<f64>> {
    bandpass_filter(samples, params.lowcut, params.highcut, sample_rate, params.order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generation::{breathing_displacement, sine_wave};
    use approx_eq::assert_approx_eq;

    const FS: f64 = 30.0;

    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|x| x * x).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn test_design_coefficient_lengths() {
        for order in 1..=6 {
            let coeffs = design_butterworth_bandpass(order, 0.8, 2.5, FS).unwrap();
            assert_eq!(coeffs.b.len(), 2 * order + 1);
            assert_eq!(coeffs.a.len(), 2 * order + 1);
            assert_eq!(coeffs.a[0], 1.0);
            assert_eq!(coeffs.pad_len(), 3 * (2 * order + 1));
        }
    }

    #[test]
    fn test_second_order_section_matches_closed_form() {
        // Order 1 band-pass is a single biquad: b = [g, 0, -g]
        let coeffs = design_butterworth_bandpass(1, 0.8, 2.5, FS).unwrap();
        assert!(coeffs.b[1].abs() < 1e-12);
        assert_approx_eq!(coeffs.b[0], -coeffs.b[2], 1e-9);
    }

    #[test]
    fn test_frequency_response_band_edges() {
        let coeffs = design_butterworth_bandpass(4, 0.8, 2.5, FS).unwrap();
        let filter = IirFilter::new(&coeffs);

        let (mags, _) = filter.frequency_response(&[0.8, 1.5, 2.5, 0.2, 8.0], FS);
        let half_power = std::f64::consts::FRAC_1_SQRT_2;

        assert_approx_eq!(mags[0], half_power, 1e-3);
        assert!(mags[1] > 0.99 && mags[1] < 1.01);
        assert_approx_eq!(mags[2], half_power, 1e-3);
        assert!(mags[3] < 0.01, "0.2 Hz should be rejected, got {}", mags[3]);
        assert!(mags[4] < 0.01, "8 Hz should be rejected, got {}", mags[4]);
    }

    #[test]
    fn test_design_validation() {
        assert!(design_butterworth_bandpass(4, 2.5, 0.8, FS).is_err());
        assert!(design_butterworth_bandpass(4, 1.0, 1.0, FS).is_err());
        assert!(design_butterworth_bandpass(4, 0.0, 2.5, FS).is_err());
        assert!(design_butterworth_bandpass(4, -1.0, 2.5, FS).is_err());
        assert!(design_butterworth_bandpass(4, 0.8, 15.0, FS).is_err());
        assert!(design_butterworth_bandpass(4, 0.8, 20.0, FS).is_err());
        assert!(design_butterworth_bandpass(0, 0.8, 2.5, FS).is_err());
        assert!(design_butterworth_bandpass(4, 0.8, 2.5, 0.0).is_err());

        let err = design_butterworth_bandpass(4, 2.5, 0.8, FS).unwrap_err();
        assert!(err.is_filter_error());
    }

    #[test]
    fn test_lfilter_zi_removes_step_transient() {
        let coeffs = design_butterworth_bandpass(2, 0.8, 2.5, FS).unwrap();
        let zi = lfilter_zi(&coeffs).unwrap();
        assert_eq!(zi.len(), coeffs.state_len());

        // A band-pass filter started in steady state outputs ~0 for a constant input.
        let constant = vec![5.0; 50];
        let state: Vec<f64> = zi.iter().map(|z| z * 5.0).collect();
        let output = lfilter(&coeffs, &constant, Some(&state)).unwrap();
        assert!(output.iter().all(|y| y.abs() < 1e-9));
    }

    #[test]
    fn test_lfilter_rejects_wrong_state_length() {
        let coeffs = design_butterworth_bandpass(2, 0.8, 2.5, FS).unwrap();
        assert!(lfilter(&coeffs, &[1.0, 2.0], Some(&[0.0])).is_err());
    }

    #[test]
    fn test_bandpass_preserves_length_and_passes_in_band_tone() {
        let signal = sine_wave(1.5, 20.0, FS, 1.0);
        let filtered = bandpass_filter(&signal, 0.8, 2.5, FS, 4).unwrap();
        assert_eq!(filtered.len(), signal.len());

        let middle = &filtered[150..450];
        assert!((rms(middle) - rms(&signal[150..450])).abs() < 0.02);
    }

    #[test]
    fn test_bandpass_rejects_out_of_band_tones() {
        let slow = sine_wave(0.1, 20.0, FS, 1.0);
        let fast = sine_wave(8.0, 20.0, FS, 1.0);
        let tone = sine_wave(1.5, 20.0, FS, 0.5);
        let mixed: Vec<f64> = slow
            .iter()
            .zip(&fast)
            .zip(&tone)
            .map(|((a, b), c)| a + b + c + 100.0)
            .collect();

        let filtered = bandpass_filter(&mixed, 0.8, 2.5, FS, 4).unwrap();
        let residual: Vec<f64> = filtered[150..450]
            .iter()
            .zip(&tone[150..450])
            .map(|(y, t)| y - t)
            .collect();

        assert!(rms(&residual) < 0.05, "residual rms {}", rms(&residual));
    }

    #[test]
    fn test_zero_phase_symmetric_pulse() {
        let centre = 150usize;
        let sigma = 5.0;
        let pulse: Vec<f64> = (0..300)
            .map(|i| {
                let d = i as f64 - centre as f64;
                (-d * d / (2.0 * sigma * sigma)).exp()
            })
            .collect();

        let filtered = bandpass_filter(&pulse, 0.5, 3.0, FS, 4).unwrap();
        let peak = filtered
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        assert!(peak.abs_diff(centre) <= 1, "peak moved to {peak}");
    }

    #[test]
    fn test_short_signal_is_rejected() {
        // Order 4 band-pass has 9 coefficients, so 27 samples of padding are required.
        let signal = sine_wave(1.2, 0.9, FS, 1.0);
        assert_eq!(signal.len(), 27);
        assert!(bandpass_filter(&signal, 0.8, 2.5, FS, 4).is_err());

        let signal = sine_wave(1.2, 28.0 / FS, FS, 1.0);
        assert!(bandpass_filter(&signal, 0.8, 2.5, FS, 4).is_ok());

        assert!(bandpass_filter(&[], 0.8, 2.5, FS, 4).is_err());
    }

    #[test]
    fn test_streaming_filter_matches_lfilter() {
        let coeffs = design_butterworth_bandpass(3, 0.8, 2.5, FS).unwrap();
        let signal = sine_wave(1.0, 2.0, FS, 1.0);

        let batch = lfilter(&coeffs, &signal, None).unwrap();
        let mut filter = IirFilter::new(&coeffs);
        let streamed: Vec<f64> = signal.iter().map(|&x| filter.process_sample(x)).collect();
        assert_eq!(batch, streamed);

        filter.reset();
        assert!(filter.state.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn test_stability_check() {
        let stable = |a: Vec<f64>| FilterCoefficients::new(vec![1.0], a).unwrap().is_stable();

        assert!(stable(vec![1.0, -0.5]));
        assert!(stable(vec![1.0, -1.8, 0.81])); // double pole at 0.9
        assert!(!stable(vec![1.0, -2.0]));
        assert!(!stable(vec![1.0, -2.2, 1.21])); // double pole at 1.1
        assert!(!stable(vec![1.0, -2.0, 1.0])); // double pole at 1
    }

    #[test]
    fn test_sos_design_sections() {
        for order in 1..=8 {
            let sos = design_butterworth_bandpass_sos(order, 0.8, 2.5, FS).unwrap();
            assert_eq!(sos.sections.len(), order);
            assert!(sos.is_stable());
            assert_eq!(sos.pad_len(), 3 * (2 * order + 1));
            for section in &sos.sections {
                assert_eq!(section.b.len(), 3);
                assert_eq!(section.a.len(), 3);
                assert_eq!(section.b[1], 0.0);
            }
        }
    }

    #[test]
    fn test_sos_matches_expanded_response() {
        let freqs = [0.2, 0.8, 1.2, 2.0, 2.5, 5.0, 10.0];
        for order in [1, 3, 4] {
            let coeffs = design_butterworth_bandpass(order, 0.8, 2.5, FS).unwrap();
            let (expanded, _) = IirFilter::new(&coeffs).frequency_response(&freqs, FS);
            let (cascaded, _) = design_butterworth_bandpass_sos(order, 0.8, 2.5, FS)
                .unwrap()
                .frequency_response(&freqs, FS);

            for (e, c) in expanded.iter().zip(&cascaded) {
                assert_approx_eq!(*e + 1.0, *c + 1.0, 1e-9);
            }
        }
    }

    #[test]
    fn test_wide_band_with_real_poles() {
        // A band wider than ~5.8x its lower edge splits odd-order prototype poles
        // into real pairs.
        let sos = design_butterworth_bandpass_sos(3, 0.1, 2.0, FS).unwrap();
        assert_eq!(sos.sections.len(), 3);
        assert!(sos.is_stable());

        let (mags, _) = sos.frequency_response(&[0.1, 2.0], FS);
        let half_power = std::f64::consts::FRAC_1_SQRT_2;
        assert_approx_eq!(mags[0], half_power, 1e-3);
        assert_approx_eq!(mags[1], half_power, 1e-3);
    }

    #[test]
    fn test_high_order_band_near_dc_stays_bounded() {
        let amplitude = 5.0;
        let breathing = breathing_displacement(12.0, 60.0, FS, 240.0, amplitude);

        // Expanded into a single polynomial, this filter has poles outside the unit circle.
        assert!(design_butterworth_bandpass(8, 0.05, 0.4, FS).is_err());

        let filtered = bandpass_filter(&breathing, 0.05, 0.4, FS, 8).unwrap();
        let peak = filtered.iter().fold(0.0_f64, |m, y| m.max(y.abs()));
        assert!(peak < 2.0 * amplitude, "peak {peak} from amplitude {amplitude}");
        assert!(peak > 0.5 * amplitude, "peak {peak} from amplitude {amplitude}");
    }

    #[test]
    fn test_sosfilt_zi_removes_step_transient() {
        let sos = design_butterworth_bandpass_sos(4, 0.8, 2.5, FS).unwrap();
        let zi = sosfilt_zi(&sos).unwrap();
        assert_eq!(zi.len(), 4);

        let constant = vec![5.0; 50];
        let states: Vec<Vec<f64>> = zi
            .iter()
            .map(|section| section.iter().map(|z| z * 5.0).collect())
            .collect();
        let output = sosfilt(&sos, &constant, Some(&states)).unwrap();
        assert!(output.iter().all(|y| y.abs() < 1e-9));

        assert!(sosfilt(&sos, &constant, Some(&states[..2])).is_err());
    }

    #[test]
    fn test_all_supported_orders_are_stable() {
        let signal = sine_wave(1.2, 10.0, FS, 1.0);
        for order in 2..=8 {
            let filtered = bandpass_filter(&signal, 0.6, 3.0, FS, order).unwrap();
            assert!(filtered.iter().all(|x| x.is_finite()));
            assert!(rms(&filtered[100..200]) > 0.5);
        }
    }
}

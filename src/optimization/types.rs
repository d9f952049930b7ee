//! Configuration and search-space types for the Cat Swarm Optimizer.

use serde::{Deserialize, Serialize};

use crate::{ParameterError, VitalsError, VitalsResult};

/// Tuning knobs for [`CatSwarmOptimizer`](crate::optimization::CatSwarmOptimizer).
///
/// The defaults are small enough to tune a filter on a few seconds of signal
/// within an interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatSwarmConfig {
    /// Number of cats (population size)
    pub n_cats: usize,
    /// Number of iterations; the optimizer always runs all of them
    pub max_iter: usize,
    /// Probability that a cat seeks rather than tracks in a given iteration
    pub mixture_ratio: f64,
    /// Seeking range per dimension, as a fraction of that dimension's bound width
    pub srd: f64,
    /// Seeking memory pool: candidate positions generated per seeking cat
    pub smp: usize,
    /// Per-component velocity limit for tracking cats
    pub max_velocity: f64,
    /// RNG seed; `None` seeds from operating-system entropy
    pub seed: Option<u64>,
}

impl CatSwarmConfig {
    /// Create the default configuration.
    pub const fn new() -> Self {
        Self {
            n_cats: 12,
            max_iter: 25,
            mixture_ratio: 0.5,
            srd: 0.2,
            smp: 5,
            max_velocity: 0.1,
            seed: None,
        }
    }

    /// A cheaper configuration for short buffers or repeated re-tuning.
    pub const fn fast() -> Self {
        Self {
            n_cats: 8,
            max_iter: 10,
            smp: 3,
            ..Self::new()
        }
    }

    /// A more exhaustive search for offline tuning.
    pub const fn thorough() -> Self {
        Self {
            n_cats: 30,
            max_iter: 60,
            smp: 8,
            ..Self::new()
        }
    }

    /// Same configuration with a fixed RNG seed.
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> VitalsResult<()> {
        if self.n_cats == 0 {
            return Err(ParameterError::invalid_value("n_cats", "must be > 0").into());
        }

        if self.max_iter == 0 {
            return Err(ParameterError::invalid_value("max_iter", "must be > 0").into());
        }

        if self.smp == 0 {
            return Err(ParameterError::invalid_value("smp", "must be > 0").into());
        }

        if !(0.0..=1.0).contains(&self.mixture_ratio) {
            return Err(ParameterError::out_of_range("mixture_ratio", self.mixture_ratio, 0.0, 1.0).into());
        }

        if !self.srd.is_finite() || self.srd <= 0.0 {
            return Err(ParameterError::invalid_value("srd", "must be positive").into());
        }

        if !self.max_velocity.is_finite() || self.max_velocity <= 0.0 {
            return Err(ParameterError::invalid_value("max_velocity", "must be positive").into());
        }

        Ok(())
    }
}

impl Default for CatSwarmConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-dimension `(min, max)` bounds of a search space.
///
/// Every position the optimizer evaluates lies inside these bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct SearchBounds {
    bounds: Vec<(f64, f64)>,
}

impl SearchBounds {
    /// Create bounds from `(min, max)` pairs.
    ///
    /// # Errors
    ///
    /// Fails if no dimension is given, or any pair is non-finite or has
    /// `min >= max`.
    pub fn new(bounds: Vec<(f64, f64)>) -> VitalsResult<Self> {
        if bounds.is_empty() {
            return Err(VitalsError::DimensionMismatch(
                "search bounds need at least one dimension".to_string(),
            ));
        }

        for (i, &(lo, hi)) in bounds.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(ParameterError::invalid_value(
                    format!("bounds[{i}]"),
                    format!("({lo}, {hi}) is not a finite range with min < max"),
                )
                .into());
            }
        }

        Ok(Self { bounds })
    }

    /// Search space for pulse filter tuning: lowcut, highcut and order.
    pub fn pulse_filter() -> Self {
        Self {
            bounds: vec![(0.6, 1.2), (2.0, 3.0), (2.0, 8.0)],
        }
    }

    /// Search space for respiration filter tuning: lowcut, highcut and order.
    pub fn respiration_filter() -> Self {
        Self {
            bounds: vec![(0.05, 0.2), (0.4, 1.0), (2.0, 8.0)],
        }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// The `(min, max)` pairs.
    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Width of each dimension.
    pub fn widths(&self) -> Vec<f64> {
        self.bounds.iter().map(|&(lo, hi)| hi - lo).collect()
    }

    /// Clamp a position into bounds, in place.
    pub fn clamp(&self, position: &mut [f64]) {
        for (x, &(lo, hi)) in position.iter_mut().zip(&self.bounds) {
            *x = x.clamp(lo, hi);
        }
    }

    /// Whether a position has the right dimension and lies inside the bounds.
    pub fn contains(&self, position: &[f64]) -> bool {
        position.len() == self.dim()
            && position
                .iter()
                .zip(&self.bounds)
                .all(|(&x, &(lo, hi))| (lo..=hi).contains(&x))
    }
}

impl TryFrom<Vec<(f64, f64)>> for SearchBounds {
    type Error = VitalsError;

    fn try_from(bounds: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(bounds)
    }
}

impl From<SearchBounds> for Vec<(f64, f64)> {
    fn from(bounds: SearchBounds) -> Self {
        bounds.bounds
    }
}

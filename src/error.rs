//! Error types and result utilities for vital-sign signal processing.

use thiserror::Error;

/// Convenience type alias for results that may contain a [`VitalsError`].
pub type VitalsResult<T> = Result<T, VitalsError>;

/// Error types that can occur while filtering, extracting or estimating vital signs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VitalsError {
    /// The requested band-pass filter cannot be designed or applied.
    ///
    /// Raised when the cutoffs are out of order, non-positive or at/above Nyquist,
    /// when the signal is too short for zero-phase filtering at the requested order,
    /// when a designed filter is unstable, or when filtering produced non-finite output.
    #[error("Invalid filter design: {reason}")]
    InvalidFilterDesign {
        /// Human-readable explanation of what was rejected.
        reason: String,
    },

    /// A configuration value failed validation.
    #[error("Invalid parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Array dimensions don't match expected values.
    ///
    /// This happens when RGB channels differ in length or a candidate position
    /// doesn't match the dimensionality of its bounds.
    #[error("Dimension mismatch error: {0}")]
    DimensionMismatch(String),
}

impl VitalsError {
    /// Create an [`VitalsError::InvalidFilterDesign`] error.
    pub fn invalid_filter_design(reason: impl Into<String>) -> Self {
        Self::InvalidFilterDesign {
            reason: reason.into(),
        }
    }

    /// Returns true if this error was raised by the band-pass filter.
    pub const fn is_filter_error(&self) -> bool {
        matches!(self, Self::InvalidFilterDesign { .. })
    }
}

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter holds a value that is not acceptable.
    #[error("invalid value for '{parameter}': {reason}")]
    InvalidValue {
        /// Name of the offending parameter.
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A numeric parameter lies outside its permitted range.
    #[error("'{parameter}' = {value} is outside the range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending parameter.
        parameter: String,
        /// The rejected value.
        value: f64,
        /// Inclusive lower limit.
        min: f64,
        /// Inclusive upper limit.
        max: f64,
    },
}

impl ParameterError {
    /// Create an [`ParameterError::InvalidValue`] error.
    pub fn invalid_value(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create an [`ParameterError::OutOfRange`] error.
    pub fn out_of_range(parameter: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            parameter: parameter.into(),
            value,
            min,
            max,
        }
    }
}

//! Error types for metric evaluation.
//!
//! Every failure surfaces synchronously from `initialize`, `value` or
//! `value_and_derivative`; none is retried inside the metric and no partial
//! value or derivative is returned alongside an error.

use thiserror::Error;

/// Main error type for registration metrics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// Invalid configuration (bin counts, kernel orders, ratios).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Evaluation requested before `initialize`.
    #[error("Metric has not been initialized")]
    Uninitialized,

    /// Too many samples mapped outside the moving image or mask.
    #[error(
        "Too many samples map outside moving image buffer: {valid} / {total} \
         (required ratio {required_ratio})"
    )]
    InsufficientSamples {
        valid: usize,
        total: usize,
        required_ratio: f64,
    },

    /// Numerical degeneracy detected (empty histogram mass, vanishing
    /// joint entropy, non-finite results).
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Dimension mismatch.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type for registration metrics.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a numerical degeneracy error.
    pub fn numerical_degeneracy(msg: impl Into<String>) -> Self {
        Self::NumericalDegeneracy(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }
}

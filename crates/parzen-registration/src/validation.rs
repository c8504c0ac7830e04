//! Validation utilities for metric evaluation.
//!
//! Input checks run at the evaluation entry points; output checks guard
//! against handing a NaN or infinite objective to the optimizer.

use parzen_core::SparseJacobian;
use crate::error::{RegistrationError, Result};

/// Validate the length and finiteness of a parameter vector.
pub fn validate_parameters(parameters: &[f64], expected: usize) -> Result<()> {
    if parameters.len() != expected {
        return Err(RegistrationError::dimension_mismatch(format!(
            "transform expects {expected} parameters, got {}",
            parameters.len()
        )));
    }
    if let Some(i) = parameters.iter().position(|p| !p.is_finite()) {
        return Err(RegistrationError::numerical_degeneracy(format!(
            "parameter {i} is not finite ({})",
            parameters[i]
        )));
    }
    Ok(())
}

/// Validate a sparse Jacobian against the spatial dimension and parameter count.
pub fn validate_jacobian(jacobian: &SparseJacobian, dimension: usize, parameters: usize) -> Result<()> {
    let block = jacobian.block();
    if block.nrows() != dimension || block.ncols() != jacobian.len() {
        return Err(RegistrationError::ShapeMismatch {
            expected: vec![dimension, jacobian.len()],
            actual: vec![block.nrows(), block.ncols()],
        });
    }
    if let Some(&mu) = jacobian.indices().iter().find(|&&mu| mu >= parameters) {
        return Err(RegistrationError::dimension_mismatch(format!(
            "Jacobian references parameter {mu}, transform has {parameters}"
        )));
    }
    Ok(())
}

/// Reject a non-finite metric value.
pub fn ensure_finite_value(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RegistrationError::numerical_degeneracy(format!(
            "metric value is not finite ({value})"
        )))
    }
}

/// Reject a derivative with any non-finite component.
pub fn ensure_finite_derivative(derivative: &[f64]) -> Result<()> {
    match derivative.iter().position(|d| !d.is_finite()) {
        Some(i) => Err(RegistrationError::numerical_degeneracy(format!(
            "derivative component {i} is not finite ({})",
            derivative[i]
        ))),
        None => Ok(()),
    }
}

//! Transform trait for parametric spatial transformations.

use nalgebra::DMatrix;
use crate::spatial::Point;

/// Non-zero part of a transform Jacobian at one point.
///
/// `block` has `D` rows and one column per entry of `indices`; column `k`
/// holds `∂T(x)/∂μ[indices[k]]`. Parameters not listed have a zero partial
/// derivative at this point. Free-form deformations touch only a handful of
/// their parameters per point, which keeps per-sample metric cost independent
/// of the total parameter count.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseJacobian {
    indices: Vec<usize>,
    block: DMatrix<f64>,
}

impl SparseJacobian {
    /// # Arguments
    /// * `indices` - Parameter indices with a non-zero partial derivative
    /// * `block` - Matrix of shape `[D, indices.len()]`
    pub fn new(indices: Vec<usize>, block: DMatrix<f64>) -> Self {
        Self { indices, block }
    }

    /// Dense Jacobian over all `block.ncols()` parameters.
    pub fn dense(block: DMatrix<f64>) -> Self {
        let indices = (0..block.ncols()).collect();
        Self { indices, block }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn block(&self) -> &DMatrix<f64> {
        &self.block
    }

    /// Number of non-zero parameters.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Parametric transform mapping fixed-image points into the moving image.
///
/// Parameters are passed explicitly on every call so that one transform
/// object can be evaluated at many parameter vectors (central differences,
/// line searches) without mutation.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality
pub trait Transform<const D: usize> {
    /// Length of the parameter vector.
    fn number_of_parameters(&self) -> usize;

    /// Map a fixed point. `None` marks the mapping as invalid for this point.
    fn transform_point(&self, parameters: &[f64], point: &Point<D>) -> Option<Point<D>>;

    /// Non-zero Jacobian entries with respect to the parameters at `point`.
    fn jacobian(&self, parameters: &[f64], point: &Point<D>) -> SparseJacobian;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_jacobian_indices() {
        let jac = SparseJacobian::dense(DMatrix::identity(2, 3));
        assert_eq!(jac.indices(), &[0, 1, 2]);
        assert_eq!(jac.len(), 3);
        assert!(!jac.is_empty());
    }
}

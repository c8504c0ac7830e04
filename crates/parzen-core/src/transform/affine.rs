//! Affine transform implementation.

use nalgebra::DMatrix;
use crate::spatial::Point;
use super::trait_::{SparseJacobian, Transform};

/// Affine Transform (Linear transformation + Translation).
///
/// Represents a general affine transformation with a fixed center:
/// T(x) = A(x - c) + c + t
///
/// Parameter layout: the `D×D` matrix `A` in row-major order, followed by
/// the translation `t`, for `D*D + D` parameters in total.
#[derive(Debug, Clone, Copy)]
pub struct AffineTransform<const D: usize> {
    center: Point<D>,
}

impl<const D: usize> AffineTransform<D> {
    /// Create a new affine transform about `center`.
    pub fn new(center: Point<D>) -> Self {
        Self { center }
    }

    pub fn center(&self) -> Point<D> {
        self.center
    }

    /// Parameters of the identity mapping.
    pub fn identity_parameters() -> Vec<f64> {
        let mut parameters = vec![0.0; D * D + D];
        for i in 0..D {
            parameters[i * (D + 1)] = 1.0;
        }
        parameters
    }
}

impl<const D: usize> Transform<D> for AffineTransform<D> {
    fn number_of_parameters(&self) -> usize {
        D * D + D
    }

    fn transform_point(&self, parameters: &[f64], point: &Point<D>) -> Option<Point<D>> {
        let mut mapped = self.center;
        for i in 0..D {
            let row = &parameters[i * D..(i + 1) * D];
            let linear: f64 = (0..D).map(|j| row[j] * (point[j] - self.center[j])).sum();
            mapped[i] += linear + parameters[D * D + i];
        }
        mapped.is_finite().then_some(mapped)
    }

    fn jacobian(&self, _parameters: &[f64], point: &Point<D>) -> SparseJacobian {
        let mut block = DMatrix::zeros(D, D * D + D);
        for i in 0..D {
            for j in 0..D {
                block[(i, i * D + j)] = point[j] - self.center[j];
            }
            block[(i, D * D + i)] = 1.0;
        }
        SparseJacobian::dense(block)
    }
}

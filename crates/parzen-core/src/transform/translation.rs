//! Translation transform implementation.

use nalgebra::DMatrix;
use crate::spatial::{Point, Vector};
use super::trait_::{SparseJacobian, Transform};

/// Translation Transform.
///
/// `T(x) = x + t` with parameters `t` (length `D`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationTransform<const D: usize>;

impl<const D: usize> TranslationTransform<D> {
    pub fn new() -> Self {
        Self
    }
}

impl<const D: usize> Transform<D> for TranslationTransform<D> {
    fn number_of_parameters(&self) -> usize {
        D
    }

    fn transform_point(&self, parameters: &[f64], point: &Point<D>) -> Option<Point<D>> {
        let mapped = *point + Vector::from_slice(&parameters[..D]);
        mapped.is_finite().then_some(mapped)
    }

    fn jacobian(&self, _parameters: &[f64], _point: &Point<D>) -> SparseJacobian {
        SparseJacobian::dense(DMatrix::identity(D, D))
    }
}

//! Spatial vectors: displacements and intensity or mask gradients.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A D-dimensional vector backed by nalgebra's `SVector`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Build from the first `D` entries of a parameter slice.
    ///
    /// # Panics
    /// When `components` is shorter than `D`.
    pub fn from_slice(components: &[f64]) -> Self {
        Self(SVector::from_column_slice(&components[..D]))
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

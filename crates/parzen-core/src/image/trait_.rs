//! Moving image and moving mask traits.

use serde::{Deserialize, Serialize};
use crate::spatial::{Point, Vector};

/// Closed intensity interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityRange {
    pub min: f64,
    pub max: f64,
}

impl IntensityRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Smallest interval containing all finite values, or `None` when there are none.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |range: Option<Self>, v| match range {
                None => Some(Self::new(v, v)),
                Some(r) => Some(Self::new(r.min.min(v), r.max.max(v))),
            })
    }

    /// Width of the interval.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Moving image evaluator.
///
/// Maps a physical point to an intensity, optionally with its spatial
/// gradient. Points outside the region where the image is defined yield
/// `None`; the metrics count such samples as invalid.
pub trait MovingImage<const D: usize> {
    /// Intensity at `point`.
    fn evaluate(&self, point: &Point<D>) -> Option<f64>;

    /// Intensity and spatial gradient at `point`.
    fn evaluate_with_gradient(&self, point: &Point<D>) -> Option<(f64, Vector<D>)>;

    /// Range of intensities the image can produce. Used to lay out the
    /// moving axis of the joint histogram.
    fn intensity_range(&self) -> IntensityRange;
}

/// Moving mask evaluator.
///
/// Returns a mask value in `[0, 1]` and its spatial derivative. A value at
/// (or numerically near) zero excludes the sample.
pub trait MovingMask<const D: usize> {
    fn value_and_derivative(&self, point: &Point<D>) -> (f64, Vector<D>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_values() {
        let range = IntensityRange::from_values([3.0, -1.0, f64::NAN, 7.5]).unwrap();
        assert_eq!(range, IntensityRange::new(-1.0, 7.5));
        assert_eq!(range.span(), 8.5);
        assert!(range.contains(0.0));
        assert!(!range.contains(8.0));
    }

    #[test]
    fn test_range_from_empty() {
        assert!(IntensityRange::from_values(std::iter::empty()).is_none());
        assert!(IntensityRange::from_values([f64::INFINITY]).is_none());
    }
}

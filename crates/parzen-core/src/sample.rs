//! Fixed-image samples.

use serde::{Deserialize, Serialize};
use crate::spatial::Point;

/// A sampled fixed-image location and its intensity.
///
/// The sample set is produced by whatever sampling strategy the caller uses
/// (full grid, random subset, ...) and is consumed read-only by the metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedSample<const D: usize> {
    /// Physical position in the fixed image domain.
    pub point: Point<D>,
    /// Fixed image intensity at `point`.
    pub value: f64,
}

impl<const D: usize> FixedSample<D> {
    pub fn new(point: Point<D>, value: f64) -> Self {
        Self { point, value }
    }
}

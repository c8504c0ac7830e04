//! Metric trait for Parzen-window similarity measures.
//!
//! A metric is bound to one image pair through [`MetricInput`] and is then
//! evaluated repeatedly at different transform parameters, typically by an
//! optimizer. Lower values indicate better alignment.

use parzen_core::{FixedSample, MovingImage, MovingMask, Transform};
use crate::error::Result;

/// Everything a metric reads during one evaluation.
///
/// The metric borrows these for the duration of a call and never retains
/// them.
#[derive(Clone, Copy)]
pub struct MetricInput<'a, const D: usize> {
    /// Fixed-image samples: physical point plus intensity.
    pub samples: &'a [FixedSample<D>],
    /// Mapping from fixed to moving space.
    pub transform: &'a dyn Transform<D>,
    /// Moving image evaluator.
    pub moving: &'a dyn MovingImage<D>,
    /// Optional moving mask, weighting each sample by its mask value.
    pub mask: Option<&'a dyn MovingMask<D>>,
}

impl<'a, const D: usize> MetricInput<'a, D> {
    pub fn new(
        samples: &'a [FixedSample<D>],
        transform: &'a dyn Transform<D>,
        moving: &'a dyn MovingImage<D>,
    ) -> Self {
        Self {
            samples,
            transform,
            moving,
            mask: None,
        }
    }

    /// Attach a moving mask.
    pub fn with_mask(mut self, mask: &'a dyn MovingMask<D>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn number_of_parameters(&self) -> usize {
        self.transform.number_of_parameters()
    }
}

/// Similarity metric between a fixed and a moving image.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality
pub trait Metric<const D: usize> {
    /// Lay out the histogram from the configuration and the input's
    /// intensity ranges. Must run before any evaluation.
    fn initialize(&mut self, input: &MetricInput<'_, D>) -> Result<()>;

    /// Metric value at `parameters`.
    fn value(&mut self, input: &MetricInput<'_, D>, parameters: &[f64]) -> Result<f64>;

    /// Metric value and its derivative with respect to every parameter.
    fn value_and_derivative(
        &mut self,
        input: &MetricInput<'_, D>,
        parameters: &[f64],
    ) -> Result<(f64, Vec<f64>)>;

    /// Derivative only.
    fn derivative(&mut self, input: &MetricInput<'_, D>, parameters: &[f64]) -> Result<Vec<f64>> {
        self.value_and_derivative(input, parameters)
            .map(|(_, derivative)| derivative)
    }

    /// Get the name of this metric.
    fn name(&self) -> &'static str;
}

//! Parzen-window Mutual Information.
//!
//! `MI = H(F) + H(M) − H(F, M)` on the same joint histogram engine as the
//! normalized variant. The metric reports `−MI`.

use super::entropy::{compute_entropies, compute_entropy_derivatives, Entropies};
use super::histogram::ParzenJointHistogram;
use super::trait_::{Metric, MetricInput};
use crate::config::ParzenHistogramConfig;
use crate::error::{RegistrationError, Result};
use crate::validation::{ensure_finite_derivative, ensure_finite_value};

/// Mutual information metric.
#[derive(Debug, Clone)]
pub struct ParzenWindowMutualInformation {
    config: ParzenHistogramConfig,
    histogram: Option<ParzenJointHistogram>,
    entropies: Option<Entropies>,
}

impl Default for ParzenWindowMutualInformation {
    fn default() -> Self {
        Self::new(ParzenHistogramConfig::default())
    }
}

impl ParzenWindowMutualInformation {
    pub fn new(config: ParzenHistogramConfig) -> Self {
        Self {
            config,
            histogram: None,
            entropies: None,
        }
    }

    pub fn config(&self) -> &ParzenHistogramConfig {
        &self.config
    }

    pub fn histogram(&self) -> Option<&ParzenJointHistogram> {
        self.histogram.as_ref()
    }

    pub fn entropies(&self) -> Option<Entropies> {
        self.entropies
    }
}

impl<const D: usize> Metric<D> for ParzenWindowMutualInformation {
    fn initialize(&mut self, input: &MetricInput<'_, D>) -> Result<()> {
        self.entropies = None;
        self.histogram = None;
        self.histogram = Some(ParzenJointHistogram::from_input(&self.config, input)?);
        Ok(())
    }

    fn value(&mut self, input: &MetricInput<'_, D>, parameters: &[f64]) -> Result<f64> {
        self.entropies = None;
        let histogram = self
            .histogram
            .as_mut()
            .ok_or(RegistrationError::Uninitialized)?;
        histogram.compute_pdfs(input, parameters)?;
        let entropies = compute_entropies(histogram);
        let value = ensure_finite_value(-entropies.mutual_information())?;
        tracing::debug!("MI value {:.8}", value);

        self.entropies = Some(entropies);
        Ok(value)
    }

    fn value_and_derivative(
        &mut self,
        input: &MetricInput<'_, D>,
        parameters: &[f64],
    ) -> Result<(f64, Vec<f64>)> {
        self.entropies = None;
        let histogram = self
            .histogram
            .as_mut()
            .ok_or(RegistrationError::Uninitialized)?;
        histogram.compute_pdfs_and_derivatives(input, parameters)?;
        let entropies = compute_entropies(histogram);
        let value = ensure_finite_value(-entropies.mutual_information())?;
        let d = compute_entropy_derivatives(histogram);

        let derivative: Vec<f64> = d
            .marginal_sum
            .iter()
            .zip(&d.joint)
            .map(|(&dm, &dj)| dj - dm)
            .collect();
        ensure_finite_derivative(&derivative)?;
        tracing::trace!(
            "MI value {:.8}, |derivative| {:.6e}",
            value,
            derivative.iter().map(|g| g * g).sum::<f64>().sqrt()
        );

        self.entropies = Some(entropies);
        Ok((value, derivative))
    }

    fn name(&self) -> &'static str {
        "ParzenWindowMutualInformation"
    }
}

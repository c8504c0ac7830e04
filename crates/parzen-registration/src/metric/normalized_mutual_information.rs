//! Parzen-window Normalized Mutual Information.
//!
//! `NMI = (H(F) + H(M)) / H(F, M)` estimated from a B-spline Parzen joint
//! histogram, with the analytic derivative with respect to the transform
//! parameters. The metric reports `−NMI`, so better alignment gives a lower
//! value; identical images reach `−2` in the limit of sharp kernels.

use super::entropy::{compute_entropies, compute_entropy_derivatives, Entropies};
use super::histogram::ParzenJointHistogram;
use super::trait_::{Metric, MetricInput};
use crate::config::ParzenHistogramConfig;
use crate::error::{RegistrationError, Result};
use crate::validation::{ensure_finite_derivative, ensure_finite_value};

/// Normalized mutual information metric.
#[derive(Debug, Clone)]
pub struct ParzenWindowNormalizedMutualInformation {
    config: ParzenHistogramConfig,
    histogram: Option<ParzenJointHistogram>,
    entropies: Option<Entropies>,
}

impl Default for ParzenWindowNormalizedMutualInformation {
    fn default() -> Self {
        Self::new(ParzenHistogramConfig::default())
    }
}

impl ParzenWindowNormalizedMutualInformation {
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

    /// The histogram engine, once initialized.
    pub fn histogram(&self) -> Option<&ParzenJointHistogram> {
        self.histogram.as_ref()
    }

    /// Entropies behind the last successful evaluation.
    pub fn entropies(&self) -> Option<Entropies> {
        self.entropies
    }

    fn histogram_mut(&mut self) -> Result<&mut ParzenJointHistogram> {
        self.histogram.as_mut().ok_or(RegistrationError::Uninitialized)
    }
}

fn negated_nmi(entropies: &Entropies) -> Result<f64> {
    if !(entropies.joint > 0.0) {
        return Err(RegistrationError::numerical_degeneracy(
            "joint entropy is zero; all samples fall into one histogram cell",
        ));
    }
    ensure_finite_value(-entropies.normalized_mutual_information())
}

impl<const D: usize> Metric<D> for ParzenWindowNormalizedMutualInformation {
    fn initialize(&mut self, input: &MetricInput<'_, D>) -> Result<()> {
        self.entropies = None;
        self.histogram = None;
        self.histogram = Some(ParzenJointHistogram::from_input(&self.config, input)?);
        Ok(())
    }

    fn value(&mut self, input: &MetricInput<'_, D>, parameters: &[f64]) -> Result<f64> {
        self.entropies = None;
        let histogram = self.histogram_mut()?;
        histogram.compute_pdfs(input, parameters)?;
        let entropies = compute_entropies(histogram);
        let value = negated_nmi(&entropies)?;
        tracing::debug!("NMI value {:.8}", value);

        self.entropies = Some(entropies);
        Ok(value)
    }

    fn value_and_derivative(
        &mut self,
        input: &MetricInput<'_, D>,
        parameters: &[f64],
    ) -> Result<(f64, Vec<f64>)> {
        self.entropies = None;
        let histogram = self.histogram_mut()?;
        histogram.compute_pdfs_and_derivatives(input, parameters)?;
        let entropies = compute_entropies(histogram);
        let value = negated_nmi(&entropies)?;
        let d = compute_entropy_derivatives(histogram);

        // −(Hf + Hm) / Hj, quotient rule
        let marginal_sum = entropies.fixed + entropies.moving;
        let joint = entropies.joint;
        let derivative: Vec<f64> = d
            .marginal_sum
            .iter()
            .zip(&d.joint)
            .map(|(&dm, &dj)| -(dm * joint - marginal_sum * dj) / (joint * joint))
            .collect();
        ensure_finite_derivative(&derivative)?;

        tracing::debug!("NMI value {:.8}", value);
        tracing::trace!(
            "NMI value {:.8}, |derivative| {:.6e}",
            value,
            derivative.iter().map(|g| g * g).sum::<f64>().sqrt()
        );

        self.entropies = Some(entropies);
        Ok((value, derivative))
    }

    fn name(&self) -> &'static str {
        "ParzenWindowNormalizedMutualInformation"
    }
}

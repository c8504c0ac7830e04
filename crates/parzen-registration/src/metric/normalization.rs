use crate::error::{RegistrationError, Result};

/// Tracks the histogram normalization factor `α = 1 / Σ mask` and its
/// parameter derivative over one accumulation pass.
///
/// Without a moving mask every valid sample contributes a mask value of 1,
/// so `α` is the reciprocal of the valid-sample count.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationTracker {
    mask_mass: f64,
    alpha: f64,
    alpha_derivatives: Vec<f64>,
    finalized: bool,
}

impl NormalizationTracker {
    pub fn new(number_of_parameters: usize) -> Self {
        Self {
            mask_mass: 0.0,
            alpha: 0.0,
            alpha_derivatives: vec![0.0; number_of_parameters],
            finalized: false,
        }
    }

    pub fn reset(&mut self) {
        self.mask_mass = 0.0;
        self.alpha = 0.0;
        self.alpha_derivatives.fill(0.0);
        self.finalized = false;
    }

    pub fn add_sample(&mut self, mask_value: f64) {
        self.mask_mass += mask_value;
    }

    /// Accumulate `∂mask/∂μ` over the sample's non-zero parameter indices.
    pub fn add_mask_jacobian(&mut self, indices: &[usize], mask_jacobian: &[f64]) {
        for (&mu, &dm) in indices.iter().zip(mask_jacobian) {
            self.alpha_derivatives[mu] += dm;
        }
    }

    /// Turn the accumulated sums into `α` and `∂α/∂μ = −α² Σ ∂mask/∂μ`.
    pub fn finalize(&mut self) -> Result<()> {
        if !(self.mask_mass > 0.0) || !self.mask_mass.is_finite() {
            return Err(RegistrationError::numerical_degeneracy(format!(
                "cannot normalize histogram with sample mass {}",
                self.mask_mass
            )));
        }
        self.alpha = 1.0 / self.mask_mass;
        let scale = -self.alpha * self.alpha;
        for d in &mut self.alpha_derivatives {
            *d *= scale;
        }
        self.finalized = true;
        Ok(())
    }

    pub fn mask_mass(&self) -> f64 {
        self.mask_mass
    }

    /// `α`, zero until [`finalize`](Self::finalize) succeeds.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_derivatives(&self) -> &[f64] {
        &self.alpha_derivatives
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unmasked_alpha_is_reciprocal_count() {
        let mut tracker = NormalizationTracker::new(2);
        for _ in 0..8 {
            tracker.add_sample(1.0);
        }
        tracker.finalize().unwrap();
        assert_relative_eq!(tracker.alpha(), 0.125);
        assert_eq!(tracker.alpha_derivatives(), &[0.0, 0.0]);
        assert!(tracker.is_finalized());
    }

    #[test]
    fn test_mask_derivatives() {
        let mut tracker = NormalizationTracker::new(3);
        tracker.add_sample(0.5);
        tracker.add_mask_jacobian(&[0, 2], &[1.0, -2.0]);
        tracker.add_sample(1.5);
        tracker.add_mask_jacobian(&[2], &[0.5]);
        tracker.finalize().unwrap();

        assert_relative_eq!(tracker.alpha(), 0.5);
        let d = tracker.alpha_derivatives();
        assert_relative_eq!(d[0], -0.25);
        assert_eq!(d[1], 0.0);
        assert_relative_eq!(d[2], 0.375);
    }

    #[test]
    fn test_empty_pass_is_degenerate() {
        let mut tracker = NormalizationTracker::new(1);
        assert!(matches!(
            tracker.finalize(),
            Err(RegistrationError::NumericalDegeneracy(_))
        ));
        assert!(!tracker.is_finalized());
    }

    #[test]
    fn test_reset() {
        let mut tracker = NormalizationTracker::new(1);
        tracker.add_sample(2.0);
        tracker.add_mask_jacobian(&[0], &[1.0]);
        tracker.finalize().unwrap();
        tracker.reset();
        assert_eq!(tracker.mask_mass(), 0.0);
        assert_eq!(tracker.alpha(), 0.0);
        assert_eq!(tracker.alpha_derivatives(), &[0.0]);
    }
}

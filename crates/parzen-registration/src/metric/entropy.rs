//! Entropy reductions over a normalized joint histogram.
//!
//! With `p = α·h` for every cell and the marginals replaced by their logs,
//! all entropies and their parameter derivatives reduce to weighted sums
//! over the non-zero cells.

use ndarray::{Array1, Array2, Array3, Zip};
use serde::{Deserialize, Serialize};

use super::histogram::ParzenJointHistogram;

/// Marginal and joint entropies in nats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Entropies {
    pub joint: f64,
    pub fixed: f64,
    pub moving: f64,
}

impl Entropies {
    /// `(H(F) + H(M)) / H(F, M)`.
    pub fn normalized_mutual_information(&self) -> f64 {
        (self.fixed + self.moving) / self.joint
    }

    /// `H(F) + H(M) − H(F, M)`.
    pub fn mutual_information(&self) -> f64 {
        self.fixed + self.moving - self.joint
    }
}

/// Parameter derivatives of `H(F, M)` and of `H(F) + H(M)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyDerivatives {
    pub joint: Vec<f64>,
    pub marginal_sum: Vec<f64>,
}

/// Replace each unnormalized marginal entry by `ln(α·m)`, or 0 where it is empty.
pub fn log_marginal_in_place(marginal: &mut Array1<f64>, alpha: f64) {
    marginal.mapv_inplace(|m| {
        let p = alpha * m;
        if p > 0.0 {
            p.ln()
        } else {
            0.0
        }
    });
}

/// Entropies of `alpha · joint` given log-marginals.
pub fn entropies(
    joint: &Array2<f64>,
    alpha: f64,
    log_fixed: &Array1<f64>,
    log_moving: &Array1<f64>,
) -> Entropies {
    let mut result = Entropies::default();
    for ((f, m), &h) in joint.indexed_iter() {
        let p = alpha * h;
        if p > 0.0 {
            result.joint -= p * p.ln();
            result.fixed -= p * log_fixed[f];
            result.moving -= p * log_moving[m];
        }
    }
    result
}

/// Entropy derivatives from the joint histogram derivatives.
///
/// For every parameter `μ`, with `dp = ∂α/∂μ · h + α · ∂h/∂μ`:
///
/// ```text
/// ∂H(F,M)/∂μ       = −Σ dp · (ln p + 1)
/// ∂(H(F)+H(M))/∂μ  = −Σ dp · (ln pF + ln pM + 2)
/// ```
///
/// both summed over cells with `p > 0`.
pub fn entropy_derivatives(
    joint: &Array2<f64>,
    joint_derivatives: &Array3<f64>,
    alpha: f64,
    alpha_derivatives: &[f64],
    log_fixed: &Array1<f64>,
    log_moving: &Array1<f64>,
) -> EntropyDerivatives {
    let mut marginal_weights = Array2::<f64>::zeros(joint.dim());
    let mut joint_weights = Array2::<f64>::zeros(joint.dim());
    let mut weighted_marginal = 0.0;
    let mut weighted_joint = 0.0;

    for ((f, m), &h) in joint.indexed_iter() {
        let p = alpha * h;
        if p > 0.0 {
            let wa = log_fixed[f] + log_moving[m] + 2.0;
            let wb = p.ln() + 1.0;
            marginal_weights[[f, m]] = wa;
            joint_weights[[f, m]] = wb;
            weighted_marginal += h * wa;
            weighted_joint += h * wb;
        }
    }

    let number_of_parameters = alpha_derivatives.len();
    let mut result = EntropyDerivatives {
        joint: vec![0.0; number_of_parameters],
        marginal_sum: vec![0.0; number_of_parameters],
    };

    for (mu, slice) in joint_derivatives.outer_iter().enumerate() {
        let (sa, sb) = Zip::from(&slice)
            .and(&marginal_weights)
            .and(&joint_weights)
            .fold((0.0, 0.0), |(sa, sb), &dh, &wa, &wb| (sa + dh * wa, sb + dh * wb));
        let d_alpha = alpha_derivatives[mu];
        result.marginal_sum[mu] = -(d_alpha * weighted_marginal + alpha * sa);
        result.joint[mu] = -(d_alpha * weighted_joint + alpha * sb);
    }

    result
}

/// Marginals, their logs and the three entropies of the last pass.
///
/// Leaves the histogram's marginal buffers holding log-probabilities, which
/// [`compute_entropy_derivatives`] reads.
pub(crate) fn compute_entropies(histogram: &mut ParzenJointHistogram) -> Entropies {
    histogram.compute_marginals();
    let alpha = histogram.alpha();
    let (fixed, moving) = histogram.marginals_mut();
    log_marginal_in_place(fixed, alpha);
    log_marginal_in_place(moving, alpha);
    entropies(
        histogram.joint_pdf(),
        alpha,
        histogram.fixed_marginal(),
        histogram.moving_marginal(),
    )
}

pub(crate) fn compute_entropy_derivatives(histogram: &ParzenJointHistogram) -> EntropyDerivatives {
    entropy_derivatives(
        histogram.joint_pdf(),
        histogram.joint_pdf_derivatives(),
        histogram.alpha(),
        histogram.alpha_derivatives(),
        histogram.fixed_marginal(),
        histogram.moving_marginal(),
    )
}

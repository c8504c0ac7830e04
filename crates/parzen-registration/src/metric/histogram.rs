//! Parzen-window joint histogram.
//!
//! Every valid sample spreads a separable B-spline weight over a small
//! window of `(fixed bin, moving bin)` cells. In derivative mode each cell
//! also accumulates the derivative of its weight with respect to the
//! transform parameters the sample actually depends on, so the cost per
//! sample scales with the number of non-zero Jacobian columns rather than
//! with the total parameter count.

use ndarray::{Array1, Array2, Array3};
use parzen_core::{IntensityRange, SparseJacobian, Vector};
use serde::{Deserialize, Serialize};

use super::kernel::{
    evaluate_parzen_values, window_start, BSplineDerivativeKernel, BSplineKernel, KernelFunction,
};
use super::normalization::NormalizationTracker;
use super::trait_::MetricInput;
use crate::config::{effective_kernel_order, ParzenHistogramConfig};
use crate::error::{RegistrationError, Result};
use crate::validation::{validate_jacobian, validate_parameters};

/// Mask values at or below this exclude the sample.
pub const MASK_THRESHOLD: f64 = 1e-10;

/// Relative margin added on both ends of an intensity range so that the
/// extreme intensities land strictly inside the histogram.
const SMALL_NUMBER_RATIO: f64 = 1e-3;

/// Mapping from intensities to continuous bin coordinates along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinLayout {
    number_of_bins: usize,
    kernel_order: u32,
    bin_size: f64,
    normalized_min: f64,
    range: IntensityRange,
    limited: bool,
}

impl BinLayout {
    /// Lay out `number_of_bins` bins over `range` for a kernel of `kernel_order`.
    ///
    /// `order / 2` bins are reserved on each side so that windows centred on
    /// the extreme intensities stay inside the histogram. When the bins
    /// cannot hold that padding the kernel order is lowered until they can;
    /// a single bin always runs the box kernel and covers the whole range.
    /// A zero-width range is widened to `[min − 0.5, max + 0.5]`.
    ///
    /// Intensities outside the range are not clamped, their windows are
    /// clipped at the histogram edges instead.
    pub fn new(number_of_bins: usize, kernel_order: u32, range: IntensityRange) -> Result<Self> {
        Self::build(number_of_bins, kernel_order, range, None)
    }

    /// Like [`new`](Self::new), but the range is first extended by
    /// `limit_range_ratio · span` on both ends and [`limit`](Self::limit)
    /// clamps intensities into the extended range.
    pub fn with_limiter(
        number_of_bins: usize,
        kernel_order: u32,
        range: IntensityRange,
        limit_range_ratio: f64,
    ) -> Result<Self> {
        if !(limit_range_ratio.is_finite() && limit_range_ratio >= 0.0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "limit range ratio must be finite and non-negative, got {limit_range_ratio}"
            )));
        }
        Self::build(number_of_bins, kernel_order, range, Some(limit_range_ratio))
    }

    fn build(
        number_of_bins: usize,
        requested_order: u32,
        range: IntensityRange,
        limit_range_ratio: Option<f64>,
    ) -> Result<Self> {
        if number_of_bins == 0 {
            return Err(RegistrationError::invalid_configuration(
                "a histogram axis needs at least one bin",
            ));
        }
        if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
            return Err(RegistrationError::invalid_configuration(format!(
                "intensity range [{}, {}] is not a finite interval",
                range.min, range.max
            )));
        }

        let range = if range.span() > 0.0 {
            range
        } else {
            IntensityRange::new(range.min - 0.5, range.max + 0.5)
        };
        let range = match limit_range_ratio {
            Some(ratio) => {
                let extension = ratio * range.span();
                IntensityRange::new(range.min - extension, range.max + extension)
            }
            None => range,
        };

        let kernel_order = effective_kernel_order(number_of_bins, requested_order);
        if kernel_order != requested_order {
            tracing::debug!(
                "{} bins cannot pad a kernel of order {}, using order {}",
                number_of_bins,
                requested_order,
                kernel_order
            );
        }

        let (bin_size, normalized_min) = if number_of_bins == 1 {
            // the whole range maps onto [-0.5, 0.5) around bin 0
            let small = SMALL_NUMBER_RATIO * range.span();
            let bin_size = range.span() + 2.0 * small;
            (bin_size, (range.min - small) / bin_size + 0.5)
        } else {
            let padding = kernel_order / 2;
            let intervals = (number_of_bins - 2 * padding as usize - 1) as f64;
            let small = SMALL_NUMBER_RATIO * range.span() / intervals;
            let bin_size = (range.span() + 2.0 * small) / intervals;
            (bin_size, (range.min - small) / bin_size - padding as f64)
        };

        Ok(Self {
            number_of_bins,
            kernel_order,
            bin_size,
            normalized_min,
            range,
            limited: limit_range_ratio.is_some(),
        })
    }

    pub fn number_of_bins(&self) -> usize {
        self.number_of_bins
    }

    /// Kernel order actually used on this axis.
    pub fn kernel_order(&self) -> u32 {
        self.kernel_order
    }

    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// Width of one bin in intensity units.
    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn normalized_min(&self) -> f64 {
        self.normalized_min
    }

    /// Intensity range after widening and limiter extension.
    pub fn range(&self) -> IntensityRange {
        self.range
    }

    /// Clamp `value` into the range when the limiter is on. The flag is
    /// set when the value was moved.
    pub fn limit(&self, value: f64) -> (f64, bool) {
        if !self.limited {
            return (value, false);
        }
        if value < self.range.min {
            (self.range.min, true)
        } else if value > self.range.max {
            (self.range.max, true)
        } else {
            (value, false)
        }
    }

    /// Continuous bin coordinate of `value`.
    ///
    /// Terms far outside the histogram are pulled in to a band just past
    /// the padded edges, where the whole window still misses.
    pub fn parzen_term(&self, value: f64) -> f64 {
        let reach = self.kernel_order as f64 + 2.0;
        let upper = self.number_of_bins as f64 + reach - 1.0;
        let term = value / self.bin_size - self.normalized_min;
        if term.is_nan() {
            term
        } else {
            term.clamp(-reach, upper)
        }
    }

    /// First bin of the Parzen window around `term`.
    pub fn window_start(&self, term: f64) -> i64 {
        window_start(term, self.kernel_order)
    }

    fn contains_bin(&self, bin: i64) -> bool {
        bin >= 0 && (bin as usize) < self.number_of_bins
    }
}

/// Per-sample derivative data, already projected onto the sample's
/// non-zero parameter indices.
#[derive(Debug, Clone, Copy)]
pub struct SampleDerivatives<'a> {
    /// Parameter indices with a non-zero Jacobian column.
    pub indices: &'a [usize],
    /// `∇M · ∂T/∂μ` for each index.
    pub image_jacobian: &'a [f64],
    /// `∇mask · ∂T/∂μ` for each index, when a mask is active.
    pub mask_jacobian: Option<&'a [f64]>,
}

/// Sample counts of the most recent accumulation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub total: usize,
    pub valid: usize,
    /// Sum of mask values over valid samples; equals `valid` without a mask.
    pub mask_mass: f64,
}

/// Joint histogram engine shared by the Parzen-window metrics.
#[derive(Debug, Clone)]
pub struct ParzenJointHistogram {
    fixed_layout: BinLayout,
    moving_layout: BinLayout,
    fixed_kernel: BSplineKernel,
    moving_kernel: BSplineKernel,
    moving_derivative_kernel: BSplineDerivativeKernel,
    required_ratio: f64,
    number_of_parameters: usize,
    /// Indexed `[fixed bin, moving bin]`.
    joint_pdf: Array2<f64>,
    /// Indexed `[parameter, fixed bin, moving bin]`.
    joint_pdf_derivatives: Array3<f64>,
    fixed_marginal: Array1<f64>,
    moving_marginal: Array1<f64>,
    normalization: NormalizationTracker,
    fixed_parzen_values: Vec<f64>,
    moving_parzen_values: Vec<f64>,
    derivative_moving_parzen_values: Vec<f64>,
    image_jacobian: Vec<f64>,
    mask_jacobian: Vec<f64>,
    last_pass: Option<PassSummary>,
}

impl ParzenJointHistogram {
    /// Build an engine over explicit intensity ranges.
    pub fn new(
        config: &ParzenHistogramConfig,
        fixed_range: IntensityRange,
        moving_range: IntensityRange,
        number_of_parameters: usize,
    ) -> Result<Self> {
        config.validate()?;

        let layout = |bins: usize, order: u32, range: IntensityRange| {
            if config.use_intensity_limiter {
                BinLayout::with_limiter(bins, order, range, config.limit_range_ratio)
            } else {
                BinLayout::new(bins, order, range)
            }
        };
        let fixed_layout = layout(
            config.number_of_fixed_histogram_bins,
            config.fixed_kernel_bspline_order,
            fixed_range,
        )?;
        let moving_layout = layout(
            config.number_of_moving_histogram_bins,
            config.moving_kernel_bspline_order,
            moving_range,
        )?;
        let fixed_order = fixed_layout.kernel_order();
        let moving_order = moving_layout.kernel_order();

        let nf = fixed_layout.number_of_bins();
        let nm = moving_layout.number_of_bins();

        tracing::debug!(
            "Parzen histogram layout: fixed {} bins (order {}, bin size {:.6}), moving {} bins (order {}, bin size {:.6})",
            nf,
            fixed_order,
            fixed_layout.bin_size(),
            nm,
            moving_order,
            moving_layout.bin_size()
        );

        Ok(Self {
            fixed_layout,
            moving_layout,
            fixed_kernel: BSplineKernel::new(fixed_order)?,
            moving_kernel: BSplineKernel::new(moving_order)?,
            moving_derivative_kernel: BSplineDerivativeKernel::new(moving_order)?,
            required_ratio: config.required_ratio_of_valid_samples,
            number_of_parameters,
            joint_pdf: Array2::zeros((nf, nm)),
            joint_pdf_derivatives: Array3::zeros((number_of_parameters, nf, nm)),
            fixed_marginal: Array1::zeros(nf),
            moving_marginal: Array1::zeros(nm),
            normalization: NormalizationTracker::new(number_of_parameters),
            fixed_parzen_values: vec![0.0; fixed_order as usize + 1],
            moving_parzen_values: vec![0.0; moving_order as usize + 1],
            derivative_moving_parzen_values: vec![0.0; moving_order as usize + 1],
            image_jacobian: Vec::new(),
            mask_jacobian: Vec::new(),
            last_pass: None,
        })
    }

    /// Build an engine for `input`.
    ///
    /// Ranges pinned in `config` take precedence. Otherwise the fixed range
    /// is observed from the sample intensities and the moving range is
    /// taken from the moving image.
    pub fn from_input<const D: usize>(
        config: &ParzenHistogramConfig,
        input: &MetricInput<'_, D>,
    ) -> Result<Self> {
        let fixed_range = match config.fixed_intensity_range {
            Some(range) => range,
            None => IntensityRange::from_values(input.samples.iter().map(|s| s.value)).ok_or_else(
                || {
                    RegistrationError::invalid_configuration(
                        "no finite fixed intensities to lay out the histogram",
                    )
                },
            )?,
        };
        let moving_range = config
            .moving_intensity_range
            .unwrap_or_else(|| input.moving.intensity_range());

        tracing::info!(
            "Initializing Parzen histogram: {}x{} bins, kernel orders {}/{}, {} samples, {} parameters, fixed range [{}, {}], moving range [{}, {}]",
            config.number_of_fixed_histogram_bins,
            config.number_of_moving_histogram_bins,
            config.fixed_kernel_bspline_order,
            config.moving_kernel_bspline_order,
            input.samples.len(),
            input.number_of_parameters(),
            fixed_range.min,
            fixed_range.max,
            moving_range.min,
            moving_range.max
        );

        Self::new(config, fixed_range, moving_range, input.number_of_parameters())
    }

    pub fn fixed_layout(&self) -> &BinLayout {
        &self.fixed_layout
    }

    pub fn moving_layout(&self) -> &BinLayout {
        &self.moving_layout
    }

    pub fn number_of_parameters(&self) -> usize {
        self.number_of_parameters
    }

    /// Unnormalized joint histogram `[fixed, moving]`.
    pub fn joint_pdf(&self) -> &Array2<f64> {
        &self.joint_pdf
    }

    /// Unnormalized joint histogram derivatives `[parameter, fixed, moving]`.
    pub fn joint_pdf_derivatives(&self) -> &Array3<f64> {
        &self.joint_pdf_derivatives
    }

    /// Fixed marginal. Raw sums after [`compute_marginals`](Self::compute_marginals),
    /// log-probabilities once an entropy reduction has run.
    pub fn fixed_marginal(&self) -> &Array1<f64> {
        &self.fixed_marginal
    }

    /// Moving marginal, with the same states as [`fixed_marginal`](Self::fixed_marginal).
    pub fn moving_marginal(&self) -> &Array1<f64> {
        &self.moving_marginal
    }

    /// Normalization factor of the last pass.
    pub fn alpha(&self) -> f64 {
        self.normalization.alpha()
    }

    /// `∂α/∂μ` of the last derivative pass.
    pub fn alpha_derivatives(&self) -> &[f64] {
        self.normalization.alpha_derivatives()
    }

    pub fn last_pass(&self) -> Option<PassSummary> {
        self.last_pass
    }

    /// Sum over all joint histogram cells.
    pub fn total_mass(&self) -> f64 {
        self.joint_pdf.sum()
    }

    /// Clear accumulators ahead of a pass.
    pub fn reset(&mut self, with_derivatives: bool) {
        self.joint_pdf.fill(0.0);
        if with_derivatives {
            self.joint_pdf_derivatives.fill(0.0);
        }
        self.normalization.reset();
        self.last_pass = None;
    }

    /// Scatter one sample into the histogram.
    ///
    /// `mask_value` is 1 when no mask is active. With `derivatives`, every
    /// touched cell `(f, m)` also receives, for each listed parameter `μ`,
    ///
    /// ```text
    /// −imageJac[μ] · wf · w'm · mask / movingBinSize + maskJac[μ] · wf · wm
    /// ```
    ///
    /// With the limiter on both intensities are clamped into their ranges
    /// first, and a clamped moving intensity contributes no image term.
    /// Otherwise window cells outside the histogram are dropped.
    pub fn update(
        &mut self,
        fixed_value: f64,
        moving_value: f64,
        mask_value: f64,
        derivatives: Option<&SampleDerivatives<'_>>,
    ) {
        let (fixed_value, _) = self.fixed_layout.limit(fixed_value);
        let (moving_value, moving_clamped) = self.moving_layout.limit(moving_value);
        let fixed_term = self.fixed_layout.parzen_term(fixed_value);
        let moving_term = self.moving_layout.parzen_term(moving_value);
        let fixed_start = self.fixed_layout.window_start(fixed_term);
        let moving_start = self.moving_layout.window_start(moving_term);

        evaluate_parzen_values(
            &self.fixed_kernel,
            fixed_term,
            fixed_start,
            &mut self.fixed_parzen_values,
        );
        evaluate_parzen_values(
            &self.moving_kernel,
            moving_term,
            moving_start,
            &mut self.moving_parzen_values,
        );
        if derivatives.is_some() {
            evaluate_parzen_values(
                &self.moving_derivative_kernel,
                moving_term,
                moving_start,
                &mut self.derivative_moving_parzen_values,
            );
        }

        let image_scale = if moving_clamped {
            0.0
        } else {
            mask_value / self.moving_layout.bin_size()
        };

        for (a, &fixed_weight) in self.fixed_parzen_values.iter().enumerate() {
            let f = fixed_start.saturating_add(a as i64);
            if fixed_weight == 0.0 || !self.fixed_layout.contains_bin(f) {
                continue;
            }
            let f = f as usize;

            for (b, &moving_weight) in self.moving_parzen_values.iter().enumerate() {
                let m = moving_start.saturating_add(b as i64);
                if !self.moving_layout.contains_bin(m) {
                    continue;
                }
                let m = m as usize;

                let weight = fixed_weight * moving_weight;
                self.joint_pdf[[f, m]] += weight * mask_value;

                if let Some(d) = derivatives {
                    let image_factor =
                        fixed_weight * self.derivative_moving_parzen_values[b] * image_scale;
                    for (k, &mu) in d.indices.iter().enumerate() {
                        let mut delta = -d.image_jacobian[k] * image_factor;
                        if let Some(mask_jacobian) = d.mask_jacobian {
                            delta += mask_jacobian[k] * weight;
                        }
                        self.joint_pdf_derivatives[[mu, f, m]] += delta;
                    }
                }
            }
        }
    }

    /// Value-only accumulation pass.
    pub fn compute_pdfs<const D: usize>(
        &mut self,
        input: &MetricInput<'_, D>,
        parameters: &[f64],
    ) -> Result<PassSummary> {
        self.accumulate(input, parameters, false)
    }

    /// Accumulation pass that also fills the histogram derivatives and `∂α/∂μ`.
    pub fn compute_pdfs_and_derivatives<const D: usize>(
        &mut self,
        input: &MetricInput<'_, D>,
        parameters: &[f64],
    ) -> Result<PassSummary> {
        self.accumulate(input, parameters, true)
    }

    fn accumulate<const D: usize>(
        &mut self,
        input: &MetricInput<'_, D>,
        parameters: &[f64],
        with_derivatives: bool,
    ) -> Result<PassSummary> {
        if input.number_of_parameters() != self.number_of_parameters {
            return Err(RegistrationError::dimension_mismatch(format!(
                "histogram was initialized for {} parameters, transform has {}",
                self.number_of_parameters,
                input.number_of_parameters()
            )));
        }
        validate_parameters(parameters, self.number_of_parameters)?;
        self.reset(with_derivatives);

        let total = input.samples.len();
        let mut valid = 0usize;
        let mut image_jacobian = std::mem::take(&mut self.image_jacobian);
        let mut mask_jacobian = std::mem::take(&mut self.mask_jacobian);

        for sample in input.samples {
            if !sample.value.is_finite() {
                continue;
            }
            let Some(mapped) = input.transform.transform_point(parameters, &sample.point) else {
                continue;
            };

            let (mask_value, mask_gradient) = match input.mask {
                Some(mask) => {
                    let (value, gradient) = mask.value_and_derivative(&mapped);
                    if !(value > MASK_THRESHOLD) {
                        continue;
                    }
                    (value, Some(gradient))
                }
                None => (1.0, None),
            };

            if with_derivatives {
                let Some((moving_value, moving_gradient)) =
                    input.moving.evaluate_with_gradient(&mapped)
                else {
                    continue;
                };
                if !moving_value.is_finite() {
                    continue;
                }

                let jacobian = input.transform.jacobian(parameters, &sample.point);
                validate_jacobian(&jacobian, D, self.number_of_parameters)?;
                project_gradient(&jacobian, &moving_gradient, &mut image_jacobian);
                let has_mask_jacobian = match mask_gradient {
                    Some(gradient) => {
                        project_gradient(&jacobian, &gradient, &mut mask_jacobian);
                        true
                    }
                    None => false,
                };

                valid += 1;
                self.normalization.add_sample(mask_value);
                if has_mask_jacobian {
                    self.normalization
                        .add_mask_jacobian(jacobian.indices(), &mask_jacobian);
                }

                let derivatives = SampleDerivatives {
                    indices: jacobian.indices(),
                    image_jacobian: &image_jacobian,
                    mask_jacobian: has_mask_jacobian.then_some(&mask_jacobian[..]),
                };
                self.update(sample.value, moving_value, mask_value, Some(&derivatives));
            } else {
                let Some(moving_value) = input.moving.evaluate(&mapped) else {
                    continue;
                };
                if !moving_value.is_finite() {
                    continue;
                }

                valid += 1;
                self.normalization.add_sample(mask_value);
                self.update(sample.value, moving_value, mask_value, None);
            }
        }

        self.image_jacobian = image_jacobian;
        self.mask_jacobian = mask_jacobian;

        let summary = PassSummary {
            total,
            valid,
            mask_mass: self.normalization.mask_mass(),
        };
        self.last_pass = Some(summary);

        self.check_number_of_samples(total, valid)?;
        self.normalization.finalize()?;

        let mass = self.total_mass();
        if !(mass > 0.0) {
            return Err(RegistrationError::numerical_degeneracy(format!(
                "joint histogram is empty after {valid} valid samples; intensities fall outside the histogram range"
            )));
        }

        tracing::debug!(
            "Parzen pass: {}/{} valid samples, mask mass {:.6}, histogram mass {:.6}, alpha {:.6e}",
            valid,
            total,
            summary.mask_mass,
            mass,
            self.normalization.alpha()
        );

        Ok(summary)
    }

    fn check_number_of_samples(&self, total: usize, valid: usize) -> Result<()> {
        if valid == 0 || (valid as f64) < self.required_ratio * total as f64 {
            tracing::warn!(
                "Too many samples map outside moving image buffer: {} / {}",
                valid,
                total
            );
            return Err(RegistrationError::InsufficientSamples {
                valid,
                total,
                required_ratio: self.required_ratio,
            });
        }
        Ok(())
    }

    /// Row and column sums of the joint histogram.
    pub fn compute_marginals(&mut self) {
        for (f, row) in self.joint_pdf.outer_iter().enumerate() {
            self.fixed_marginal[f] = row.iter().sum();
        }
        self.moving_marginal.fill(0.0);
        for row in self.joint_pdf.outer_iter() {
            for (m, &h) in row.iter().enumerate() {
                self.moving_marginal[m] += h;
            }
        }
    }

    pub(crate) fn marginals_mut(&mut self) -> (&mut Array1<f64>, &mut Array1<f64>) {
        (&mut self.fixed_marginal, &mut self.moving_marginal)
    }
}

/// `out[k] = Σ_d gradient[d] · block[d, k]`.
fn project_gradient<const D: usize>(
    jacobian: &SparseJacobian,
    gradient: &Vector<D>,
    out: &mut Vec<f64>,
) {
    let block = jacobian.block();
    out.clear();
    out.extend((0..block.ncols()).map(|k| (0..D).map(|d| gradient[d] * block[(d, k)]).sum::<f64>()));
}

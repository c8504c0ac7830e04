//! Configuration of the Parzen joint histogram.

use parzen_core::IntensityRange;
use serde::{Deserialize, Serialize};
use crate::error::{RegistrationError, Result};

/// Highest supported B-spline kernel order.
pub const MAX_KERNEL_ORDER: u32 = 3;

/// Parzen histogram configuration.
///
/// Deserializes with every field optional; missing fields take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParzenHistogramConfig {
    /// Number of bins along the fixed intensity axis.
    pub number_of_fixed_histogram_bins: usize,
    /// Number of bins along the moving intensity axis.
    pub number_of_moving_histogram_bins: usize,
    /// B-spline order of the fixed Parzen window (0–3).
    pub fixed_kernel_bspline_order: u32,
    /// B-spline order of the moving Parzen window (0–3).
    pub moving_kernel_bspline_order: u32,
    /// Minimum fraction of samples that must map to a valid moving position.
    pub required_ratio_of_valid_samples: f64,
    /// Fixed intensity range; observed from the samples when absent.
    pub fixed_intensity_range: Option<IntensityRange>,
    /// Moving intensity range; taken from the moving image when absent.
    pub moving_intensity_range: Option<IntensityRange>,
    /// Clamp fixed and moving intensities into the histogram range instead
    /// of letting out-of-range samples fall off the histogram.
    pub use_intensity_limiter: bool,
    /// Fraction of the intensity span added on both ends of each range
    /// before laying out the bins. Only used with the limiter enabled.
    pub limit_range_ratio: f64,
}

impl Default for ParzenHistogramConfig {
    fn default() -> Self {
        Self {
            number_of_fixed_histogram_bins: 32,
            number_of_moving_histogram_bins: 32,
            fixed_kernel_bspline_order: 0,
            moving_kernel_bspline_order: 3,
            required_ratio_of_valid_samples: 0.25,
            fixed_intensity_range: None,
            moving_intensity_range: None,
            use_intensity_limiter: true,
            limit_range_ratio: 0.01,
        }
    }
}

impl ParzenHistogramConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both bin counts.
    pub fn with_bins(mut self, fixed: usize, moving: usize) -> Self {
        self.number_of_fixed_histogram_bins = fixed;
        self.number_of_moving_histogram_bins = moving;
        self
    }

    /// Set both kernel orders.
    pub fn with_kernel_orders(mut self, fixed: u32, moving: u32) -> Self {
        self.fixed_kernel_bspline_order = fixed;
        self.moving_kernel_bspline_order = moving;
        self
    }

    /// Set the minimum valid-sample ratio.
    pub fn with_required_ratio_of_valid_samples(mut self, ratio: f64) -> Self {
        self.required_ratio_of_valid_samples = ratio;
        self
    }

    /// Pin the fixed intensity range instead of observing it.
    pub fn with_fixed_intensity_range(mut self, range: IntensityRange) -> Self {
        self.fixed_intensity_range = Some(range);
        self
    }

    /// Pin the moving intensity range instead of asking the moving image.
    pub fn with_moving_intensity_range(mut self, range: IntensityRange) -> Self {
        self.moving_intensity_range = Some(range);
        self
    }

    /// Enable or disable intensity clamping.
    pub fn with_intensity_limiter(mut self, enabled: bool) -> Self {
        self.use_intensity_limiter = enabled;
        self
    }

    /// Set the range extension ratio.
    pub fn with_limit_range_ratio(mut self, ratio: f64) -> Self {
        self.limit_range_ratio = ratio;
        self
    }

    /// Check bin counts, kernel orders and the sample ratio.
    pub fn validate(&self) -> Result<()> {
        validate_axis(
            "fixed",
            self.number_of_fixed_histogram_bins,
            self.fixed_kernel_bspline_order,
        )?;
        validate_axis(
            "moving",
            self.number_of_moving_histogram_bins,
            self.moving_kernel_bspline_order,
        )?;

        let ratio = self.required_ratio_of_valid_samples;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RegistrationError::invalid_configuration(format!(
                "required ratio of valid samples must lie in [0, 1], got {ratio}"
            )));
        }

        if !(self.limit_range_ratio.is_finite() && self.limit_range_ratio >= 0.0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "limit range ratio must be finite and non-negative, got {}",
                self.limit_range_ratio
            )));
        }

        for (axis, range) in [
            ("fixed", self.fixed_intensity_range),
            ("moving", self.moving_intensity_range),
        ] {
            if let Some(r) = range {
                if !(r.min.is_finite() && r.max.is_finite()) || r.min > r.max {
                    return Err(RegistrationError::invalid_configuration(format!(
                        "{axis} intensity range [{}, {}] is not a finite interval",
                        r.min, r.max
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Bins needed so that at least one bin interval remains between the
/// kernel padding on either side. Axes with fewer bins run a lower-order
/// kernel, see [`effective_kernel_order`].
pub fn minimum_bins(order: u32) -> usize {
    2 * (order as usize / 2) + 2
}

/// Highest order not above `order` whose padded window fits in `bins`.
///
/// A single-bin axis always uses the box kernel.
pub fn effective_kernel_order(bins: usize, order: u32) -> u32 {
    (0..=order)
        .rev()
        .find(|&o| minimum_bins(o) <= bins)
        .unwrap_or(0)
}

fn validate_axis(axis: &str, bins: usize, order: u32) -> Result<()> {
    if order > MAX_KERNEL_ORDER {
        return Err(RegistrationError::invalid_configuration(format!(
            "{axis} kernel B-spline order must be in 0..={MAX_KERNEL_ORDER}, got {order}"
        )));
    }
    if bins < 1 {
        return Err(RegistrationError::invalid_configuration(format!(
            "number of {axis} histogram bins must be at least 1"
        )));
    }
    Ok(())
}

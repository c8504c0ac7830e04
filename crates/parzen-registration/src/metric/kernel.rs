//! B-spline Parzen kernels.
//!
//! The value kernel of order `n` is the centred B-spline `βⁿ` with support
//! `(-(n+1)/2, (n+1)/2)`; shifted copies at integer offsets form a partition
//! of unity. The derivative kernel is `βⁿ'(u) = βⁿ⁻¹(u + ½) − βⁿ⁻¹(u − ½)`.

use crate::config::MAX_KERNEL_ORDER;
use crate::error::{RegistrationError, Result};

/// A compactly supported kernel evaluated at real offsets.
pub trait KernelFunction {
    fn evaluate(&self, u: f64) -> f64;

    /// Number of integer offsets with a (possibly) non-zero weight.
    fn support_size(&self) -> usize;
}

/// Centred B-spline of order 0–3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BSplineKernel {
    order: u32,
}

impl BSplineKernel {
    pub fn new(order: u32) -> Result<Self> {
        check_order(order)?;
        Ok(Self { order })
    }

    pub fn order(&self) -> u32 {
        self.order
    }
}

impl KernelFunction for BSplineKernel {
    fn evaluate(&self, u: f64) -> f64 {
        bspline(self.order, u)
    }

    fn support_size(&self) -> usize {
        self.order as usize + 1
    }
}

/// First derivative of the centred B-spline of order 0–3.
///
/// Order 0 is piecewise constant, its derivative is taken as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BSplineDerivativeKernel {
    order: u32,
}

impl BSplineDerivativeKernel {
    pub fn new(order: u32) -> Result<Self> {
        check_order(order)?;
        Ok(Self { order })
    }

    pub fn order(&self) -> u32 {
        self.order
    }
}

impl KernelFunction for BSplineDerivativeKernel {
    fn evaluate(&self, u: f64) -> f64 {
        match self.order {
            0 => 0.0,
            n => bspline(n - 1, u + 0.5) - bspline(n - 1, u - 0.5),
        }
    }

    fn support_size(&self) -> usize {
        self.order as usize + 1
    }
}

fn check_order(order: u32) -> Result<()> {
    if order > MAX_KERNEL_ORDER {
        return Err(RegistrationError::invalid_configuration(format!(
            "B-spline kernel order must be in 0..={MAX_KERNEL_ORDER}, got {order}"
        )));
    }
    Ok(())
}

fn bspline(order: u32, u: f64) -> f64 {
    let a = u.abs();
    match order {
        // Half-open so that exactly one integer offset carries the weight.
        0 => {
            if u > -0.5 && u <= 0.5 {
                1.0
            } else {
                0.0
            }
        }
        1 => {
            if a < 1.0 {
                1.0 - a
            } else {
                0.0
            }
        }
        2 => {
            if a < 0.5 {
                0.75 - a * a
            } else if a < 1.5 {
                0.5 * (1.5 - a) * (1.5 - a)
            } else {
                0.0
            }
        }
        3 => {
            if a < 1.0 {
                (4.0 - 6.0 * a * a + 3.0 * a * a * a) / 6.0
            } else if a < 2.0 {
                let t = 2.0 - a;
                t * t * t / 6.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// First integer offset of the Parzen window of `order` around `term`.
///
/// The window `start, start + 1, …, start + order` covers every integer
/// whose kernel weight can be non-zero, i.e. `start − term` lies in
/// `(−(order+1)/2, −(order+1)/2 + 1]`.
pub fn window_start(term: f64, order: u32) -> i64 {
    let half_support = (order as f64 + 1.0) / 2.0;
    let mut start = (term + 0.5 - order as f64 / 2.0).floor();
    // Rounding in `term + offset` can push the floor one step off.
    if start - term <= -half_support {
        start += 1.0;
    } else if start - term > 1.0 - half_support {
        start -= 1.0;
    }
    start as i64
}

/// Fill `values[k] = kernel(start + k − term)`.
pub fn evaluate_parzen_values<K: KernelFunction>(kernel: &K, term: f64, start: i64, values: &mut [f64]) {
    for (k, value) in values.iter_mut().enumerate() {
        *value = kernel.evaluate(start.saturating_add(k as i64) as f64 - term);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_values() {
        let k3 = BSplineKernel::new(3).unwrap();
        assert_relative_eq!(k3.evaluate(0.0), 2.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(k3.evaluate(1.0), 1.0 / 6.0, epsilon = 1e-15);
        assert_relative_eq!(k3.evaluate(-1.0), 1.0 / 6.0, epsilon = 1e-15);
        assert_eq!(k3.evaluate(2.0), 0.0);

        let k2 = BSplineKernel::new(2).unwrap();
        assert_relative_eq!(k2.evaluate(0.0), 0.75, epsilon = 1e-15);
        assert_relative_eq!(k2.evaluate(1.0), 0.125, epsilon = 1e-15);

        let k1 = BSplineKernel::new(1).unwrap();
        assert_relative_eq!(k1.evaluate(0.25), 0.75, epsilon = 1e-15);

        let k0 = BSplineKernel::new(0).unwrap();
        assert_eq!(k0.evaluate(0.5), 1.0);
        assert_eq!(k0.evaluate(-0.5), 0.0);
    }

    #[test]
    fn test_support_size() {
        for order in 0..=3 {
            assert_eq!(BSplineKernel::new(order).unwrap().support_size(), order as usize + 1);
            assert_eq!(BSplineDerivativeKernel::new(order).unwrap().support_size(), order as usize + 1);
        }
    }

    #[test]
    fn test_rejects_order() {
        assert!(matches!(
            BSplineKernel::new(4),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
        assert!(BSplineDerivativeKernel::new(7).is_err());
    }

    #[test]
    fn test_derivative_kernel_values() {
        let d3 = BSplineDerivativeKernel::new(3).unwrap();
        assert_relative_eq!(d3.evaluate(0.0), 0.0, epsilon = 1e-15);
        assert_relative_eq!(d3.evaluate(1.0), -0.5, epsilon = 1e-15);
        assert_relative_eq!(d3.evaluate(-1.0), 0.5, epsilon = 1e-15);

        let d1 = BSplineDerivativeKernel::new(1).unwrap();
        assert_eq!(d1.evaluate(-0.5), 1.0);
        assert_eq!(d1.evaluate(0.5), -1.0);

        let d0 = BSplineDerivativeKernel::new(0).unwrap();
        assert_eq!(d0.evaluate(0.1), 0.0);
    }

    #[test]
    fn test_derivative_kernel_matches_differences() {
        let h = 1e-6;
        for order in [2u32, 3] {
            let kernel = BSplineKernel::new(order).unwrap();
            let derivative = BSplineDerivativeKernel::new(order).unwrap();
            let mut u = -2.3;
            while u < 2.3 {
                let fd = (kernel.evaluate(u + h) - kernel.evaluate(u - h)) / (2.0 * h);
                assert!(
                    (fd - derivative.evaluate(u)).abs() < 1e-5,
                    "order {order} at {u}: {fd} vs {}",
                    derivative.evaluate(u)
                );
                u += 0.0625 + 1e-3;
            }
        }
    }

    #[test]
    fn test_window_start() {
        assert_eq!(window_start(2.3, 0), 2);
        assert_eq!(window_start(2.7, 0), 3);
        assert_eq!(window_start(2.3, 1), 2);
        assert_eq!(window_start(2.3, 2), 1);
        assert_eq!(window_start(2.7, 2), 2);
        assert_eq!(window_start(2.3, 3), 1);
        assert_eq!(window_start(-0.3, 3), -2);
    }

    #[test]
    fn test_window_start_rounding_guard() {
        // 0.49999999999999994 + 0.5 rounds up to 1.0
        let term = 0.49999999999999994;
        let start = window_start(term, 0);
        let u = start as f64 - term;
        assert!(u > -0.5 && u <= 0.5);
        let mut values = [0.0];
        evaluate_parzen_values(&BSplineKernel::new(0).unwrap(), term, start, &mut values);
        assert_eq!(values[0], 1.0);
    }

    #[test]
    fn test_cubic_window_at_integer() {
        let kernel = BSplineKernel::new(3).unwrap();
        let start = window_start(5.0, 3);
        let mut values = [0.0; 4];
        evaluate_parzen_values(&kernel, 5.0, start, &mut values);
        // window 4..=7 around 5.0
        assert_eq!(start, 4);
        assert_relative_eq!(values[0], 1.0 / 6.0, epsilon = 1e-15);
        assert_relative_eq!(values[1], 2.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(values[2], 1.0 / 6.0, epsilon = 1e-15);
        assert_eq!(values[3], 0.0);
    }

    #[test]
    fn test_window_at_saturated_start() {
        let kernel = BSplineKernel::new(3).unwrap();
        let start = window_start(1e21, 3);
        assert_eq!(start, i64::MAX);
        let mut values = [1.0; 4];
        evaluate_parzen_values(&kernel, 1e21, start, &mut values);
        assert!(values.iter().all(|&v| v == 0.0));
    }
}

//! Regular-grid image with n-linear interpolation.

use crate::image::trait_::{IntensityRange, MovingImage, MovingMask};
use crate::sample::FixedSample;
use crate::spatial::{Point, Vector};

/// Scalar image on an axis-aligned regular grid.
///
/// # Coordinate Systems
/// * **Index Space**: `index[d]` in `0..shape[d]`, the first axis varies fastest
///   in the data buffer.
/// * **Physical Space**: `origin + index * spacing`, componentwise.
///
/// Interpolation is n-linear; the gradient is the exact gradient of the
/// interpolant inside each cell.
#[derive(Debug, Clone)]
pub struct GridImage<const D: usize> {
    data: Vec<f64>,
    shape: [usize; D],
    strides: [usize; D],
    origin: Point<D>,
    spacing: Vector<D>,
    range: IntensityRange,
}

impl<const D: usize> GridImage<D> {
    /// Create a new image from a data buffer.
    ///
    /// # Arguments
    /// * `data` - Pixel values, first axis fastest
    /// * `shape` - Number of pixels along each axis
    /// * `origin` - Physical position of index 0
    /// * `spacing` - Physical distance between pixels along each axis
    pub fn new(data: Vec<f64>, shape: [usize; D], origin: Point<D>, spacing: Vector<D>) -> Self {
        let len: usize = shape.iter().product();
        assert_eq!(data.len(), len, "Data length must match the product of the shape");
        assert!(shape.iter().all(|&s| s > 0), "Every axis must hold at least one pixel");
        assert!(
            (0..D).all(|d| spacing[d] > 0.0),
            "Spacing must be strictly positive"
        );

        let mut strides = [1usize; D];
        for d in 1..D {
            strides[d] = strides[d - 1] * shape[d - 1];
        }
        let range = IntensityRange::from_values(data.iter().copied())
            .unwrap_or(IntensityRange::new(0.0, 0.0));

        Self {
            data,
            shape,
            strides,
            origin,
            spacing,
            range,
        }
    }

    /// Create an image by evaluating `f` at every pixel's physical position.
    pub fn from_fn<F>(shape: [usize; D], origin: Point<D>, spacing: Vector<D>, f: F) -> Self
    where
        F: Fn(&Point<D>) -> f64,
    {
        let len: usize = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        for linear in 0..len {
            let point = Self::point_for(linear, &shape, &origin, &spacing);
            data.push(f(&point));
        }
        Self::new(data, shape, origin, spacing)
    }

    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    pub fn origin(&self) -> Point<D> {
        self.origin
    }

    pub fn spacing(&self) -> Vector<D> {
        self.spacing
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Physical position of the pixel with the given linear buffer offset.
    pub fn point_at(&self, linear: usize) -> Point<D> {
        Self::point_for(linear, &self.shape, &self.origin, &self.spacing)
    }

    /// Every pixel as a fixed sample, in buffer order.
    pub fn samples(&self) -> Vec<FixedSample<D>> {
        self.data
            .iter()
            .enumerate()
            .map(|(linear, &value)| FixedSample::new(self.point_at(linear), value))
            .collect()
    }

    /// Continuous index of a physical point.
    pub fn continuous_index(&self, point: &Point<D>) -> [f64; D] {
        let mut index = [0.0; D];
        for d in 0..D {
            index[d] = (point[d] - self.origin[d]) / self.spacing[d];
        }
        index
    }

    fn point_for(linear: usize, shape: &[usize; D], origin: &Point<D>, spacing: &Vector<D>) -> Point<D> {
        let mut point = *origin;
        let mut rest = linear;
        for d in 0..D {
            let index = rest % shape[d];
            rest /= shape[d];
            point[d] += index as f64 * spacing[d];
        }
        point
    }

    /// n-linear interpolation over the 2^D corners of the enclosing cell.
    fn interpolate(&self, point: &Point<D>, with_gradient: bool) -> Option<(f64, Vector<D>)> {
        let index = self.continuous_index(point);
        let mut base = [0usize; D];
        let mut frac = [0.0f64; D];

        for d in 0..D {
            let upper = (self.shape[d] - 1) as f64;
            // Negated form also rejects NaN.
            if !(index[d] >= 0.0 && index[d] <= upper) {
                return None;
            }
            if self.shape[d] == 1 {
                continue;
            }
            let b = (index[d].floor() as usize).min(self.shape[d] - 2);
            base[d] = b;
            frac[d] = index[d] - b as f64;
        }

        let mut value = 0.0;
        let mut gradient = Vector::zeros();
        for corner in 0..(1usize << D) {
            let mut offset = 0;
            let mut weight = 1.0;
            for d in 0..D {
                let upper = (corner >> d) & 1 == 1;
                let i = if upper && self.shape[d] > 1 { base[d] + 1 } else { base[d] };
                offset += i * self.strides[d];
                weight *= if upper { frac[d] } else { 1.0 - frac[d] };
            }
            let sample = self.data[offset];
            value += weight * sample;

            if with_gradient {
                for d in 0..D {
                    let mut partial = if (corner >> d) & 1 == 1 { 1.0 } else { -1.0 };
                    for e in (0..D).filter(|&e| e != d) {
                        partial *= if (corner >> e) & 1 == 1 { frac[e] } else { 1.0 - frac[e] };
                    }
                    gradient[d] += partial * sample / self.spacing[d];
                }
            }
        }

        Some((value, gradient))
    }
}

impl<const D: usize> MovingImage<D> for GridImage<D> {
    fn evaluate(&self, point: &Point<D>) -> Option<f64> {
        self.interpolate(point, false).map(|(value, _)| value)
    }

    fn evaluate_with_gradient(&self, point: &Point<D>) -> Option<(f64, Vector<D>)> {
        self.interpolate(point, true)
    }

    fn intensity_range(&self) -> IntensityRange {
        self.range
    }
}

/// A grid image read as a soft mask: interpolated values clamped to `[0, 1]`,
/// zero outside the grid.
impl<const D: usize> MovingMask<D> for GridImage<D> {
    fn value_and_derivative(&self, point: &Point<D>) -> (f64, Vector<D>) {
        match self.interpolate(point, true) {
            Some((value, gradient)) if value > 0.0 && value < 1.0 => (value, gradient),
            Some((value, _)) => (value.clamp(0.0, 1.0), Vector::zeros()),
            None => (0.0, Vector::zeros()),
        }
    }
}

#![allow(dead_code)]

use parzen_core::{
    FixedSample, IntensityRange, MovingImage, MovingMask, Point, SparseJacobian, Transform, Vector,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `sin(0.3x) + 0.5 cos(0.2y) + 0.1x`, defined on the open square `(-10, 10)²`.
pub struct SmoothImage;

impl SmoothImage {
    pub fn value_at(x: f64, y: f64) -> f64 {
        (0.3 * x).sin() + 0.5 * (0.2 * y).cos() + 0.1 * x
    }
}

impl MovingImage<2> for SmoothImage {
    fn evaluate(&self, point: &Point<2>) -> Option<f64> {
        self.evaluate_with_gradient(point).map(|(v, _)| v)
    }

    fn evaluate_with_gradient(&self, point: &Point<2>) -> Option<(f64, Vector<2>)> {
        let (x, y) = (point[0], point[1]);
        if !(x > -10.0 && x < 10.0 && y > -10.0 && y < 10.0) {
            return None;
        }
        let gradient = Vector::new([0.3 * (0.3 * x).cos() + 0.1, -0.1 * (0.2 * y).sin()]);
        Some((Self::value_at(x, y), gradient))
    }

    fn intensity_range(&self) -> IntensityRange {
        IntensityRange::new(-2.5, 2.5)
    }
}

/// [`SmoothImage`] with a block of `1e21` intensities for `x > 5`. Reports
/// the clean intensity range.
pub struct OutlierImage;

impl OutlierImage {
    pub const OUTLIER: f64 = 1e21;

    pub fn is_outlier(x: f64) -> bool {
        x > 5.0
    }
}

impl MovingImage<2> for OutlierImage {
    fn evaluate(&self, point: &Point<2>) -> Option<f64> {
        self.evaluate_with_gradient(point).map(|(v, _)| v)
    }

    fn evaluate_with_gradient(&self, point: &Point<2>) -> Option<(f64, Vector<2>)> {
        let (value, gradient) = SmoothImage.evaluate_with_gradient(point)?;
        if Self::is_outlier(point[0]) {
            Some((Self::OUTLIER, Vector::zeros()))
        } else {
            Some((value, gradient))
        }
    }

    fn intensity_range(&self) -> IntensityRange {
        SmoothImage.intensity_range()
    }
}

/// `100 (sin(x/10) cos(y/12) + 1)` on `[0, 63]²`.
pub struct WaveImage;

impl WaveImage {
    pub fn value_at(x: f64, y: f64) -> f64 {
        100.0 * ((x / 10.0).sin() * (y / 12.0).cos() + 1.0)
    }
}

impl MovingImage<2> for WaveImage {
    fn evaluate(&self, point: &Point<2>) -> Option<f64> {
        self.evaluate_with_gradient(point).map(|(v, _)| v)
    }

    fn evaluate_with_gradient(&self, point: &Point<2>) -> Option<(f64, Vector<2>)> {
        let (x, y) = (point[0], point[1]);
        if !((0.0..=63.0).contains(&x) && (0.0..=63.0).contains(&y)) {
            return None;
        }
        let gradient = Vector::new([
            10.0 * (x / 10.0).cos() * (y / 12.0).cos(),
            -100.0 / 12.0 * (x / 10.0).sin() * (y / 12.0).sin(),
        ]);
        Some((Self::value_at(x, y), gradient))
    }

    fn intensity_range(&self) -> IntensityRange {
        IntensityRange::new(0.0, 200.0)
    }
}

/// Soft mask `0.5 + 0.4 tanh(0.3x)`, strictly inside `(0, 1)`.
pub struct TanhMask;

impl MovingMask<2> for TanhMask {
    fn value_and_derivative(&self, point: &Point<2>) -> (f64, Vector<2>) {
        let t = (0.3 * point[0]).tanh();
        (0.5 + 0.4 * t, Vector::new([0.4 * 0.3 * (1.0 - t * t), 0.0]))
    }
}

/// Five parameters; only 1 and 3 move the point: `T(x) = (x0 + p1, x1 + p3)`.
pub struct SparseTranslation;

impl Transform<2> for SparseTranslation {
    fn number_of_parameters(&self) -> usize {
        5
    }

    fn transform_point(&self, parameters: &[f64], point: &Point<2>) -> Option<Point<2>> {
        Some(Point::new([point[0] + parameters[1], point[1] + parameters[3]]))
    }

    fn jacobian(&self, _parameters: &[f64], _point: &Point<2>) -> SparseJacobian {
        SparseJacobian::new(vec![1, 3], nalgebra::DMatrix::identity(2, 2))
    }
}

/// `count` samples drawn uniformly from `[lo, hi]²`, carrying `f` at their position.
pub fn random_samples<F>(count: usize, lo: f64, hi: f64, seed: u64, f: F) -> Vec<FixedSample<2>>
where
    F: Fn(f64, f64) -> f64,
{
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = rng.gen_range(lo..hi);
            let y = rng.gen_range(lo..hi);
            FixedSample::new(Point::new([x, y]), f(x, y))
        })
        .collect()
}

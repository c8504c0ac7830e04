pub mod image;
pub mod sample;
pub mod spatial;
pub mod transform;

pub use image::{GridImage, IntensityRange, MovingImage, MovingMask};
pub use sample::FixedSample;
pub use spatial::{Point, Vector};
pub use transform::{AffineTransform, SparseJacobian, Transform, TranslationTransform};

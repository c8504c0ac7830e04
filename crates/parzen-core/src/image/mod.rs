//! Image-side collaborators of the histogram metrics.
//!
//! The metrics only see images through the [`MovingImage`] and
//! [`MovingMask`] traits. [`GridImage`] is a regular-grid implementation
//! with n-linear interpolation, used by tests and demos.

pub mod image;
pub mod trait_;

pub use image::GridImage;
pub use trait_::{IntensityRange, MovingImage, MovingMask};

//! nalgebra-backed points and vectors.

pub mod point;
pub mod vector;

pub use point::Point;
pub use vector::Vector;

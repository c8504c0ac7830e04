//! Transform types and operations.
//!
//! This module provides the parametric transform trait consumed by the
//! metrics, together with its sparse Jacobian representation.

pub mod affine;
pub mod trait_;
pub mod translation;

pub use affine::AffineTransform;
pub use trait_::{SparseJacobian, Transform};
pub use translation::TranslationTransform;

//! Parzen-window joint histogram metrics for image registration.
//!
//! A [`metric::ParzenJointHistogram`] accumulates a B-spline smoothed joint
//! histogram of fixed and moving intensities (and, on request, its
//! derivative with respect to the transform parameters). The metric
//! strategies compose it:
//!
//! * [`metric::ParzenWindowNormalizedMutualInformation`] returns
//!   `-(H(F) + H(M)) / H(F, M)`.
//! * [`metric::ParzenWindowMutualInformation`] returns `-MI`.
//!
//! Both are minimized by an external optimizer and expose closed-form
//! gradients.

pub mod config;
pub mod error;
pub mod metric;
pub mod validation;

pub use config::ParzenHistogramConfig;
pub use error::{RegistrationError, Result};
pub use metric::{
    Metric, MetricInput, ParzenJointHistogram, ParzenWindowMutualInformation,
    ParzenWindowNormalizedMutualInformation,
};

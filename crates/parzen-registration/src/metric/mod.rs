//! Parzen-window information-theoretic metrics.
//!
//! [`ParzenJointHistogram`] builds the joint intensity histogram and its
//! parameter derivatives; the metrics reduce it to a scalar objective.

pub mod entropy;
pub mod histogram;
pub mod kernel;
pub mod mutual_information;
pub mod normalization;
pub mod normalized_mutual_information;
pub mod trait_;

pub use entropy::{EntropyDerivatives, Entropies};
pub use histogram::{BinLayout, ParzenJointHistogram, PassSummary, SampleDerivatives, MASK_THRESHOLD};
pub use kernel::{BSplineDerivativeKernel, BSplineKernel, KernelFunction};
pub use mutual_information::ParzenWindowMutualInformation;
pub use normalization::NormalizationTracker;
pub use normalized_mutual_information::ParzenWindowNormalizedMutualInformation;
pub use trait_::{Metric, MetricInput};

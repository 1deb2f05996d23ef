//! Error types for voxmetric.

use crate::volume::Shape3;
use thiserror::Error;

/// Result alias for voxmetric operations.
pub type VoxMetricResult<T> = std::result::Result<T, VoxMetricError>;

/// Errors that can occur when computing windowed metrics.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum VoxMetricError {
    /// Input volumes or mask do not share one shape.
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: Shape3,
        got: Shape3,
    },
    /// An input volume holds NaN or an infinity.
    #[error("non-finite value in {what} at {index:?}")]
    NonFiniteVoxel {
        what: &'static str,
        index: [usize; 3],
    },
    /// Configuration values are out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: &'static str },
    /// A required exact-MI backend is missing or cannot be loaded.
    #[error("dependency unavailable: {dependency} ({hint})")]
    DependencyUnavailable { dependency: String, hint: String },
    /// Two patches cannot be compared.
    #[error("invalid patch: {reason}")]
    InvalidPatch { reason: &'static str },
    /// Volume dimensions are zero or overflow.
    #[error("invalid dimensions: {dims:?}")]
    InvalidDimensions { dims: [usize; 3] },
    /// The backing buffer is too small for the requested shape.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The exact-MI backend failed while evaluating a patch pair.
    #[error("exact mutual information failed: {reason}")]
    ExactMi { reason: String },
    /// The worker pool could not be created.
    #[error("thread pool: {reason}")]
    ThreadPool { reason: String },
}

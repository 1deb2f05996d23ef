//! Low-level building blocks for custom windowed pipelines.
//!
//! These types expose the patch kernels, the reusable joint histogram and
//! the window geometry for callers that drive their own voxel loops. Most
//! users should prefer [`crate::compute_metrics`].

pub use crate::kernel::scalar::ScalarKernel;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::SimdKernel;
pub use crate::kernel::{KernelStrategy, PatchKernel};
pub use crate::metric::{IntensityRange, JointHistogram, JointRange, MAX_BINS, MIN_BINS};
pub use crate::schedule::{partition_slabs, Slab};
pub use crate::volume::Window;

//! voxmetric computes windowed similarity maps between two 3D volumes.
//!
//! For every voxel inside a mask, the crate compares the clipped cubic
//! neighborhoods of two co-registered volumes and writes mean squared error,
//! Pearson correlation and mutual information into three output volumes.
//! Mutual information comes either from a fixed-range joint histogram or
//! from a pluggable exact backend ([`ExactMi`]). Parallelism over `x` slabs
//! is available via the `rayon` feature and an `f64x4` kernel via `simd`.

pub mod compute;
pub mod kernel;
pub mod lowlevel;
pub mod metric;
pub mod schedule;
mod trace;
pub mod util;
pub mod volume;

pub use compute::{compute_metrics, MetricConfig, MetricMaps, MetricStats, Mode};
pub use kernel::KernelStrategy;
pub use metric::{
    correlation, mse, mutual_information_approx, DegenerateCounts, EmpiricalMutualInformation,
    ExactMi, FnExactMi, IntensityRange, JointRange, Patch,
};
pub use schedule::{partition_slabs, Slab};
pub use util::{VoxMetricError, VoxMetricResult};
pub use volume::{OwnedVolume, Shape3, VolumeView, Window};

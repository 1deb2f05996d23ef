//! Patch-level metric functions.
//!
//! These are the reference implementations of the three windowed metrics.
//! They validate their inputs and accumulate in `f64`; the windowed kernel
//! calls the same math through [`crate::kernel::PatchKernel`] on gathered
//! scratch buffers.

use crate::kernel::scalar::ScalarKernel;
use crate::kernel::PatchKernel;
use crate::util::{VoxMetricError, VoxMetricResult};

pub mod exact;
mod histogram;

pub use exact::{EmpiricalMutualInformation, ExactMi, FnExactMi};
pub use histogram::{IntensityRange, JointHistogram, JointRange, MAX_BINS, MIN_BINS};

/// Flattened patch values plus the extent of the window they came from.
#[derive(Clone, Copy, Debug)]
pub struct Patch<'a> {
    values: &'a [f32],
    extent: [usize; 3],
}

impl<'a> Patch<'a> {
    /// Creates a patch; `values.len()` must equal the product of `extent`.
    pub fn new(values: &'a [f32], extent: [usize; 3]) -> VoxMetricResult<Self> {
        let expected = extent[0]
            .checked_mul(extent[1])
            .and_then(|v| v.checked_mul(extent[2]))
            .ok_or(VoxMetricError::InvalidPatch {
                reason: "extent overflows",
            })?;
        if values.len() != expected {
            return Err(VoxMetricError::InvalidPatch {
                reason: "value count does not match extent",
            });
        }
        Ok(Self { values, extent })
    }

    pub(crate) fn new_unchecked(values: &'a [f32], extent: [usize; 3]) -> Self {
        debug_assert_eq!(values.len(), extent[0] * extent[1] * extent[2]);
        Self { values, extent }
    }

    /// Returns the flattened values in C order.
    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    /// Returns the window extent `[nx, ny, nz]`.
    pub fn extent(&self) -> [usize; 3] {
        self.extent
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` for a patch without values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Occurrence counts of degenerate windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DegenerateCounts {
    /// Windows where either patch had zero variance (CORR set to `NaN`).
    pub corr: usize,
    /// Windows whose intensity range had zero width (MI set to `0`).
    pub mi: usize,
}

impl std::ops::AddAssign for DegenerateCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.corr += rhs.corr;
        self.mi += rhs.mi;
    }
}

pub(crate) fn check_pair(a: &Patch<'_>, b: &Patch<'_>) -> VoxMetricResult<()> {
    if a.extent != b.extent {
        return Err(VoxMetricError::InvalidPatch {
            reason: "patch extents differ",
        });
    }
    if a.is_empty() {
        return Err(VoxMetricError::InvalidPatch {
            reason: "empty patch",
        });
    }
    Ok(())
}

/// Mean of the elementwise squared difference of two patches.
pub fn mse(a: Patch<'_>, b: Patch<'_>) -> VoxMetricResult<f32> {
    check_pair(&a, &b)?;
    Ok(ScalarKernel::mse(a.values, b.values))
}

/// Pearson correlation of two flattened patches.
///
/// Returns `NaN` and bumps `counts.corr` when either patch is constant.
pub fn correlation(
    a: Patch<'_>,
    b: Patch<'_>,
    counts: &mut DegenerateCounts,
) -> VoxMetricResult<f32> {
    check_pair(&a, &b)?;
    match ScalarKernel::correlation(a.values, b.values, 0.0) {
        Some(r) => Ok(r),
        None => {
            counts.corr += 1;
            Ok(f32::NAN)
        }
    }
}

/// Histogram-based mutual information in nats.
///
/// `range` carries the global intensity range of each source volume so the
/// binning is identical at every voxel. A zero-width range yields `0` and
/// bumps `counts.mi`.
pub fn mutual_information_approx(
    a: Patch<'_>,
    b: Patch<'_>,
    bins: usize,
    range: JointRange,
    counts: &mut DegenerateCounts,
) -> VoxMetricResult<f32> {
    check_pair(&a, &b)?;
    let mut hist = JointHistogram::new(bins)?;
    match hist.mutual_information(a.values, b.values, range) {
        Some(mi) => Ok(mi),
        None => {
            counts.mi += 1;
            Ok(0.0)
        }
    }
}

//! Windowed metric kernel over one slab of the voxel grid.

use crate::compute::MetricStats;
use crate::kernel::PatchKernel;
use crate::metric::{ExactMi, JointHistogram, JointRange, Patch};
use crate::schedule::{Slab, SlabMaps};
use crate::util::{VoxMetricError, VoxMetricResult};
use crate::volume::{Shape3, VolumeView, Window};

/// How MI is produced for each masked voxel.
#[derive(Clone, Copy)]
pub(crate) enum MiPath<'e> {
    /// In-kernel fixed-range histogram.
    Approx { bins: usize, range: JointRange },
    /// Delegated to an exact backend, one call per voxel.
    Exact(&'e dyn ExactMi),
}

/// Per-slab MI state; the histogram scratch is reused across voxels.
enum MiEval<'e> {
    Approx {
        hist: JointHistogram,
        range: JointRange,
    },
    Exact(&'e dyn ExactMi),
}

/// Read-only inputs shared by every slab.
#[derive(Clone, Copy)]
pub(crate) struct KernelInputs<'a> {
    pub(crate) volume_a: VolumeView<'a, f32>,
    pub(crate) volume_b: VolumeView<'a, f32>,
    pub(crate) mask: VolumeView<'a, bool>,
    pub(crate) radius: usize,
    pub(crate) min_variance: f64,
    pub(crate) mi: MiPath<'a>,
}

/// Largest clipped window any voxel of `shape` can have.
///
/// Bounded by the volume itself, so any radius is safe.
fn max_window_len(radius: usize, shape: Shape3) -> usize {
    let side = radius.saturating_mul(2).saturating_add(1);
    side.min(shape.nx) * side.min(shape.ny) * side.min(shape.nz)
}

/// Runs the kernel over every voxel of `slab`, writing into `maps`.
///
/// `maps` holds exactly the output range of the slab, indexed from the
/// slab's first `x` plane.
pub(crate) fn run_slab<K: PatchKernel>(
    inputs: &KernelInputs<'_>,
    slab: &Slab,
    maps: SlabMaps<'_>,
) -> VoxMetricResult<MetricStats> {
    let shape = inputs.volume_a.shape();
    let mask = inputs.mask.as_slice();
    let plane = shape.plane_len();
    let capacity = max_window_len(inputs.radius, shape);

    let mut patch_a = Vec::with_capacity(capacity);
    let mut patch_b = Vec::with_capacity(capacity);
    let mut mi_eval = match inputs.mi {
        MiPath::Approx { bins, range } => MiEval::Approx {
            hist: JointHistogram::with_bins(bins),
            range,
        },
        MiPath::Exact(backend) => MiEval::Exact(backend),
    };
    let mut stats = MetricStats::default();

    for x in slab.x.clone() {
        let local_base = (x - slab.x.start) * plane;
        for y in 0..shape.ny {
            for z in 0..shape.nz {
                let local = local_base + y * shape.nz + z;
                if !mask[shape.index(x, y, z)] {
                    maps.mse[local] = f32::NAN;
                    maps.corr[local] = f32::NAN;
                    maps.mi[local] = f32::NAN;
                    continue;
                }

                let window = Window::around(x, y, z, inputs.radius, shape);
                window.gather(inputs.volume_a, &mut patch_a);
                window.gather(inputs.volume_b, &mut patch_b);

                maps.mse[local] = K::mse(&patch_a, &patch_b);
                maps.corr[local] =
                    match K::correlation(&patch_a, &patch_b, inputs.min_variance) {
                        Some(r) => r,
                        None => {
                            stats.degenerate.corr += 1;
                            f32::NAN
                        }
                    };

                maps.mi[local] = match &mut mi_eval {
                    MiEval::Approx { hist, range } => {
                        match hist.mutual_information(&patch_a, &patch_b, *range) {
                            Some(mi) => mi,
                            None => {
                                stats.degenerate.mi += 1;
                                0.0
                            }
                        }
                    }
                    MiEval::Exact(backend) => {
                        let extent = window.extent();
                        let mi = backend.evaluate(
                            Patch::new_unchecked(&patch_a, extent),
                            Patch::new_unchecked(&patch_b, extent),
                        )?;
                        if mi.is_nan() {
                            return Err(VoxMetricError::ExactMi {
                                reason: format!(
                                    "backend `{}` returned NaN at ({x}, {y}, {z})",
                                    backend.name()
                                ),
                            });
                        }
                        mi.max(0.0)
                    }
                };
                stats.evaluated += 1;
            }
        }
    }

    Ok(stats)
}

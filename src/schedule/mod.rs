//! Slab partitioning and drivers for the windowed kernel.
//!
//! The voxel grid is cut along `x` into contiguous slabs. Because the
//! layout is C order, each slab owns a contiguous range of every output
//! buffer; [`split_maps`] hands out those ranges as disjoint `&mut` slices
//! so workers write without any synchronization.

use crate::compute::MetricStats;
use crate::kernel::windowed::{run_slab, KernelInputs};
use crate::kernel::PatchKernel;
use crate::trace::trace_span;
use crate::util::VoxMetricResult;
use std::ops::Range;

#[cfg(feature = "rayon")]
pub(crate) mod rayon;

/// Contiguous range of `x` planes processed by one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slab {
    /// Position of the slab in the partition.
    pub index: usize,
    /// Half-open range of `x` planes.
    pub x: Range<usize>,
}

/// Splits `0..extent` into at most `workers` contiguous, disjoint slabs.
///
/// Slab sizes differ by at most one plane; the first `extent % n` slabs get
/// the extra plane. `workers` is clamped to `1..=extent`, and an empty
/// extent yields no slab.
pub fn partition_slabs(extent: usize, workers: usize) -> Vec<Slab> {
    if extent == 0 {
        return Vec::new();
    }
    let count = workers.clamp(1, extent);
    let base = extent / count;
    let extra = extent % count;

    let mut slabs = Vec::with_capacity(count);
    let mut start = 0;
    for index in 0..count {
        let len = base + usize::from(index < extra);
        slabs.push(Slab {
            index,
            x: start..start + len,
        });
        start += len;
    }
    slabs
}

/// Output ranges of the three maps owned by one slab.
pub(crate) struct SlabMaps<'m> {
    pub(crate) mse: &'m mut [f32],
    pub(crate) corr: &'m mut [f32],
    pub(crate) mi: &'m mut [f32],
}

/// Cuts the three output buffers into per-slab chunks.
///
/// `slabs` must come from [`partition_slabs`] so they are ordered and
/// cover the buffers; `plane_len` is the voxel count of one `x` plane.
pub(crate) fn split_maps<'m>(
    mut mse: &'m mut [f32],
    mut corr: &'m mut [f32],
    mut mi: &'m mut [f32],
    slabs: &[Slab],
    plane_len: usize,
) -> Vec<SlabMaps<'m>> {
    let mut out = Vec::with_capacity(slabs.len());
    for slab in slabs {
        let len = slab.x.len() * plane_len;
        let (mse_head, mse_tail) = std::mem::take(&mut mse).split_at_mut(len);
        let (corr_head, corr_tail) = std::mem::take(&mut corr).split_at_mut(len);
        let (mi_head, mi_tail) = std::mem::take(&mut mi).split_at_mut(len);
        out.push(SlabMaps {
            mse: mse_head,
            corr: corr_head,
            mi: mi_head,
        });
        mse = mse_tail;
        corr = corr_tail;
        mi = mi_tail;
    }
    out
}

/// Runs every slab on the calling thread, in order.
pub(crate) fn run_sequential<K: PatchKernel>(
    inputs: &KernelInputs<'_>,
    slabs: &[Slab],
    maps: Vec<SlabMaps<'_>>,
) -> VoxMetricResult<MetricStats> {
    let mut stats = MetricStats::default();
    for (slab, slab_maps) in slabs.iter().zip(maps) {
        let _span = trace_span!("slab", index = slab.index, planes = slab.x.len()).entered();
        stats += run_slab::<K>(inputs, slab, slab_maps)?;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::{partition_slabs, split_maps};

    #[test]
    fn partition_covers_extent_without_overlap() {
        for extent in 1..40 {
            for workers in 1..12 {
                let slabs = partition_slabs(extent, workers);
                assert_eq!(slabs.len(), workers.min(extent));
                let mut next = 0;
                for (idx, slab) in slabs.iter().enumerate() {
                    assert_eq!(slab.index, idx);
                    assert_eq!(slab.x.start, next);
                    assert!(!slab.x.is_empty());
                    next = slab.x.end;
                }
                assert_eq!(next, extent);

                let min = slabs.iter().map(|s| s.x.len()).min().unwrap();
                let max = slabs.iter().map(|s| s.x.len()).max().unwrap();
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn partition_clamps_worker_count() {
        assert!(partition_slabs(0, 4).is_empty());
        assert_eq!(partition_slabs(5, 0).len(), 1);
        assert_eq!(partition_slabs(3, 16).len(), 3);
    }

    #[test]
    fn split_maps_hands_out_disjoint_chunks() {
        let plane = 6;
        let slabs = partition_slabs(7, 3);
        let mut mse = vec![0.0f32; 7 * plane];
        let mut corr = vec![0.0f32; 7 * plane];
        let mut mi = vec![0.0f32; 7 * plane];
        {
            let chunks = split_maps(&mut mse, &mut corr, &mut mi, &slabs, plane);
            assert_eq!(chunks.len(), 3);
            for (slab, chunk) in slabs.iter().zip(chunks) {
                assert_eq!(chunk.mse.len(), slab.x.len() * plane);
                chunk.mse.fill(slab.index as f32 + 1.0);
                chunk.corr.fill(1.0);
                chunk.mi.fill(1.0);
            }
        }
        for slab in &slabs {
            for x in slab.x.clone() {
                for v in &mse[x * plane..(x + 1) * plane] {
                    assert_eq!(*v, slab.index as f32 + 1.0);
                }
            }
        }
        assert!(corr.iter().chain(&mi).all(|&v| v == 1.0));
    }
}

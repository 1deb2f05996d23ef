//! Rayon-parallel slab driver (feature-gated).
//!
//! Each slab runs as an independent rayon task on its own disjoint output
//! chunk. A dedicated pool is built when the caller pins a thread count;
//! otherwise the global pool is used.

use crate::compute::MetricStats;
use crate::kernel::windowed::{run_slab, KernelInputs};
use crate::kernel::PatchKernel;
use crate::schedule::{Slab, SlabMaps};
use crate::util::{VoxMetricError, VoxMetricResult};
use rayon::prelude::*;

/// Number of workers the driver will use for `threads`.
pub(crate) fn worker_count(threads: Option<usize>) -> usize {
    threads.unwrap_or_else(rayon::current_num_threads).max(1)
}

/// Runs all slabs in parallel and merges their statistics.
pub(crate) fn run_parallel<K: PatchKernel>(
    inputs: &KernelInputs<'_>,
    slabs: &[Slab],
    maps: Vec<SlabMaps<'_>>,
    threads: Option<usize>,
) -> VoxMetricResult<MetricStats> {
    let jobs: Vec<(&Slab, SlabMaps<'_>)> = slabs.iter().zip(maps).collect();
    let run = move || {
        jobs.into_par_iter()
            .map(|(slab, slab_maps)| run_slab::<K>(inputs, slab, slab_maps))
            .collect::<VoxMetricResult<Vec<MetricStats>>>()
    };

    let per_slab = match threads {
        Some(count) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(count)
                .build()
                .map_err(|err| VoxMetricError::ThreadPool {
                    reason: err.to_string(),
                })?;
            pool.install(run)?
        }
        None => run()?,
    };

    Ok(per_slab
        .into_iter()
        .fold(MetricStats::default(), |mut acc, stats| {
            acc += stats;
            acc
        }))
}

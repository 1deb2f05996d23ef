//! Validation and orchestration of a full metric computation.
//!
//! [`compute_metrics`] checks configuration, shapes and the exact-MI
//! backend before touching any voxel, allocates the three output maps,
//! partitions the grid into slabs and runs the windowed kernel either on
//! the calling thread or on rayon workers.

use crate::kernel::scalar::ScalarKernel;
#[cfg(feature = "simd")]
use crate::kernel::simd::SimdKernel;
use crate::kernel::windowed::{KernelInputs, MiPath};
use crate::kernel::{KernelStrategy, PatchKernel};
use crate::metric::{DegenerateCounts, ExactMi, IntensityRange, JointRange, MAX_BINS, MIN_BINS};
use crate::schedule::{partition_slabs, split_maps, Slab, SlabMaps};
use crate::trace::{trace_event, trace_span};
use crate::util::{VoxMetricError, VoxMetricResult};
use crate::volume::{OwnedVolume, Shape3, VolumeView};

/// Selects how mutual information is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// In-kernel fixed-range histogram MI.
    #[default]
    Approximate,
    /// Configured strategy for MSE/CORR, exact backend for MI.
    Hybrid,
    /// Scalar reference kernel for MSE/CORR, exact backend for MI.
    Exact,
}

impl Mode {
    /// Returns `true` if the mode calls the exact-MI backend.
    pub fn needs_exact_backend(self) -> bool {
        matches!(self, Mode::Hybrid | Mode::Exact)
    }
}

/// Configuration for [`compute_metrics`].
#[derive(Clone, Debug)]
pub struct MetricConfig {
    /// Neighborhood radius; windows have side `2 * radius + 1`.
    pub radius: usize,
    /// MI computation path.
    pub mode: Mode,
    /// Histogram bins per axis for approximate MI.
    pub bins: usize,
    /// Kernel used for MSE and CORR in approximate and hybrid modes.
    pub strategy: KernelStrategy,
    /// Worker threads; `None` uses the rayon default. Ignored without the
    /// `rayon` feature.
    pub threads: Option<usize>,
    /// Per-element variance at or below which a patch counts as constant.
    pub min_variance: f64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            radius: 2,
            mode: Mode::Approximate,
            bins: 32,
            strategy: KernelStrategy::Scalar,
            threads: None,
            min_variance: 0.0,
        }
    }
}

impl MetricConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> VoxMetricResult<()> {
        if self.radius == 0 {
            return Err(VoxMetricError::InvalidConfiguration {
                reason: "radius must be at least 1",
            });
        }
        if !(MIN_BINS..=MAX_BINS).contains(&self.bins) {
            return Err(VoxMetricError::InvalidConfiguration {
                reason: "bins must be between 2 and 1024",
            });
        }
        if self.threads == Some(0) {
            return Err(VoxMetricError::InvalidConfiguration {
                reason: "threads must be at least 1",
            });
        }
        if !(self.min_variance.is_finite() && self.min_variance >= 0.0) {
            return Err(VoxMetricError::InvalidConfiguration {
                reason: "min_variance must be finite and non-negative",
            });
        }
        if !self.strategy.is_supported() {
            return Err(VoxMetricError::InvalidConfiguration {
                reason: "simd strategy requires the `simd` feature",
            });
        }
        Ok(())
    }

    /// Strategy actually used for MSE/CORR under the configured mode.
    pub fn effective_strategy(&self) -> KernelStrategy {
        match self.mode {
            Mode::Exact => KernelStrategy::Scalar,
            Mode::Approximate | Mode::Hybrid => self.strategy,
        }
    }
}

/// Counters gathered while running the kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricStats {
    /// Masked voxels for which metrics were computed.
    pub evaluated: usize,
    /// Degenerate window occurrences.
    pub degenerate: DegenerateCounts,
}

impl std::ops::AddAssign for MetricStats {
    fn add_assign(&mut self, rhs: Self) {
        self.evaluated += rhs.evaluated;
        self.degenerate += rhs.degenerate;
    }
}

/// The three metric volumes plus run statistics.
///
/// Voxels outside the mask hold `NaN` in every map.
#[derive(Clone, Debug)]
pub struct MetricMaps {
    pub mse: OwnedVolume<f32>,
    pub corr: OwnedVolume<f32>,
    pub mi: OwnedVolume<f32>,
    pub stats: MetricStats,
}

impl MetricMaps {
    /// Returns the common shape of the maps.
    pub fn shape(&self) -> Shape3 {
        self.mse.shape()
    }

    /// Splits into `(mse, corr, mi, stats)`.
    pub fn into_parts(
        self,
    ) -> (
        OwnedVolume<f32>,
        OwnedVolume<f32>,
        OwnedVolume<f32>,
        MetricStats,
    ) {
        (self.mse, self.corr, self.mi, self.stats)
    }
}

fn check_shape(what: &'static str, expected: Shape3, got: Shape3) -> VoxMetricResult<()> {
    if expected != got {
        return Err(VoxMetricError::ShapeMismatch {
            what,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_finite(what: &'static str, volume: VolumeView<'_, f32>) -> VoxMetricResult<()> {
    match volume.first_non_finite() {
        Some(index) => Err(VoxMetricError::NonFiniteVoxel { what, index }),
        None => Ok(()),
    }
}

fn resolve_backend<'e>(
    mode: Mode,
    exact: Option<&'e dyn ExactMi>,
) -> VoxMetricResult<Option<&'e dyn ExactMi>> {
    if !mode.needs_exact_backend() {
        return Ok(None);
    }
    let backend = exact.ok_or_else(|| VoxMetricError::DependencyUnavailable {
        dependency: "exact mutual information backend".to_string(),
        hint: "pass an ExactMi implementation or use Mode::Approximate".to_string(),
    })?;
    backend.check_available()?;
    Ok(Some(backend))
}

/// Computes MSE, CORR and MI maps of `volume_a` against `volume_b`.
///
/// All validation happens before the first voxel is processed; on error no
/// map is returned. Both volumes must be finite everywhere, masked or not. `exact` is required in [`Mode::Hybrid`] and
/// [`Mode::Exact`] and ignored otherwise.
pub fn compute_metrics(
    volume_a: VolumeView<'_, f32>,
    volume_b: VolumeView<'_, f32>,
    mask: VolumeView<'_, bool>,
    cfg: &MetricConfig,
    exact: Option<&dyn ExactMi>,
) -> VoxMetricResult<MetricMaps> {
    cfg.validate()?;
    let shape = volume_a.shape();
    check_shape("volume_b", shape, volume_b.shape())?;
    check_shape("mask", shape, mask.shape())?;
    check_finite("volume_a", volume_a)?;
    check_finite("volume_b", volume_b)?;
    let backend = resolve_backend(cfg.mode, exact)?;

    let _span = trace_span!(
        "compute_metrics",
        nx = shape.nx,
        ny = shape.ny,
        nz = shape.nz,
        radius = cfg.radius
    )
    .entered();

    let mi = match backend {
        Some(backend) => MiPath::Exact(backend),
        None => MiPath::Approx {
            bins: cfg.bins,
            range: JointRange::new(
                IntensityRange::of_volume(volume_a),
                IntensityRange::of_volume(volume_b),
            ),
        },
    };
    let inputs = KernelInputs {
        volume_a,
        volume_b,
        mask,
        radius: cfg.radius,
        min_variance: cfg.min_variance,
        mi,
    };

    let mut mse = OwnedVolume::filled(f32::NAN, shape)?;
    let mut corr = OwnedVolume::filled(f32::NAN, shape)?;
    let mut mi_map = OwnedVolume::filled(f32::NAN, shape)?;

    let slabs = partition_slabs(shape.nx, worker_count(cfg.threads));
    let maps = split_maps(
        mse.data_mut(),
        corr.data_mut(),
        mi_map.data_mut(),
        &slabs,
        shape.plane_len(),
    );

    let stats = match cfg.effective_strategy() {
        KernelStrategy::Scalar => drive::<ScalarKernel>(&inputs, &slabs, maps, cfg.threads)?,
        #[cfg(feature = "simd")]
        KernelStrategy::Simd => drive::<SimdKernel>(&inputs, &slabs, maps, cfg.threads)?,
        #[cfg(not(feature = "simd"))]
        KernelStrategy::Simd => {
            return Err(VoxMetricError::InvalidConfiguration {
                reason: "simd strategy requires the `simd` feature",
            })
        }
    };

    trace_event!(
        "metrics_done",
        evaluated = stats.evaluated,
        degenerate_corr = stats.degenerate.corr,
        degenerate_mi = stats.degenerate.mi
    );

    Ok(MetricMaps {
        mse,
        corr,
        mi: mi_map,
        stats,
    })
}

#[cfg(feature = "rayon")]
fn worker_count(threads: Option<usize>) -> usize {
    crate::schedule::rayon::worker_count(threads)
}

#[cfg(not(feature = "rayon"))]
fn worker_count(_threads: Option<usize>) -> usize {
    1
}

#[cfg(feature = "rayon")]
fn drive<K: PatchKernel>(
    inputs: &KernelInputs<'_>,
    slabs: &[Slab],
    maps: Vec<SlabMaps<'_>>,
    threads: Option<usize>,
) -> VoxMetricResult<MetricStats> {
    if slabs.len() > 1 {
        crate::schedule::rayon::run_parallel::<K>(inputs, slabs, maps, threads)
    } else {
        crate::schedule::run_sequential::<K>(inputs, slabs, maps)
    }
}

#[cfg(not(feature = "rayon"))]
fn drive<K: PatchKernel>(
    inputs: &KernelInputs<'_>,
    slabs: &[Slab],
    maps: Vec<SlabMaps<'_>>,
    _threads: Option<usize>,
) -> VoxMetricResult<MetricStats> {
    crate::schedule::run_sequential::<K>(inputs, slabs, maps)
}

//! Patch kernels and the windowed metric kernel.
//!
//! A [`PatchKernel`] computes MSE and CORR on two gathered patch buffers.
//! The scalar kernel is the reference; the SIMD kernel (feature `simd`)
//! vectorizes the same two-pass formulas. Which one runs is an explicit
//! [`KernelStrategy`] value carried by the configuration.

/// Selects the implementation used for MSE and CORR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KernelStrategy {
    /// Portable reference kernel.
    #[default]
    Scalar,
    /// `f64x4` kernel; requires the `simd` feature.
    Simd,
}

impl KernelStrategy {
    /// Returns `true` if this build can run the strategy.
    pub fn is_supported(self) -> bool {
        match self {
            KernelStrategy::Scalar => true,
            KernelStrategy::Simd => cfg!(feature = "simd"),
        }
    }
}

/// Kernel trait for per-patch MSE and correlation.
///
/// Callers guarantee that `a` and `b` have equal, non-zero length.
pub trait PatchKernel {
    /// Mean squared difference.
    fn mse(a: &[f32], b: &[f32]) -> f32;

    /// Pearson correlation, or `None` when either side has a variance of at
    /// most `min_variance` (per element).
    fn correlation(a: &[f32], b: &[f32], min_variance: f64) -> Option<f32>;
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

pub(crate) mod windowed;

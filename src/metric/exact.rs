//! Exact mutual-information adapters.
//!
//! The windowed kernel treats exact MI as an opaque, possibly blocking,
//! per-voxel call behind [`ExactMi`]. Backends that live outside the crate
//! (Python libraries, external tools) implement the trait in their own
//! bindings; [`EmpiricalMutualInformation`] is the in-crate backend.

use crate::metric::{check_pair, Patch};
use crate::util::math::xlogx;
use crate::util::{VoxMetricError, VoxMetricResult};
use std::cmp::Ordering;

/// Per-voxel exact mutual-information backend.
pub trait ExactMi: Sync {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &str;

    /// Verifies that the backend can run, before any voxel is processed.
    fn check_available(&self) -> VoxMetricResult<()> {
        Ok(())
    }

    /// Mutual information of two equally shaped patches, in nats.
    fn evaluate(&self, a: Patch<'_>, b: Patch<'_>) -> VoxMetricResult<f32>;
}

/// Plug-in mutual information over the distinct values of each patch.
///
/// No binning is applied: every distinct intensity is its own symbol, so
/// the value is exact for the empirical joint distribution of the patch.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmpiricalMutualInformation;

fn symbolize(values: &[f32]) -> (Vec<u32>, usize) {
    // `+ 0.0` folds -0.0 into 0.0 so both map to one symbol.
    let normalized: Vec<f32> = values.iter().map(|&v| v + 0.0).collect();
    let mut distinct = normalized.clone();
    distinct.sort_unstable_by(f32::total_cmp);
    distinct.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    let ids = normalized
        .iter()
        .map(|v| {
            distinct
                .binary_search_by(|candidate| candidate.total_cmp(v))
                .unwrap_or_default() as u32
        })
        .collect();
    (ids, distinct.len())
}

fn sum_xlogx_of_counts(ids: &[u32], symbols: usize) -> f64 {
    let mut counts = vec![0u32; symbols];
    for &id in ids {
        counts[id as usize] += 1;
    }
    counts.iter().map(|&c| xlogx(c as f64)).sum()
}

impl EmpiricalMutualInformation {
    /// Computes MI for two flattened samples of equal, non-zero length.
    pub fn mutual_information(a: &[f32], b: &[f32]) -> f64 {
        let n = a.len() as f64;
        let (ids_a, symbols_a) = symbolize(a);
        let (ids_b, symbols_b) = symbolize(b);

        let mut pairs: Vec<(u32, u32)> = ids_a.iter().copied().zip(ids_b.iter().copied()).collect();
        pairs.sort_unstable();
        let mut joint = 0.0f64;
        let mut run = 0usize;
        for idx in 0..pairs.len() {
            run += 1;
            if idx + 1 == pairs.len() || pairs[idx + 1] != pairs[idx] {
                joint += xlogx(run as f64);
                run = 0;
            }
        }

        let h_terms =
            sum_xlogx_of_counts(&ids_a, symbols_a) + sum_xlogx_of_counts(&ids_b, symbols_b);
        // MI = H(A) + H(B) - H(A, B), written in raw counts.
        let mi = n.ln() + (joint - h_terms) / n;
        mi.max(0.0)
    }
}

impl ExactMi for EmpiricalMutualInformation {
    fn name(&self) -> &str {
        "empirical"
    }

    fn evaluate(&self, a: Patch<'_>, b: Patch<'_>) -> VoxMetricResult<f32> {
        check_pair(&a, &b)?;
        Ok(Self::mutual_information(a.values(), b.values()) as f32)
    }
}

/// Adapter over a closure, mainly for tests and embedding callers.
pub struct FnExactMi<F> {
    name: String,
    func: F,
}

impl<F> FnExactMi<F>
where
    F: Fn(Patch<'_>, Patch<'_>) -> VoxMetricResult<f32> + Sync,
{
    /// Wraps `func` under the diagnostic name `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ExactMi for FnExactMi<F>
where
    F: Fn(Patch<'_>, Patch<'_>) -> VoxMetricResult<f32> + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, a: Patch<'_>, b: Patch<'_>) -> VoxMetricResult<f32> {
        let value = (self.func)(a, b)?;
        if value.is_nan() {
            return Err(VoxMetricError::ExactMi {
                reason: format!("backend `{}` returned NaN", self.name),
            });
        }
        Ok(value)
    }
}

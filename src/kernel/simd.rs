//! SIMD-accelerated patch kernel using the `wide` crate.
//!
//! Patch values are widened to `f64` and processed four at a time with
//! `f64x4`, mirroring the two-pass formulas of the scalar kernel.

use crate::kernel::PatchKernel;
use crate::util::math::clamp_unit;
use wide::f64x4;

const LANES: usize = 4;

/// Load 4 f32 values and widen to f64x4.
#[inline]
fn load_f32x4_as_f64x4(slice: &[f32]) -> f64x4 {
    f64x4::from([
        slice[0] as f64,
        slice[1] as f64,
        slice[2] as f64,
        slice[3] as f64,
    ])
}

/// Horizontal sum of f64x4.
#[inline]
fn hsum(v: f64x4) -> f64 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3]
}

/// SIMD kernel for MSE and correlation.
pub struct SimdKernel;

impl PatchKernel for SimdKernel {
    fn mse(a: &[f32], b: &[f32]) -> f32 {
        let len = a.len();
        let simd_end = len / LANES * LANES;

        let mut sse_vec = f64x4::ZERO;
        let mut idx = 0;
        while idx < simd_end {
            let diff = load_f32x4_as_f64x4(&a[idx..]) - load_f32x4_as_f64x4(&b[idx..]);
            sse_vec += diff * diff;
            idx += LANES;
        }

        let mut sse_s = 0.0f64;
        while idx < len {
            let diff = a[idx] as f64 - b[idx] as f64;
            sse_s += diff * diff;
            idx += 1;
        }

        ((hsum(sse_vec) + sse_s) / len as f64) as f32
    }

    fn correlation(a: &[f32], b: &[f32], min_variance: f64) -> Option<f32> {
        let len = a.len();
        let n = len as f64;
        let simd_end = len / LANES * LANES;

        // Pass 1: means.
        let mut sum_a_vec = f64x4::ZERO;
        let mut sum_b_vec = f64x4::ZERO;
        let mut idx = 0;
        while idx < simd_end {
            sum_a_vec += load_f32x4_as_f64x4(&a[idx..]);
            sum_b_vec += load_f32x4_as_f64x4(&b[idx..]);
            idx += LANES;
        }
        let mut sum_a = hsum(sum_a_vec);
        let mut sum_b = hsum(sum_b_vec);
        while idx < len {
            sum_a += a[idx] as f64;
            sum_b += b[idx] as f64;
            idx += 1;
        }
        let mean_a = sum_a / n;
        let mean_b = sum_b / n;

        // Pass 2: centered second moments.
        let mean_a_vec = f64x4::splat(mean_a);
        let mean_b_vec = f64x4::splat(mean_b);
        let mut sxx_vec = f64x4::ZERO;
        let mut syy_vec = f64x4::ZERO;
        let mut sxy_vec = f64x4::ZERO;
        idx = 0;
        while idx < simd_end {
            let da = load_f32x4_as_f64x4(&a[idx..]) - mean_a_vec;
            let db = load_f32x4_as_f64x4(&b[idx..]) - mean_b_vec;
            sxx_vec += da * da;
            syy_vec += db * db;
            sxy_vec += da * db;
            idx += LANES;
        }
        let mut sxx = hsum(sxx_vec);
        let mut syy = hsum(syy_vec);
        let mut sxy = hsum(sxy_vec);
        while idx < len {
            let da = a[idx] as f64 - mean_a;
            let db = b[idx] as f64 - mean_b;
            sxx += da * da;
            syy += db * db;
            sxy += da * db;
            idx += 1;
        }

        if sxx / n <= min_variance || syy / n <= min_variance {
            return None;
        }
        let r = sxy / (sxx * syy).sqrt();
        if r.is_finite() {
            Some(clamp_unit(r) as f32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SimdKernel;
    use crate::kernel::scalar::ScalarKernel;
    use crate::kernel::PatchKernel;

    fn make_patch(len: usize, seed: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (((i * 31 + seed * 7) ^ (i * seed)) % 97) as f32 * 0.37)
            .collect()
    }

    #[test]
    fn simd_matches_scalar_on_ragged_lengths() {
        for len in [1usize, 3, 8, 18, 27, 45, 125] {
            let a = make_patch(len, 3);
            let b = make_patch(len, 11);
            let mse_s = ScalarKernel::mse(&a, &b);
            let mse_v = SimdKernel::mse(&a, &b);
            assert!((mse_s - mse_v).abs() <= 1e-5 * mse_s.max(1.0));

            let corr_s = ScalarKernel::correlation(&a, &b, 0.0);
            let corr_v = SimdKernel::correlation(&a, &b, 0.0);
            match (corr_s, corr_v) {
                (Some(s), Some(v)) => assert!((s - v).abs() < 1e-5),
                (None, None) => {}
                other => panic!("degeneracy differs: {other:?}"),
            }
        }
    }

    #[test]
    fn constant_patch_is_degenerate() {
        let a = vec![0.1f32; 27];
        let b = make_patch(27, 5);
        assert!(SimdKernel::correlation(&a, &b, 0.0).is_none());
    }
}

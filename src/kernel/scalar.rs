//! Scalar reference kernel.

use crate::kernel::PatchKernel;
use crate::util::math::clamp_unit;

/// Scalar two-pass kernel with `f64` accumulation.
pub struct ScalarKernel;

impl PatchKernel for ScalarKernel {
    fn mse(a: &[f32], b: &[f32]) -> f32 {
        let mut sse = 0.0f64;
        for (&va, &vb) in a.iter().zip(b) {
            let diff = va as f64 - vb as f64;
            sse += diff * diff;
        }
        (sse / a.len() as f64) as f32
    }

    fn correlation(a: &[f32], b: &[f32], min_variance: f64) -> Option<f32> {
        let n = a.len() as f64;
        let mut sum_a = 0.0f64;
        let mut sum_b = 0.0f64;
        for (&va, &vb) in a.iter().zip(b) {
            sum_a += va as f64;
            sum_b += vb as f64;
        }
        let mean_a = sum_a / n;
        let mean_b = sum_b / n;

        let mut sxx = 0.0f64;
        let mut syy = 0.0f64;
        let mut sxy = 0.0f64;
        for (&va, &vb) in a.iter().zip(b) {
            let da = va as f64 - mean_a;
            let db = vb as f64 - mean_b;
            sxx += da * da;
            syy += db * db;
            sxy += da * db;
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
    use super::ScalarKernel;
    use crate::kernel::PatchKernel;

    #[test]
    fn correlation_matches_bruteforce() {
        let a: Vec<f32> = (0..27).map(|v| ((v * 17 + 5) % 11) as f32).collect();
        let b: Vec<f32> = (0..27).map(|v| ((v * 7 + 3) % 13) as f32 * 0.5).collect();

        let n = a.len() as f64;
        let ma = a.iter().map(|&v| v as f64).sum::<f64>() / n;
        let mb = b.iter().map(|&v| v as f64).sum::<f64>() / n;
        let cov: f64 = a
            .iter()
            .zip(&b)
            .map(|(&x, &y)| (x as f64 - ma) * (y as f64 - mb))
            .sum();
        let va: f64 = a.iter().map(|&x| (x as f64 - ma).powi(2)).sum();
        let vb: f64 = b.iter().map(|&y| (y as f64 - mb).powi(2)).sum();
        let expected = cov / (va * vb).sqrt();

        let r = ScalarKernel::correlation(&a, &b, 0.0).unwrap();
        assert!((r as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn min_variance_threshold_applies_per_element() {
        let a = [0.0f32, 1.0, 0.0, 1.0];
        let b = [1.0f32, 2.0, 3.0, 4.0];
        // Per-element variance of `a` is 0.25.
        assert!(ScalarKernel::correlation(&a, &b, 0.2).is_some());
        assert!(ScalarKernel::correlation(&a, &b, 0.25).is_none());
    }
}

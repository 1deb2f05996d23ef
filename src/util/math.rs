//! Numeric helpers shared by the metric kernels.

/// Returns `x * ln(x)` with the `0 * ln(0) = 0` convention.
#[inline]
pub(crate) fn xlogx(x: f64) -> f64 {
    if x > 0.0 {
        x * x.ln()
    } else {
        0.0
    }
}

/// Clamps a correlation coefficient to `[-1, 1]`, passing `NaN` through.
#[inline]
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{clamp_unit, xlogx};

    #[test]
    fn xlogx_is_zero_at_zero() {
        assert_eq!(xlogx(0.0), 0.0);
        assert!((xlogx(std::f64::consts::E) - std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn clamp_unit_keeps_nan() {
        assert!(clamp_unit(f64::NAN).is_nan());
        assert_eq!(clamp_unit(1.0000001), 1.0);
        assert_eq!(clamp_unit(-3.0), -1.0);
    }
}

//! Fixed-range joint histograms for approximate mutual information.

use crate::util::{VoxMetricError, VoxMetricResult};
use crate::volume::VolumeView;

/// Smallest accepted bin count.
pub const MIN_BINS: usize = 2;
/// Largest accepted bin count.
pub const MAX_BINS: usize = 1024;

/// Closed intensity interval used to bin one volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntensityRange {
    pub min: f32,
    pub max: f32,
}

impl IntensityRange {
    /// Creates a range from its bounds.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Global finite range of a whole volume.
    pub fn of_volume(volume: VolumeView<'_, f32>) -> Self {
        let (min, max) = volume.finite_range();
        Self { min, max }
    }

    /// Returns `max - min` in `f64`.
    pub fn width(&self) -> f64 {
        self.max as f64 - self.min as f64
    }

    /// Returns `true` when the range cannot be split into bins.
    pub fn is_degenerate(&self) -> bool {
        let width = self.width();
        !(width.is_finite() && width > 0.0)
    }

    /// Maps a value to its bin.
    ///
    /// Bins are left-closed and the range maximum falls into the last bin.
    /// Values outside the range clamp to the nearest edge bin, infinities
    /// included; NaN goes to bin 0.
    #[inline]
    pub(crate) fn bin(&self, value: f32, bins: usize) -> usize {
        let t = (value as f64 - self.min as f64) / self.width() * bins as f64;
        if t >= 0.0 {
            (t as usize).min(bins - 1)
        } else {
            0
        }
    }
}

/// Per-volume ranges for the two sides of a joint histogram.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointRange {
    pub a: IntensityRange,
    pub b: IntensityRange,
}

impl JointRange {
    /// Creates a joint range from the two side ranges.
    pub const fn new(a: IntensityRange, b: IntensityRange) -> Self {
        Self { a, b }
    }

    /// Uses the same range for both sides.
    pub const fn shared(range: IntensityRange) -> Self {
        Self { a: range, b: range }
    }

    /// Returns `true` when either side is degenerate.
    pub fn is_degenerate(&self) -> bool {
        self.a.is_degenerate() || self.b.is_degenerate()
    }
}

/// Reusable `bins x bins` joint histogram.
///
/// Only the cells touched by the last evaluation are cleared, so resetting
/// costs `O(patch)` rather than `O(bins^2)`.
pub struct JointHistogram {
    bins: usize,
    joint: Vec<u32>,
    marg_a: Vec<u32>,
    marg_b: Vec<u32>,
    touched: Vec<usize>,
}

impl JointHistogram {
    /// Creates an empty histogram; `bins` must lie in `MIN_BINS..=MAX_BINS`.
    pub fn new(bins: usize) -> VoxMetricResult<Self> {
        if !(MIN_BINS..=MAX_BINS).contains(&bins) {
            return Err(VoxMetricError::InvalidConfiguration {
                reason: "bins must be between 2 and 1024",
            });
        }
        Ok(Self::with_bins(bins))
    }

    pub(crate) fn with_bins(bins: usize) -> Self {
        Self {
            bins,
            joint: vec![0; bins * bins],
            marg_a: vec![0; bins],
            marg_b: vec![0; bins],
            touched: Vec::new(),
        }
    }

    /// Returns the bin count per axis.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Returns the number of occupied joint cells after the last evaluation.
    pub fn occupied_cells(&self) -> usize {
        self.touched.len()
    }

    /// Mutual information (nats) of the paired samples `a` and `b`.
    ///
    /// Returns `None` when `range` is degenerate or the inputs are empty or
    /// of different length.
    pub fn mutual_information(&mut self, a: &[f32], b: &[f32], range: JointRange) -> Option<f32> {
        self.reset();
        if a.is_empty() || a.len() != b.len() || range.is_degenerate() {
            return None;
        }

        let bins = self.bins;
        for (&va, &vb) in a.iter().zip(b) {
            let ia = range.a.bin(va, bins);
            let ib = range.b.bin(vb, bins);
            let cell = ia * bins + ib;
            if self.joint[cell] == 0 {
                self.touched.push(cell);
            }
            self.joint[cell] += 1;
            self.marg_a[ia] += 1;
            self.marg_b[ib] += 1;
        }

        let n = a.len() as f64;
        let mut mi = 0.0f64;
        for &cell in &self.touched {
            let c = self.joint[cell] as f64;
            let ca = self.marg_a[cell / bins] as f64;
            let cb = self.marg_b[cell % bins] as f64;
            mi += (c / n) * ((c * n) / (ca * cb)).ln();
        }
        Some(mi.max(0.0) as f32)
    }

    fn reset(&mut self) {
        let bins = self.bins;
        for &cell in &self.touched {
            self.joint[cell] = 0;
            self.marg_a[cell / bins] = 0;
            self.marg_b[cell % bins] = 0;
        }
        self.touched.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{IntensityRange, JointHistogram, JointRange};
    use crate::util::VoxMetricError;

    #[test]
    fn bin_edges_are_left_closed() {
        let range = IntensityRange::new(0.0, 4.0);
        assert_eq!(range.bin(0.0, 4), 0);
        assert_eq!(range.bin(0.999, 4), 0);
        assert_eq!(range.bin(1.0, 4), 1);
        assert_eq!(range.bin(4.0, 4), 3);
        assert_eq!(range.bin(9.0, 4), 3);
        assert_eq!(range.bin(-1.0, 4), 0);
        assert_eq!(range.bin(f32::NAN, 4), 0);
        assert_eq!(range.bin(f32::INFINITY, 4), 3);
        assert_eq!(range.bin(f32::NEG_INFINITY, 4), 0);
    }

    #[test]
    fn rejects_out_of_range_bins() {
        assert!(matches!(
            JointHistogram::new(1),
            Err(VoxMetricError::InvalidConfiguration { .. })
        ));
        assert!(JointHistogram::new(2).is_ok());
    }

    #[test]
    fn independent_halves_have_zero_mi() {
        let a = [0.0f32, 0.0, 1.0, 1.0];
        let b = [0.0f32, 1.0, 0.0, 1.0];
        let range = JointRange::shared(IntensityRange::new(0.0, 1.0));
        let mut hist = JointHistogram::new(2).unwrap();
        let mi = hist.mutual_information(&a, &b, range).unwrap();
        assert!(mi.abs() < 1e-7);
        assert_eq!(hist.occupied_cells(), 4);
    }

    #[test]
    fn identical_binary_samples_have_ln2() {
        let a = [0.0f32, 1.0, 0.0, 1.0];
        let range = JointRange::shared(IntensityRange::new(0.0, 1.0));
        let mut hist = JointHistogram::new(8).unwrap();
        let mi = hist.mutual_information(&a, &a, range).unwrap();
        assert!((mi - std::f32::consts::LN_2).abs() < 1e-6);

        // Reuse must not leak counts from the previous call.
        let mi_again = hist.mutual_information(&a, &a, range).unwrap();
        assert_eq!(mi, mi_again);
    }
}

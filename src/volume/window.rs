//! Clipped cubic neighborhoods.

use crate::volume::{Shape3, VolumeView};
use std::ops::Range;

/// Cubic neighborhood of a voxel intersected with the volume bounds.
///
/// Each axis holds a half-open range; windows near the border are smaller
/// than `(2r + 1)^3` and are never padded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Window {
    pub x: Range<usize>,
    pub y: Range<usize>,
    pub z: Range<usize>,
}

fn clip_axis(center: usize, radius: usize, extent: usize) -> Range<usize> {
    let start = center.saturating_sub(radius);
    let end = center.saturating_add(radius).saturating_add(1).min(extent);
    start..end
}

impl Window {
    /// Builds the clipped window of `radius` around `(x, y, z)`.
    pub fn around(x: usize, y: usize, z: usize, radius: usize, shape: Shape3) -> Self {
        Self {
            x: clip_axis(x, radius, shape.nx),
            y: clip_axis(y, radius, shape.ny),
            z: clip_axis(z, radius, shape.nz),
        }
    }

    /// Returns the window extent `[nx, ny, nz]`.
    pub fn extent(&self) -> [usize; 3] {
        [self.x.len(), self.y.len(), self.z.len()]
    }

    /// Returns the number of voxels inside the window.
    pub fn len(&self) -> usize {
        self.x.len() * self.y.len() * self.z.len()
    }

    /// Returns `true` when the window holds no voxel.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the window's values out of `volume` into `out` (C order).
    ///
    /// `out` is cleared first so it can be reused across voxels.
    pub fn gather(&self, volume: VolumeView<'_, f32>, out: &mut Vec<f32>) {
        out.clear();
        for x in self.x.clone() {
            for y in self.y.clone() {
                out.extend_from_slice(volume.z_run(x, y, self.z.start, self.z.end));
            }
        }
    }
}

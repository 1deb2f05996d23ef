//! Volume views and neighborhood windows.
//!
//! `VolumeView` is a borrowed 3D view into a contiguous 1D buffer laid out in
//! C order: `z` varies fastest and `x` slowest, so the element at
//! `(x, y, z)` lives at `(x * ny + y) * nz + z`. Slabs along `x` are
//! therefore contiguous sub-slices of the buffer.

use crate::util::{VoxMetricError, VoxMetricResult};
use std::fmt;

mod window;

pub use window::Window;

/// Extent of a volume along `x`, `y` and `z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape3 {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl Shape3 {
    /// Creates a shape from its three extents.
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Returns the extents as an array `[nx, ny, nz]`.
    pub fn dims(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    /// Returns the number of voxels, or `None` on overflow.
    pub fn checked_len(&self) -> Option<usize> {
        self.nx.checked_mul(self.ny)?.checked_mul(self.nz)
    }

    /// Returns the number of voxels in one `x` plane.
    pub fn plane_len(&self) -> usize {
        self.ny * self.nz
    }

    /// Returns the linear index of `(x, y, z)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.ny + y) * self.nz + z
    }

    /// Inverse of [`Shape3::index`].
    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let z = index % self.nz;
        let y = (index / self.nz) % self.ny;
        let x = index / self.plane_len();
        [x, y, z]
    }

    fn validated_len(&self) -> VoxMetricResult<usize> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(VoxMetricError::InvalidDimensions { dims: self.dims() });
        }
        self.checked_len()
            .ok_or(VoxMetricError::InvalidDimensions { dims: self.dims() })
    }
}

impl From<[usize; 3]> for Shape3 {
    fn from(dims: [usize; 3]) -> Self {
        Self::new(dims[0], dims[1], dims[2])
    }
}

impl fmt::Display for Shape3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.nx, self.ny, self.nz)
    }
}

/// Borrowed 3D volume view over a contiguous C-order buffer.
#[derive(Copy, Clone)]
pub struct VolumeView<'a, T> {
    data: &'a [T],
    shape: Shape3,
}

impl<'a, T> VolumeView<'a, T> {
    /// Creates a view of `data` with the given shape.
    ///
    /// The buffer must hold exactly `nx * ny * nz` elements.
    pub fn from_slice(data: &'a [T], shape: impl Into<Shape3>) -> VoxMetricResult<Self> {
        let shape = shape.into();
        let needed = shape.validated_len()?;
        if data.len() < needed {
            return Err(VoxMetricError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(VoxMetricError::InvalidDimensions { dims: shape.dims() });
        }
        Ok(Self { data, shape })
    }

    /// Returns the volume shape.
    pub fn shape(&self) -> Shape3 {
        self.shape
    }

    /// Returns the number of voxels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; zero-sized views cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the backing slice.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y, z)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&'a T> {
        if x >= self.shape.nx || y >= self.shape.ny || z >= self.shape.nz {
            return None;
        }
        self.data.get(self.shape.index(x, y, z))
    }

    /// Returns the contiguous `z` run at `(x, y)` restricted to `z0..z1`.
    #[inline]
    pub(crate) fn z_run(&self, x: usize, y: usize, z0: usize, z1: usize) -> &'a [T] {
        let base = self.shape.index(x, y, 0);
        &self.data[base + z0..base + z1]
    }
}

impl VolumeView<'_, f32> {
    /// Returns the `[x, y, z]` of the first NaN or infinite voxel.
    pub fn first_non_finite(&self) -> Option<[usize; 3]> {
        self.data
            .iter()
            .position(|v| !v.is_finite())
            .map(|idx| self.shape.coords(idx))
    }

    /// Returns the minimum and maximum over finite voxels.
    ///
    /// Volumes without any finite value report `(0.0, 0.0)`.
    pub fn finite_range(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &value in self.data.iter().filter(|v| v.is_finite()) {
            lo = lo.min(value);
            hi = hi.max(value);
        }
        if lo > hi {
            (0.0, 0.0)
        } else {
            (lo, hi)
        }
    }
}

/// Owned volume in contiguous C-order layout.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedVolume<T> {
    data: Vec<T>,
    shape: Shape3,
}

impl<T> OwnedVolume<T> {
    /// Creates an owned volume from a contiguous buffer.
    pub fn new(data: Vec<T>, shape: impl Into<Shape3>) -> VoxMetricResult<Self> {
        let shape = shape.into();
        let needed = shape.validated_len()?;
        if data.len() < needed {
            return Err(VoxMetricError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(VoxMetricError::InvalidDimensions { dims: shape.dims() });
        }
        Ok(Self { data, shape })
    }

    /// Creates a volume filled with `value`.
    pub fn filled(value: T, shape: impl Into<Shape3>) -> VoxMetricResult<Self>
    where
        T: Clone,
    {
        let shape = shape.into();
        let len = shape.validated_len()?;
        Ok(Self {
            data: vec![value; len],
            shape,
        })
    }

    /// Returns a borrowed view of the volume.
    pub fn view(&self) -> VolumeView<'_, T> {
        VolumeView {
            data: &self.data,
            shape: self.shape,
        }
    }

    /// Returns the volume shape.
    pub fn shape(&self) -> Shape3 {
        self.shape
    }

    /// Returns the backing buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns the element at `(x, y, z)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        self.view().get(x, y, z)
    }

    /// Consumes the volume and returns its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

//! Raw volume files: little-endian `f32` samples and `u8` masks in C order.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn size_error(path: &Path, expected: usize, got: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!(
            "{}: expected {expected} bytes, found {got}",
            path.display()
        ),
    )
}

pub fn read_f32(path: &Path, len: usize) -> io::Result<Vec<f32>> {
    let bytes = fs::read(path)?;
    let expected = len * 4;
    if bytes.len() != expected {
        return Err(size_error(path, expected, bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Reads a mask; any non-zero byte marks a voxel as inside.
pub fn read_mask(path: &Path, len: usize) -> io::Result<Vec<bool>> {
    let bytes = fs::read(path)?;
    if bytes.len() != len {
        return Err(size_error(path, len, bytes.len()));
    }
    Ok(bytes.into_iter().map(|b| b != 0).collect())
}

pub fn write_f32(path: &Path, data: &[f32]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut out = BufWriter::new(fs::File::create(path)?);
    for v in data {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()
}

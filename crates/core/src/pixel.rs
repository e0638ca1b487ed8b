//! Raw RGBA8 pixel buffers and row-order conversion.
//!
//! OpenGL reads framebuffers back bottom row first. Image files store the
//! top row first. [`PixelBlob`] records which way a buffer is laid out so
//! the flip happens exactly once, right before encoding.

use crate::config::COMPONENTS;
use crate::error::FixtureError;

/// Row order of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// First row in memory is the bottom of the image (GL readback).
    BottomUp,
    /// First row in memory is the top of the image (image files).
    TopDown,
}

/// An RGBA8 pixel buffer of `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBlob {
    data: Vec<u8>,
    width: u32,
    height: u32,
    order: RowOrder,
}

impl PixelBlob {
    /// Wraps `data`, checking its length against the dimensions.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::InvalidDimensions` for a zero dimension and
    /// `FixtureError::Readback` if the length does not match.
    pub fn new(data: Vec<u8>, width: u32, height: u32, order: RowOrder) -> Result<Self, FixtureError> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(FixtureError::Readback(format!(
                "pixel buffer is {} bytes, expected {expected} for {width}x{height} RGBA",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            order,
        })
    }

    /// Wraps a buffer read back from the GPU (bottom row first).
    pub fn from_readback(data: Vec<u8>, width: u32, height: u32) -> Result<Self, FixtureError> {
        Self::new(data, width, height, RowOrder::BottomUp)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> RowOrder {
        self.order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the RGBA value at `(x, y)` where `y` counts from the top
    /// of the image, regardless of the buffer's row order.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = match self.order {
            RowOrder::TopDown => y,
            RowOrder::BottomUp => self.height - 1 - y,
        };
        let i = (row as usize * self.width as usize + x as usize) * COMPONENTS;
        let p = &self.data[i..i + COMPONENTS];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Converts to top-down row order, flipping if needed.
    pub fn into_top_down(self) -> Self {
        match self.order {
            RowOrder::TopDown => self,
            RowOrder::BottomUp => {
                let data = flip_rows(&self.data, self.width as usize * COMPONENTS);
                Self {
                    data,
                    width: self.width,
                    height: self.height,
                    order: RowOrder::TopDown,
                }
            }
        }
    }
}

/// Byte length of an RGBA8 buffer with the given dimensions.
pub fn expected_len(width: u32, height: u32) -> Result<usize, FixtureError> {
    if width == 0 || height == 0 {
        return Err(FixtureError::InvalidDimensions);
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(COMPONENTS))
        .ok_or(FixtureError::InvalidDimensions)
}

/// Reverses the order of `stride`-byte rows in `data`.
pub fn flip_rows(data: &[u8], stride: usize) -> Vec<u8> {
    if stride == 0 {
        return data.to_vec();
    }
    data.chunks_exact(stride)
        .rev()
        .flat_map(|row| row.iter().copied())
        .collect()
}

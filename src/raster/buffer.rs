//! The shared unit of exchange: an owned RGBA8 pixel buffer, plus the mask and
//! rectangle types that passes hand back instead of a new buffer.
//!
//! ## Layout
//!
//! ```text
//! data = [R G B A][R G B A] ...   row-major, width * height * 4 bytes
//! ```
//!
//! The length invariant is enforced on construction; every accessor relies on
//! it. Passes either mutate a buffer in place or return a sibling of the same
//! dimensions. Only [`PixelBuffer::crop`] changes dimensions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::color::Rgb;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RasterError {
    #[error("buffer length {actual} does not match {width}x{height} RGBA ({expected} bytes)")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Row-major RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A fully transparent black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// A buffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGBA bytes, checking `data.len() == width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RasterError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero width or zero height.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte offset of pixel `(x, y)`.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Iterate pixels as 4-byte chunks.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(4)
    }

    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.data.chunks_exact_mut(4)
    }

    /// Sparse probe for any pixel with alpha below 255.
    ///
    /// Rows and columns are visited at a stride of
    /// `max(1, min(W, H) / step_hint)`, so a 4000px image with the default
    /// hint of 200 checks every 20th pixel of every 20th row.
    pub fn has_alpha(&self, step_hint: u32) -> bool {
        if self.is_empty() {
            return false;
        }
        let step = (self.width.min(self.height) / step_hint.max(1)).max(1);
        (0..self.height).step_by(step as usize).any(|y| {
            (0..self.width)
                .step_by(step as usize)
                .any(|x| self.data[self.offset(x, y) + 3] < 255)
        })
    }

    /// Copy out the pixels under `rect`, clamped to the buffer.
    ///
    /// The result is at least 1x1 whenever the source is non-empty, matching
    /// how an editor applies a crop overlay dragged partly off-canvas.
    pub fn crop(&self, rect: Rect) -> PixelBuffer {
        if self.is_empty() {
            return self.clone();
        }
        let r = rect.clamp_to(self.width, self.height);
        let mut out = Vec::with_capacity(r.w as usize * r.h as usize * 4);
        for y in r.y..r.y + r.h {
            let start = self.offset(r.x, y);
            out.extend_from_slice(&self.data[start..start + r.w as usize * 4]);
        }
        PixelBuffer {
            width: r.w,
            height: r.h,
            data: out,
        }
    }

    /// Composite this buffer over an opaque `fill` (source-over).
    ///
    /// The result is fully opaque. Used to put a new flat background behind
    /// an image that already carries transparency.
    pub fn composite_over(&self, fill: Rgb) -> PixelBuffer {
        let mut out = self.clone();
        let bg = fill.channels();
        for px in out.pixels_mut() {
            let a = px[3] as u32;
            for c in 0..3 {
                px[c] = ((px[c] as u32 * a + bg[c] as u32 * (255 - a) + 127) / 255) as u8;
            }
            px[3] = 255;
        }
        out
    }
}

/// One byte per pixel: 0 = keep/foreground, 1 = background/selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl Mask {
    /// An all-zero mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize] != 0
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> bool {
        self.bits[index] != 0
    }

    #[inline]
    pub fn set_index(&mut self, index: usize) {
        self.bits[index] = 1;
    }

    /// Number of selected pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b != 0).count()
    }
}

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Clamp into a `width` x `height` buffer, keeping at least one pixel.
    ///
    /// `width` and `height` must be non-zero.
    pub fn clamp_to(self, width: u32, height: u32) -> Rect {
        let end_x = self.x.saturating_add(self.w).min(width);
        let end_y = self.y.saturating_add(self.h).min(height);
        let x = self.x.min(width - 1);
        let y = self.y.min(height - 1);
        Rect {
            x,
            y,
            w: end_x.saturating_sub(self.x).max(1),
            h: end_y.saturating_sub(self.y).max(1),
        }
    }
}

//! Shared test utilities for the rastermatte test suite.
//!
//! Buffer builders for the synthetic images the raster tests run on, plus
//! assertions that print the offending coordinate on failure instead of
//! dumping whole byte vectors.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let buf = canvas_with_block(100, 100, WHITE, (40, 40, 20, 20), BLACK);
//! assert_pixel(&buf, 45, 45, BLACK);
//! ```

use crate::raster::{Mask, PixelBuffer};

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const BLACK: [u8; 4] = [0, 0, 0, 255];

// =========================================================================
// Builders
// =========================================================================

/// A buffer filled with one RGBA value.
pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> PixelBuffer {
    PixelBuffer::filled(width, height, rgba)
}

/// A `bg` canvas with an `fg` rectangle `(x, y, w, h)` painted on it.
pub fn canvas_with_block(
    width: u32,
    height: u32,
    bg: [u8; 4],
    (bx, by, bw, bh): (u32, u32, u32, u32),
    fg: [u8; 4],
) -> PixelBuffer {
    let mut buf = solid(width, height, bg);
    paint(&mut buf, (bx, by, bw, bh), fg);
    buf
}

/// Paint a rectangle in place, clipped to the buffer.
pub fn paint(buf: &mut PixelBuffer, (x0, y0, w, h): (u32, u32, u32, u32), rgba: [u8; 4]) {
    for y in y0..(y0 + h).min(buf.height()) {
        for x in x0..(x0 + w).min(buf.width()) {
            buf.put_pixel(x, y, rgba);
        }
    }
}

/// A deterministic pseudo-random opaque buffer (xorshift), for identity checks.
pub fn noise(width: u32, height: u32, seed: u32) -> PixelBuffer {
    let mut state = seed.max(1);
    let mut buf = PixelBuffer::new(width, height);
    for px in buf.pixels_mut() {
        for c in px.iter_mut().take(3) {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *c = (state & 0xff) as u8;
        }
        px[3] = 255;
    }
    buf
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert one pixel's RGBA value.
pub fn assert_pixel(buf: &PixelBuffer, x: u32, y: u32, expected: [u8; 4]) {
    let actual = buf.pixel(x, y);
    assert_eq!(actual, expected, "pixel ({x}, {y}) mismatch");
}

/// Assert that a mask selects exactly the pixels for which `expected` is true.
pub fn assert_mask_matches(mask: &Mask, expected: impl Fn(u32, u32) -> bool) {
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            assert_eq!(
                mask.get(x, y),
                expected(x, y),
                "mask ({x}, {y}) mismatch"
            );
        }
    }
}

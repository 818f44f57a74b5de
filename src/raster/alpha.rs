//! Color-to-alpha: turn a flat background into transparency.
//!
//! Works in linear light. For each channel the pixel is explained as a blend
//! of an unknown foreground over the known background; the smallest alpha
//! that can explain the worst channel wins, a small tolerance is subtracted so
//! near-background noise goes fully transparent, and the foreground color is
//! recovered by un-mixing.
//!
//! ```text
//! pixel >= bg:  alpha_c = (pixel - bg) / (1 - bg)
//! pixel <  bg:  alpha_c = (bg - pixel) / bg
//! alpha         = clamp01((max(alpha_c) - tol) / (1 - tol))
//! F_c           = (pixel_c - (1 - alpha) * bg_c) / alpha
//! ```

use super::buffer::PixelBuffer;
use super::color::{Rgb, linear_to_srgb, srgb_to_linear};

/// Alpha estimates at or below this are pushed to zero.
const TOLERANCE: f64 = 0.08;
const EPSILON: f64 = 1e-6;
const MIN_UNMIX_ALPHA: f64 = 1e-5;

/// Per-channel alpha estimate for one linear value against the background.
///
/// When the background sits at either end of the range the division is
/// degenerate; the estimate then becomes binary (any deviation is opaque).
#[inline]
fn channel_alpha(pixel: f64, bg: f64) -> f64 {
    if bg < EPSILON {
        return if pixel > bg { 1.0 } else { 0.0 };
    }
    if pixel >= bg {
        if 1.0 - bg < EPSILON {
            return 0.0;
        }
        (pixel - bg) / (1.0 - bg)
    } else {
        (bg - pixel) / bg
    }
}

/// Make every pixel close to `bg` transparent, preserving anti-aliased edges.
///
/// Returns a new buffer of the same size. The input's own alpha channel is
/// ignored; output alpha is derived purely from color distance.
pub fn color_to_alpha(buf: &PixelBuffer, bg: Rgb) -> PixelBuffer {
    let mut out = buf.clone();
    if buf.is_empty() {
        return out;
    }

    let bg_lin = bg.channels().map(srgb_to_linear);

    for px in out.pixels_mut() {
        let lin = [
            srgb_to_linear(px[0]),
            srgb_to_linear(px[1]),
            srgb_to_linear(px[2]),
        ];

        let raw = (0..3)
            .map(|c| channel_alpha(lin[c], bg_lin[c]))
            .fold(0.0_f64, f64::max);
        let alpha = ((raw - TOLERANCE) / (1.0 - TOLERANCE)).clamp(0.0, 1.0);

        for c in 0..3 {
            let fg = if alpha > MIN_UNMIX_ALPHA {
                (lin[c] - (1.0 - alpha) * bg_lin[c]) / alpha
            } else {
                0.0
            };
            px[c] = linear_to_srgb(fg);
        }
        px[3] = (alpha * 255.0).round() as u8;
    }

    tracing::debug!(
        width = buf.width(),
        height = buf.height(),
        background = %bg,
        "color-to-alpha pass complete"
    );
    out
}

/// Deblend `bg` to transparency, then lay the result over an opaque `fill`.
///
/// This swaps one flat background for another while keeping the soft edges
/// that color-to-alpha recovers.
pub fn color_to_alpha_and_fill(buf: &PixelBuffer, bg: Rgb, fill: Rgb) -> PixelBuffer {
    color_to_alpha(buf, bg).composite_over(fill)
}

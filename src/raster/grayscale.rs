//! Luma-weighted desaturation.
//!
//! Each channel moves toward the pixel's luma by `strength`; alpha is left
//! alone. At full strength R = G = B = luma.

use super::buffer::PixelBuffer;
use super::params::{LumaWeights, Strength};

/// Desaturate `buf` in place.
pub fn grayscale_in_place(buf: &mut PixelBuffer, strength: Strength, weights: LumaWeights) {
    let [wr, wg, wb] = weights.coefficients();
    let s = strength.value();
    for px in buf.pixels_mut() {
        let luma = px[0] as f64 * wr + px[1] as f64 * wg + px[2] as f64 * wb;
        for c in &mut px[..3] {
            let v = *c as f64;
            *c = (v + (luma - v) * s).round().clamp(0.0, 255.0) as u8;
        }
    }
    tracing::debug!(strength = s, ?weights, "grayscale pass complete");
}

/// Desaturated copy of `buf`.
pub fn grayscale(buf: &PixelBuffer, strength: Strength, weights: LumaWeights) -> PixelBuffer {
    let mut out = buf.clone();
    grayscale_in_place(&mut out, strength, weights);
    out
}

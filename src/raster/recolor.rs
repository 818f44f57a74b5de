//! Replace a flat background with a new color.
//!
//! Two tiers, keyed on squared RGB distance `d2` to the old background:
//!
//! ```text
//! d2 <= seed                         core: becomes target, alpha 255
//! seed < d2 <= halo, core nearby     halo: blended toward target
//! otherwise                          untouched
//! ```
//!
//! Halo blend weight falls off linearly from `strength` at the seed threshold
//! to 0 at the halo threshold. "Nearby" means a core pixel within
//! `halo_radius` in the 8-connected (Chebyshev) sense. Fully transparent
//! pixels are never modified.

use super::buffer::{Mask, PixelBuffer};
use super::color::Rgb;
use super::params::RecolorParams;

/// Feathered recolor of the background.
pub fn recolor_background(
    buf: &PixelBuffer,
    bg: Rgb,
    target: Rgb,
    params: &RecolorParams,
) -> PixelBuffer {
    let mut out = buf.clone();
    if buf.is_empty() {
        return out;
    }

    let (w, h) = (buf.width() as usize, buf.height() as usize);
    let data = buf.data();
    let distance = |i: usize| bg.distance_sq(data[i * 4], data[i * 4 + 1], data[i * 4 + 2]);

    let mut core = Mask::new(buf.width(), buf.height());
    for i in 0..w * h {
        if data[i * 4 + 3] > 0 && distance(i) <= params.seed_threshold {
            core.set_index(i);
        }
    }

    let radius = params.halo_radius as usize;
    let has_core_near = |x: usize, y: usize| {
        let (x0, x1) = (x.saturating_sub(radius), (x + radius).min(w - 1));
        let (y0, y1) = (y.saturating_sub(radius), (y + radius).min(h - 1));
        (y0..=y1).any(|ny| (x0..=x1).any(|nx| core.get_index(ny * w + nx)))
    };

    let band = params.halo_threshold.saturating_sub(params.seed_threshold).max(1) as f64;
    let target_rgb = target.channels();
    let mut halo_count = 0usize;

    for (i, px) in out.pixels_mut().enumerate() {
        if px[3] == 0 {
            continue;
        }
        if core.get_index(i) {
            px[..3].copy_from_slice(&target_rgb);
            px[3] = 255;
            continue;
        }
        let d2 = distance(i);
        if d2 > params.halo_threshold || !has_core_near(i % w, i / w) {
            continue;
        }
        let t = (params.halo_threshold - d2) as f64 / band;
        let k = t * params.strength;
        for c in 0..3 {
            let v = px[c] as f64;
            px[c] = (v + (target_rgb[c] as f64 - v) * k).round().clamp(0.0, 255.0) as u8;
        }
        halo_count += 1;
    }

    tracing::debug!(
        core = core.count(),
        halo = halo_count,
        from = %bg,
        to = %target,
        "recolor pass complete"
    );
    out
}

/// Non-feathered fallback: every masked pixel becomes `target`, fully opaque.
pub fn hard_fill(buf: &PixelBuffer, mask: &Mask, target: Rgb) -> PixelBuffer {
    let mut out = buf.clone();
    let rgba = [target.r, target.g, target.b, 255];
    for (i, px) in out.pixels_mut().enumerate() {
        if mask.get_index(i) {
            px.copy_from_slice(&rgba);
        }
    }
    out
}

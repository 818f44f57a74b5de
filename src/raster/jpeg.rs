//! JPEG ringing detection and repair.
//!
//! Detection compares each pixel with a bilateral-smoothed reference and keeps
//! only deviations sitting in the flat band right next to a strong edge, which
//! is where DCT ringing shows up. Repair smooths with the same bilateral
//! filter, then adds back an unsharp detail term so real texture survives.

use super::buffer::{Mask, PixelBuffer};
use super::color::Rgb;
use super::filters::{bilateral, dilate, gaussian_blur, luma_plane, sobel_magnitude};
use super::params::{ArtifactThresholds, BilateralParams, RepairParams};

/// Mask of suspected ringing pixels.
pub fn detect_artifacts(
    buf: &PixelBuffer,
    thresholds: &ArtifactThresholds,
    smoothing: &BilateralParams,
) -> Mask {
    let (w, h) = (buf.width(), buf.height());
    let mut mask = Mask::new(w, h);
    if buf.is_empty() {
        tracing::warn!("artifact detection skipped: empty buffer");
        return mask;
    }

    let reference = bilateral(buf, smoothing);
    let gradient = sobel_magnitude(&luma_plane(buf), w, h);

    let mut near: Vec<u8> = gradient.iter().map(|&g| (g > thresholds.low_edge) as u8).collect();
    for _ in 0..thresholds.dilate_iters {
        near = dilate(&near, w, h);
    }

    let src = buf.data();
    let smoothed = reference.data();
    for (i, &g) in gradient.iter().enumerate() {
        let core = g > thresholds.high_edge;
        if near[i] == 0 || core || g >= thresholds.flat_gradient {
            continue;
        }
        let o = i * 4;
        let deviation = (0..3)
            .map(|c| (src[o + c] as f32 - smoothed[o + c] as f32).abs())
            .sum::<f32>()
            / 3.0;
        if deviation > thresholds.diff {
            mask.set_index(i);
        }
    }

    tracing::debug!(width = w, height = h, flagged = mask.count(), "artifact detection complete");
    mask
}

/// Overlay buffer: `color` at full opacity where the mask is set, transparent
/// elsewhere.
pub fn highlight_overlay(mask: &Mask, color: Rgb) -> PixelBuffer {
    let mut overlay = PixelBuffer::new(mask.width(), mask.height());
    let rgba = [color.r, color.g, color.b, 255];
    for (i, px) in overlay.pixels_mut().enumerate() {
        if mask.get_index(i) {
            px.copy_from_slice(&rgba);
        }
    }
    overlay
}

/// Detect artifacts and render them as an overlay in one step.
pub fn highlight_artifacts(
    buf: &PixelBuffer,
    thresholds: &ArtifactThresholds,
    smoothing: &BilateralParams,
    color: Rgb,
) -> PixelBuffer {
    highlight_overlay(&detect_artifacts(buf, thresholds, smoothing), color)
}

/// Suppress ringing: `M + amount · (M − blur(M))` where `M` is the bilateral
/// result. Alpha comes from `M`.
pub fn repair_artifacts(buf: &PixelBuffer, params: &RepairParams) -> PixelBuffer {
    if buf.is_empty() {
        tracing::warn!("artifact repair skipped: empty buffer");
        return buf.clone();
    }

    let smoothed = bilateral(buf, &params.bilateral);
    let base = gaussian_blur(&smoothed, params.blur_kernel, params.blur_sigma);

    let mut out = smoothed.clone();
    let (m, g) = (smoothed.data(), base.data());
    for (i, px) in out.pixels_mut().enumerate() {
        let o = i * 4;
        for c in 0..3 {
            let mv = m[o + c] as f32;
            let detail = mv - g[o + c] as f32;
            px[c] = (mv + params.amount * detail).round().clamp(0.0, 255.0) as u8;
        }
    }

    tracing::debug!(
        width = buf.width(),
        height = buf.height(),
        amount = params.amount,
        "artifact repair complete"
    );
    out
}

//! Neighborhood filters used by the JPEG artifact passes.
//!
//! All functions here are pure: they take a buffer or plane and return a new
//! one of the same dimensions.

use super::buffer::PixelBuffer;
use super::params::BilateralParams;

const WEIGHT_EPSILON: f32 = 1e-6;

/// Edge-preserving bilateral smoothing of the RGB channels.
///
/// Weight of a neighbor is `exp(-dx²/2σs²) · exp(-dy²/2σs²) · exp(-|ΔRGB|²/2σr²)`.
/// Pixels closer than `radius` to any edge, and pixels whose weights sum to
/// ~0, pass through unchanged. Alpha is copied from the source.
pub fn bilateral(buf: &PixelBuffer, params: &BilateralParams) -> PixelBuffer {
    let mut out = buf.clone();
    let r = params.radius as usize;
    let (w, h) = (buf.width() as usize, buf.height() as usize);
    if w <= 2 * r || h <= 2 * r {
        return out;
    }

    let two_ss2 = 2.0 * params.sigma_spatial * params.sigma_spatial;
    let two_sr2 = 2.0 * params.sigma_range * params.sigma_range;
    let spatial: Vec<f32> = (0..=2 * r)
        .map(|i| {
            let d = i as f32 - r as f32;
            (-(d * d) / two_ss2).exp()
        })
        .collect();

    let src = buf.data();
    let dst = out.data_mut();

    for y in r..h - r {
        for x in r..w - r {
            let i0 = (y * w + x) * 4;
            let center = [src[i0] as f32, src[i0 + 1] as f32, src[i0 + 2] as f32];
            let mut wsum = 0.0f32;
            let mut acc = [0.0f32; 3];

            for (ky, wy) in spatial.iter().enumerate() {
                let row = (y + ky - r) * w;
                for (kx, wx) in spatial.iter().enumerate() {
                    let ii = (row + x + kx - r) * 4;
                    let n = [src[ii] as f32, src[ii + 1] as f32, src[ii + 2] as f32];
                    let dist2 = (0..3).map(|c| (n[c] - center[c]).powi(2)).sum::<f32>();
                    let weight = wy * wx * (-dist2 / two_sr2).exp();
                    wsum += weight;
                    for c in 0..3 {
                        acc[c] += n[c] * weight;
                    }
                }
            }

            if wsum < WEIGHT_EPSILON {
                continue;
            }
            for c in 0..3 {
                dst[i0 + c] = (acc[c] / wsum).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// BT.601 luma plane.
pub fn luma_plane(buf: &PixelBuffer) -> Vec<f32> {
    buf.pixels()
        .map(|px| 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
        .collect()
}

/// Sobel gradient magnitude `|Gx| + |Gy|`; the one-pixel border is zero.
pub fn sobel_magnitude(plane: &[f32], width: u32, height: u32) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    let mut out = vec![0.0; w * h];
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        let (ym, y0, yp) = ((y - 1) * w, y * w, (y + 1) * w);
        for x in 1..w - 1 {
            let p = |row: usize, dx: isize| plane[(row as isize + x as isize + dx) as usize];
            let gx = -p(ym, -1) - 2.0 * p(y0, -1) - p(yp, -1) + p(ym, 1) + 2.0 * p(y0, 1) + p(yp, 1);
            let gy = p(ym, -1) + 2.0 * p(ym, 0) + p(ym, 1) - p(yp, -1) - 2.0 * p(yp, 0) - p(yp, 1);
            out[y0 + x] = gx.abs() + gy.abs();
        }
    }
    out
}

/// One 3x3 dilation pass over a 0/1 plane, clamping at the edges.
pub fn dilate(mask: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let (y0, y1) = (y.saturating_sub(1), (y + 1).min(h - 1));
        for x in 0..w {
            let (x0, x1) = (x.saturating_sub(1), (x + 1).min(w - 1));
            let on = (y0..=y1).any(|ny| (x0..=x1).any(|nx| mask[ny * w + nx] != 0));
            out[y * w + x] = on as u8;
        }
    }
    out
}

fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as i32;
    let raw: Vec<f32> = (-half..=half)
        .map(|k| (-((k * k) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}

/// Separable Gaussian blur of all four channels, clamping at the edges.
///
/// The horizontal pass is quantized back to bytes before the vertical pass.
pub fn gaussian_blur(buf: &PixelBuffer, kernel_size: u32, sigma: f32) -> PixelBuffer {
    if buf.is_empty() {
        return buf.clone();
    }
    let kernel = gaussian_kernel(kernel_size.max(1), sigma.max(f32::EPSILON));
    let half = (kernel.len() / 2) as i64;
    let (w, h) = (buf.width() as i64, buf.height() as i64);

    let pass = |src: &[u8], horizontal: bool| -> Vec<u8> {
        let mut dst = vec![0u8; src.len()];
        for y in 0..h {
            for x in 0..w {
                for c in 0..4 {
                    let mut acc = 0.0f32;
                    for (k, weight) in kernel.iter().enumerate() {
                        let off = k as i64 - half;
                        let (sx, sy) = if horizontal {
                            ((x + off).clamp(0, w - 1), y)
                        } else {
                            (x, (y + off).clamp(0, h - 1))
                        };
                        acc += src[((sy * w + sx) * 4 + c) as usize] as f32 * weight;
                    }
                    dst[((y * w + x) * 4 + c) as usize] = acc.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        dst
    };

    let tmp = pass(buf.data(), true);
    let blurred = pass(&tmp, false);
    PixelBuffer::from_raw(buf.width(), buf.height(), blurred)
        .unwrap_or_else(|_| buf.clone())
}

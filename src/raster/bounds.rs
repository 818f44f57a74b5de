//! Auto-crop: the tightest rectangle around non-background content.
//!
//! 1. Average a 3x3 patch at each corner of the region of interest.
//! 2. Corners that agree (squared distance under `corner_match`) vote for each
//!    other; the best-supported corner color becomes the region background.
//!    If at least half the corner samples are nearly transparent the caller's
//!    background color is used instead.
//! 3. Flood-fill background from the four corners (4-connected).
//! 4. Trim whole background rows/columns from each side, then pad.
//!
//! The returned rectangle is in buffer coordinates, padded and clamped.

use super::buffer::{Mask, PixelBuffer, Rect};
use super::color::Rgb;
use super::params::CropParams;

/// A view of the region of interest inside a buffer.
struct Region<'a> {
    buf: &'a PixelBuffer,
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
}

impl Region<'_> {
    #[inline]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.buf.pixel(self.x0 + x, self.y0 + y)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

struct CornerPatch {
    rgb: [f64; 3],
    low_alpha_ratio: f64,
}

fn average_patch(region: &Region<'_>, cx: u32, cy: u32, alpha_min: u8) -> CornerPatch {
    let mut sum = [0.0; 3];
    let mut low_alpha = 0u32;
    let mut n = 0u32;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let x = (cx as i64 + dx).clamp(0, region.width as i64 - 1) as u32;
            let y = (cy as i64 + dy).clamp(0, region.height as i64 - 1) as u32;
            let px = region.pixel(x, y);
            for c in 0..3 {
                sum[c] += px[c] as f64;
            }
            if px[3] <= alpha_min {
                low_alpha += 1;
            }
            n += 1;
        }
    }
    CornerPatch {
        rgb: sum.map(|s| s / n as f64),
        low_alpha_ratio: low_alpha as f64 / n as f64,
    }
}

fn patch_distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|c| (a[c] - b[c]).powi(2)).sum()
}

/// Pick the region background from the four corner patches.
fn corner_background(region: &Region<'_>, fallback: Rgb, params: &CropParams) -> Rgb {
    let (w, h) = (region.width - 1, region.height - 1);
    let patches = [(0, 0), (w, 0), (0, h), (w, h)]
        .map(|(x, y)| average_patch(region, x, y, params.alpha_min));

    let transparent = patches.iter().map(|p| p.low_alpha_ratio).sum::<f64>() / 4.0;
    if transparent >= 0.5 {
        tracing::debug!(transparent, background = %fallback, "corners mostly transparent");
        return fallback;
    }

    // Each corner gets one vote from itself and one from every later corner
    // it matches; the stable sort keeps the earliest corner on ties.
    let mut votes: Vec<(usize, u32)> = (0..4).map(|i| (i, 1)).collect();
    for i in 0..4 {
        for j in i + 1..4 {
            if patch_distance_sq(&patches[i].rgb, &patches[j].rgb) < params.corner_match as f64 {
                votes[i].1 += 1;
            }
        }
    }
    votes.sort_by(|a, b| b.1.cmp(&a.1));

    let top = patches[votes[0].0].rgb.map(|v| v.round() as u8);
    Rgb::from(top)
}

fn flood_from_corners(region: &Region<'_>, bg: Rgb, params: &CropParams) -> Mask {
    let (w, h) = (region.width, region.height);
    let mut visited = Mask::new(w, h);
    let mut stack = Vec::new();

    let is_background = |x: u32, y: u32| {
        let px = region.pixel(x, y);
        px[3] <= params.alpha_min || bg.distance_sq(px[0], px[1], px[2]) <= params.tolerance
    };

    let try_push = |x: i64, y: i64, visited: &mut Mask, stack: &mut Vec<(u32, u32)>| {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let id = region.index(x, y);
        if !visited.get_index(id) && is_background(x, y) {
            visited.set_index(id);
            stack.push((x, y));
        }
    };

    let (right, bottom) = (w as i64 - 1, h as i64 - 1);
    for (x, y) in [(0, 0), (right, 0), (0, bottom), (right, bottom)] {
        try_push(x, y, &mut visited, &mut stack);
    }
    while let Some((x, y)) = stack.pop() {
        let (x, y) = (x as i64, y as i64);
        try_push(x + 1, y, &mut visited, &mut stack);
        try_push(x - 1, y, &mut visited, &mut stack);
        try_push(x, y + 1, &mut visited, &mut stack);
        try_push(x, y - 1, &mut visited, &mut stack);
    }
    visited
}

/// Normalize a requested ROI against the buffer.
///
/// A zero-sized or absent ROI means the whole buffer.
fn normalize_roi(buf: &PixelBuffer, roi: Option<Rect>) -> Rect {
    match roi {
        Some(r) if r.w > 0 && r.h > 0 => r.clamp_to(buf.width(), buf.height()),
        _ => Rect::full(buf.width(), buf.height()),
    }
}

/// Detect the padded bounding box of non-background content.
///
/// `roi` restricts the search (buffer coordinates); `fallback_bg` is used when
/// the region's corners are mostly transparent. Returns `None` for an empty
/// buffer or when the region holds no content at all.
pub fn content_bounds(
    buf: &PixelBuffer,
    roi: Option<Rect>,
    fallback_bg: Rgb,
    params: &CropParams,
) -> Option<Rect> {
    if buf.is_empty() {
        tracing::warn!("content bounds skipped: empty buffer");
        return None;
    }

    let roi = normalize_roi(buf, roi);
    let region = Region {
        buf,
        x0: roi.x,
        y0: roi.y,
        width: roi.w,
        height: roi.h,
    };

    let bg = corner_background(&region, fallback_bg, params);
    let visited = flood_from_corners(&region, bg, params);

    let (w, h) = (region.width as i64, region.height as i64);
    let covered = |x: i64, y: i64| visited.get(x as u32, y as u32);
    let col_all_bg = |x: i64, y_min: i64, y_max: i64| (y_min..=y_max).all(|y| covered(x, y));
    let row_all_bg = |y: i64, x_min: i64, x_max: i64| (x_min..=x_max).all(|x| covered(x, y));

    let mut left = (0..w).find(|&x| !col_all_bg(x, 0, h - 1))?;
    let mut right = (0..w).rev().find(|&x| !col_all_bg(x, 0, h - 1))?;
    let mut top = (0..h).find(|&y| !row_all_bg(y, 0, w - 1))?;
    let mut bottom = (0..h).rev().find(|&y| !row_all_bg(y, 0, w - 1))?;

    while left < right && col_all_bg(left, top, bottom) {
        left += 1;
    }
    while left < right && col_all_bg(right, top, bottom) {
        right -= 1;
    }
    while top < bottom && row_all_bg(top, left, right) {
        top += 1;
    }
    while top < bottom && row_all_bg(bottom, left, right) {
        bottom -= 1;
    }

    let content_x = roi.x as i64 + left;
    let content_y = roi.y as i64 + top;
    let content_w = (right - left + 1).max(1);
    let content_h = (bottom - top + 1).max(1);

    let pad = params.padding as i64;
    let (buf_w, buf_h) = (buf.width() as i64, buf.height() as i64);
    let x = (content_x - pad).max(0);
    let y = (content_y - pad).max(0);
    let x_end = (content_x + content_w + pad).min(buf_w);
    let y_end = (content_y + content_h + pad).min(buf_h);

    let rect = Rect::new(
        x as u32,
        y as u32,
        (x_end - x).max(1) as u32,
        (y_end - y).max(1) as u32,
    );
    tracing::debug!(?roi, background = %bg, ?rect, "content bounds detected");
    Some(rect)
}

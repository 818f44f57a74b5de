//! Dominant background color estimation.
//!
//! Samples two rows and two columns just inside the image edge, buckets the
//! opaque samples by their top four bits per channel, and returns the mean
//! color of the most populated bucket. Sampling is inset by ~1% of the short
//! side so a thin border or scan shadow doesn't win.

use super::buffer::PixelBuffer;
use super::color::Rgb;

/// Samples at or below this alpha are ignored.
const MIN_ALPHA: u8 = 8;

#[derive(Clone, Copy, Default)]
struct Bucket {
    count: u32,
    sum: [u64; 3],
}

struct Histogram {
    buckets: Vec<Bucket>,
    /// Keys in first-seen order; ties resolve to the earliest bucket.
    order: Vec<usize>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            buckets: vec![Bucket::default(); 1 << 12],
            order: Vec::new(),
        }
    }

    fn add(&mut self, px: [u8; 4]) {
        if px[3] <= MIN_ALPHA {
            return;
        }
        let key =
            ((px[0] as usize >> 4) << 8) | ((px[1] as usize >> 4) << 4) | (px[2] as usize >> 4);
        let bucket = &mut self.buckets[key];
        if bucket.count == 0 {
            self.order.push(key);
        }
        bucket.count += 1;
        for c in 0..3 {
            bucket.sum[c] += px[c] as u64;
        }
    }

    fn dominant(&self) -> Option<Rgb> {
        let mut best: Option<&Bucket> = None;
        for &key in &self.order {
            let bucket = &self.buckets[key];
            if best.is_none_or(|b| bucket.count > b.count) {
                best = Some(bucket);
            }
        }
        best.map(|b| {
            let mean = |c: usize| (b.sum[c] as f64 / b.count as f64).round() as u8;
            Rgb::new(mean(0), mean(1), mean(2))
        })
    }
}

/// Estimate the background color from the image's edge bands.
///
/// Returns `None` for a zero-area buffer or when every sample is transparent;
/// callers keep whatever color they had before.
pub fn estimate_background(buf: &PixelBuffer) -> Option<Rgb> {
    if buf.is_empty() {
        tracing::warn!("background estimate skipped: empty buffer");
        return None;
    }

    let (w, h) = (buf.width(), buf.height());
    let short = w.min(h);
    let inset = ((short as f64 * 0.01).round() as u32).max(1);
    let step = (short / 80).max(1) as usize;

    let mut hist = Histogram::new();

    let rows = [inset, (h - 1).saturating_sub(inset).max(inset)];
    let cols = [inset, (w - 1).saturating_sub(inset).max(inset)];

    for y in rows.into_iter().filter(|&y| y < h) {
        for x in (0..w).step_by(step) {
            hist.add(buf.pixel(x, y));
        }
    }
    for x in cols.into_iter().filter(|&x| x < w) {
        for y in (0..h).step_by(step) {
            hist.add(buf.pixel(x, y));
        }
    }

    let estimate = hist.dominant();
    tracing::debug!(width = w, height = h, inset, step, ?estimate, "estimated background");
    estimate
}

//! Border-connected background segmentation.
//!
//! A pixel is *background-colored* when it is nearly transparent or within a
//! squared RGB distance of the reference color. Only background-colored
//! pixels reachable from the image border through 4-connected
//! background-colored neighbors end up in the mask, so a white logo on a
//! white page survives as long as something non-white encloses it.

use std::collections::VecDeque;

use super::buffer::{Mask, PixelBuffer};
use super::color::Rgb;
use super::params::SegmentParams;

/// Which matte `remove_background` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalStrategy {
    /// Soft alpha via linear-light color-to-alpha.
    #[default]
    Deblend,
    /// Hard cut-out of border-connected background.
    FloodFill,
}

#[inline]
fn is_background_colored(px: &[u8], bg: Rgb, params: &SegmentParams) -> bool {
    px[3] < params.low_alpha || bg.distance_sq(px[0], px[1], px[2]) <= params.threshold
}

/// Flood-fill from every qualifying border pixel and return the reached set.
pub fn segment_background(buf: &PixelBuffer, bg: Rgb, params: &SegmentParams) -> Mask {
    let (w, h) = (buf.width(), buf.height());
    let mut mask = Mask::new(w, h);
    if buf.is_empty() {
        return mask;
    }

    let data = buf.data();
    let qualifies = |index: usize| is_background_colored(&data[index * 4..index * 4 + 4], bg, params);

    let width = w as usize;
    let height = h as usize;
    let mut queue = VecDeque::new();

    let seed = |index: usize, mask: &mut Mask, queue: &mut VecDeque<usize>| {
        if !mask.get_index(index) && qualifies(index) {
            mask.set_index(index);
            queue.push_back(index);
        }
    };

    for x in 0..width {
        seed(x, &mut mask, &mut queue);
        seed((height - 1) * width + x, &mut mask, &mut queue);
    }
    for y in 0..height {
        seed(y * width, &mut mask, &mut queue);
        seed(y * width + width - 1, &mut mask, &mut queue);
    }

    while let Some(index) = queue.pop_front() {
        let x = index % width;
        let y = index / width;
        let neighbors = [
            (x > 0).then(|| index - 1),
            (x + 1 < width).then(|| index + 1),
            (y > 0).then(|| index - width),
            (y + 1 < height).then(|| index + width),
        ];
        for n in neighbors.into_iter().flatten() {
            if !mask.get_index(n) && qualifies(n) {
                mask.set_index(n);
                queue.push_back(n);
            }
        }
    }

    tracing::debug!(
        width = w,
        height = h,
        selected = mask.count(),
        "flood-fill segmentation complete"
    );
    mask
}

/// Copy of `buf` with every masked pixel made fully transparent.
pub fn apply_mask_transparent(buf: &PixelBuffer, mask: &Mask) -> PixelBuffer {
    let mut out = buf.clone();
    for (i, px) in out.pixels_mut().enumerate() {
        if mask.get_index(i) {
            px[3] = 0;
        }
    }
    out
}

/// Remove the background using the chosen strategy.
///
/// Images that already carry transparency are returned unchanged: their
/// matte is assumed to be intentional.
pub fn remove_background(
    buf: &PixelBuffer,
    bg: Rgb,
    strategy: RemovalStrategy,
    params: &SegmentParams,
) -> PixelBuffer {
    if buf.has_alpha(200) {
        tracing::warn!("image already has transparency; background left as is");
        return buf.clone();
    }
    match strategy {
        RemovalStrategy::Deblend => super::alpha::color_to_alpha(buf, bg),
        RemovalStrategy::FloodFill => {
            let mask = segment_background(buf, bg, params);
            apply_mask_transparent(buf, &mask)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn ring_protects_interior_background_colored_region() {
        // White canvas, black ring (10..20), white hole inside the ring (13..17).
        let mut buf = solid(30, 30, WHITE);
        paint(&mut buf, (10, 10, 10, 10), BLACK);
        paint(&mut buf, (13, 13, 4, 4), WHITE);

        let mask = segment_background(&buf, Rgb::WHITE, &SegmentParams::default());

        let in_ring = |x: u32, y: u32| (10..20).contains(&x) && (10..20).contains(&y);
        assert_mask_matches(&mask, |x, y| !in_ring(x, y));
        assert!(!mask.get(15, 15), "enclosed hole must stay foreground");
    }

    #[test]
    fn threshold_is_inclusive() {
        // distance² to white: 3 * 28² = 2352 <= 2500; 3 * 29² = 2523 > 2500
        let mut buf = solid(3, 1, [227, 227, 227, 255]);
        buf.put_pixel(2, 0, [226, 226, 226, 255]);
        let mask = segment_background(&buf, Rgb::WHITE, &SegmentParams::default());
        assert!(mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(!mask.get(2, 0));
    }

    #[test]
    fn low_alpha_counts_as_background() {
        let mut buf = canvas_with_block(5, 5, BLACK, (0, 0, 5, 1), [200, 0, 0, 9]);
        buf.put_pixel(0, 1, [200, 0, 0, 10]);
        let mask = segment_background(&buf, Rgb::WHITE, &SegmentParams::default());
        assert_mask_matches(&mask, |_, y| y == 0);
    }

    #[test]
    fn fill_is_four_connected_only() {
        // Black canvas, white border-touching pixel at (0,0) and a diagonal
        // neighbor at (1,1) that only connects through a corner.
        let mut buf = solid(4, 4, BLACK);
        buf.put_pixel(0, 0, WHITE);
        buf.put_pixel(1, 1, WHITE);
        let mask = segment_background(&buf, Rgb::WHITE, &SegmentParams::default());
        assert_mask_matches(&mask, |x, y| x == 0 && y == 0);
    }

    #[test]
    fn no_qualifying_border_gives_empty_mask() {
        let buf = canvas_with_block(10, 10, BLACK, (3, 3, 4, 4), WHITE);
        let mask = segment_background(&buf, Rgb::WHITE, &SegmentParams::default());
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn flood_strategy_clears_alpha_only_on_reached_pixels() {
        let buf = canvas_with_block(10, 10, WHITE, (3, 3, 4, 4), BLACK);
        let out = remove_background(
            &buf,
            Rgb::WHITE,
            RemovalStrategy::FloodFill,
            &SegmentParams::default(),
        );
        assert_pixel(&out, 0, 0, [255, 255, 255, 0]);
        assert_pixel(&out, 4, 4, BLACK);
    }

    #[test]
    fn already_transparent_image_is_left_alone() {
        let mut buf = solid(10, 10, WHITE);
        buf.put_pixel(0, 0, [255, 255, 255, 0]);
        let out = remove_background(
            &buf,
            Rgb::WHITE,
            RemovalStrategy::Deblend,
            &SegmentParams::default(),
        );
        assert_eq!(out, buf);
    }

    #[test]
    fn empty_buffer_gives_empty_mask() {
        let mask = segment_background(&PixelBuffer::new(0, 0), Rgb::WHITE, &SegmentParams::default());
        assert_eq!(mask.count(), 0);
    }
}

//! # rastermatte
//!
//! Background removal, recoloring, auto-crop, grayscale and JPEG ringing
//! cleanup for scanned pages and product shots, as a library of pure passes
//! over RGBA buffers plus a small CLI.
//!
//! # Architecture
//!
//! ```text
//! file ──Rasterizer──▶ PixelBuffer ──raster pass──▶ PixelBuffer ──Rasterizer──▶ PNG
//!                          │
//!                          └── estimate_background ──▶ Rgb ──▶ remove / recolor / crop
//! ```
//!
//! The raster passes never touch the filesystem. Decoding and encoding sit
//! behind the [`codec::Rasterizer`] trait, so tests drive the file-level
//! code with a mock and the passes with synthetic buffers.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`raster`] | Pixel algorithms: background estimate, deblend, flood-fill, recolor, bounds, grayscale, JPEG artifacts |
//! | [`codec`] | `Rasterizer` trait and the `image`-crate implementation (decode any, encode PNG) |
//! | [`config`] | TOML config: stock defaults, merging, validation, `gen-config` output |
//! | [`process`] | Operation dispatch, single-file processing, parallel batch over a directory |
//! | [`output`] | CLI output formatting: pure `format_*` functions + `print_*` wrappers |
//!
//! # Design Decisions
//!
//! ## Owned Buffers, Pure Passes
//!
//! Every pass takes a borrowed [`raster::PixelBuffer`] and returns a new one
//! (or a [`raster::Mask`] / [`raster::Rect`]). Nothing is global, nothing is
//! cached between calls. Degenerate input (a zero-sized buffer, no opaque
//! border, no content) yields `None`, an empty mask or an unchanged copy;
//! passes never return errors.
//!
//! ## Linear-Light Deblending
//!
//! Soft background removal works in linear light, not on sRGB bytes.
//! Anti-aliased edges were blended by the camera or renderer in (roughly)
//! linear space, so unmixing them there recovers clean foreground colors
//! instead of gray fringes.
//!
//! ## Two Removal Strategies
//!
//! [`raster::RemovalStrategy::Deblend`] gives a soft alpha matte everywhere
//! the background color appears. [`raster::RemovalStrategy::FloodFill`] only
//! removes background reachable from the image border, which protects
//! same-colored regions inside the subject. Both are exposed; deblend is the
//! default.
//!
//! ## PNG-Only Output
//!
//! Every result may carry alpha, so outputs are always PNG.

pub mod codec;
pub mod config;
pub mod output;
pub mod process;
pub mod raster;

#[cfg(test)]
pub(crate) mod test_helpers;

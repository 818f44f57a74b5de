//! Pixel algorithms over owned RGBA buffers.
//!
//! | Operation | Function |
//! |---|---|
//! | **Estimate background** | [`estimate_background`] (border histogram) |
//! | **Soft removal** | [`color_to_alpha`] (linear-light deblend) |
//! | **Hard removal** | [`segment_background`] + [`apply_mask_transparent`] |
//! | **Recolor** | [`recolor_background`] (core + feathered halo) |
//! | **Auto-crop** | [`content_bounds`] + [`PixelBuffer::crop`] |
//! | **Grayscale** | [`grayscale`] (BT.601 / BT.709) |
//! | **JPEG ringing** | [`detect_artifacts`], [`repair_artifacts`] |
//!
//! The module is split into:
//! - **Data**: [`PixelBuffer`], [`Mask`], [`Rect`], [`Rgb`]
//! - **Parameters**: serde-ready tuning structs with canonical defaults
//! - **Passes**: one module per operation, each a pure function of its inputs
//! - **Filters**: shared neighborhood kernels (bilateral, Sobel, Gaussian)
//!
//! Every pass is single-threaded and total: degenerate input gives `None`,
//! an empty mask, or an unchanged copy rather than an error.

mod alpha;
mod bounds;
mod buffer;
mod color;
pub mod filters;
mod grayscale;
mod jpeg;
mod params;
mod recolor;
mod sampler;
mod segment;

pub use alpha::{color_to_alpha, color_to_alpha_and_fill};
pub use bounds::content_bounds;
pub use buffer::{Mask, PixelBuffer, RasterError, Rect};
pub use color::{Rgb, linear_to_srgb, srgb_to_linear};
pub use grayscale::{grayscale, grayscale_in_place};
pub use jpeg::{detect_artifacts, highlight_artifacts, highlight_overlay, repair_artifacts};
pub use params::{
    ArtifactThresholds, BilateralParams, CropParams, LumaWeights, RecolorParams, RepairParams,
    SegmentParams, Strength,
};
pub use recolor::{hard_fill, recolor_background};
pub use sampler::estimate_background;
pub use segment::{RemovalStrategy, apply_mask_transparent, remove_background, segment_background};

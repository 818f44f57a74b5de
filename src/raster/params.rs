//! Parameter types for the raster passes.
//!
//! These structs describe *how strongly* or *how tolerantly* a pass runs, not
//! what it runs on. Every `Default` is the canonical value the editor ships
//! with; [`config`](crate::config) deserializes overrides into the same
//! structs, so a partial `config.toml` only needs the fields it changes.
//!
//! ## Types
//!
//! - [`Strength`]: blend factor in [0, 1], clamped on construction.
//! - [`LumaWeights`]: BT.601 or BT.709 luma coefficients.
//! - [`SegmentParams`]: flood-fill distance threshold and low-alpha cutoff.
//! - [`RecolorParams`]: core/halo thresholds and feather strength.
//! - [`CropParams`]: corner grouping, background tolerance, padding.
//! - [`BilateralParams`]: radius and sigmas of the edge-preserving smoother.
//! - [`ArtifactThresholds`]: edge gating for JPEG ringing detection.
//! - [`RepairParams`]: bilateral + unsharp restoration settings.

use serde::{Deserialize, Serialize};

/// A blend factor in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Strength(f64);

impl Strength {
    pub const NONE: Strength = Strength(0.0);
    pub const FULL: Strength = Strength(1.0);

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::NONE;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::FULL
    }
}

impl From<f64> for Strength {
    fn from(value: f64) -> Self {
        Strength::new(value)
    }
}

impl From<Strength> for f64 {
    fn from(value: Strength) -> Self {
        value.0
    }
}

/// Luma coefficients for desaturation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LumaWeights {
    /// 0.299 / 0.587 / 0.114
    #[default]
    Bt601,
    /// 0.2126 / 0.7152 / 0.0722
    Bt709,
}

impl LumaWeights {
    pub fn coefficients(self) -> [f64; 3] {
        match self {
            LumaWeights::Bt601 => [0.299, 0.587, 0.114],
            LumaWeights::Bt709 => [0.2126, 0.7152, 0.0722],
        }
    }
}

/// Flood-fill background segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmentParams {
    /// Maximum squared RGB distance to the background (2500 ≈ 50 per channel).
    pub threshold: u32,
    /// Pixels with alpha below this count as background regardless of color.
    pub low_alpha: u8,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            threshold: 2500,
            low_alpha: 10,
        }
    }
}

/// Feathered background recoloring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecolorParams {
    /// Squared distance at or below which a pixel is replaced outright.
    pub seed_threshold: u32,
    /// Squared distance above which a pixel is never touched.
    pub halo_threshold: u32,
    /// Maximum blend toward the target inside the halo band.
    pub strength: f64,
    /// Chebyshev radius searched for a core pixel around a halo candidate.
    pub halo_radius: u32,
}

impl Default for RecolorParams {
    fn default() -> Self {
        Self {
            seed_threshold: 140,
            halo_threshold: 100_000,
            strength: 0.85,
            halo_radius: 2,
        }
    }
}

/// Auto-crop to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropParams {
    /// Two corner patches closer than this (squared) vote for each other.
    pub corner_match: u32,
    /// Squared distance at or below which a pixel is background.
    pub tolerance: u32,
    /// Pixels at or below this alpha are background.
    pub alpha_min: u8,
    /// Pixels added on every side of the detected content.
    pub padding: u32,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            corner_match: 25,
            tolerance: 140,
            alpha_min: 12,
            padding: 1,
        }
    }
}

/// Edge-preserving bilateral smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BilateralParams {
    pub radius: u32,
    pub sigma_spatial: f32,
    pub sigma_range: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            radius: 2,
            sigma_spatial: 2.0,
            sigma_range: 25.0,
        }
    }
}

/// Gating for JPEG ringing detection.
///
/// A pixel is flagged when it deviates from its bilateral-smoothed value by
/// more than `diff`, sits within `dilate_iters` pixels of a gradient above
/// `low_edge`, is not itself above `high_edge`, and is locally flat
/// (gradient below `flat_gradient`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactThresholds {
    pub diff: f32,
    pub low_edge: f32,
    pub high_edge: f32,
    pub dilate_iters: u32,
    pub flat_gradient: f32,
}

impl Default for ArtifactThresholds {
    fn default() -> Self {
        Self {
            diff: 12.0,
            low_edge: 40.0,
            high_edge: 150.0,
            dilate_iters: 1,
            flat_gradient: 50.0,
        }
    }
}

/// JPEG artifact repair: bilateral pass, Gaussian base, unsharp boost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepairParams {
    pub bilateral: BilateralParams,
    /// Odd Gaussian kernel size.
    pub blur_kernel: u32,
    pub blur_sigma: f32,
    /// Multiplier on the detail layer added back.
    pub amount: f32,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            bilateral: BilateralParams::default(),
            blur_kernel: 5,
            blur_sigma: 1.0,
            amount: 1.5,
        }
    }
}

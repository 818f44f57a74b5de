//! Editor configuration.
//!
//! Every tuning knob of the raster passes lives in one TOML file. Stock
//! defaults are the canonical values; a user file passed with `--config`
//! is merged on top, so it only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [background]
//! # color = "#ffffff"      # Fixed background (omit to estimate from the border)
//! fallback = "#ffffff"      # Used when estimation finds nothing
//! strategy = "deblend"      # "deblend" (soft alpha) or "flood-fill" (hard cut)
//!
//! [segment]
//! threshold = 2500          # Squared RGB distance (≈50 per channel)
//! low_alpha = 10
//!
//! [recolor]
//! target = "#ffffff"
//! feather = true            # false = hard fill of the flood-filled mask
//! seed_threshold = 140
//! halo_threshold = 100000
//! strength = 0.85
//! halo_radius = 2
//!
//! [crop]
//! corner_match = 25
//! tolerance = 140
//! alpha_min = 12
//! padding = 1
//!
//! [grayscale]
//! strength = 1.0
//! weights = "bt601"         # or "bt709"
//!
//! [jpeg]
//! highlight_color = "#00e5ff"
//!
//! [jpeg.detect]
//! diff = 12.0
//! low_edge = 40.0
//! high_edge = 150.0
//! dilate_iters = 1
//! flat_gradient = 50.0
//!
//! [jpeg.repair]
//! blur_kernel = 5
//! blur_sigma = 1.0
//! amount = 1.5
//!
//! [jpeg.repair.bilateral]
//! radius = 2
//! sigma_spatial = 2.0
//! sigma_range = 25.0
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::raster::{
    ArtifactThresholds, CropParams, LumaWeights, RecolorParams, RemovalStrategy, RepairParams, Rgb,
    SegmentParams, Strength,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditConfig {
    /// Background color source and removal strategy.
    pub background: BackgroundConfig,
    /// Border flood-fill segmentation.
    pub segment: SegmentParams,
    /// Recolor target and halo feathering.
    pub recolor: RecolorConfig,
    /// Auto-crop detection.
    pub crop: CropParams,
    /// Desaturation.
    pub grayscale: GrayscaleConfig,
    /// JPEG ringing detection and repair.
    pub jpeg: JpegConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl EditConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.recolor;
        if r.seed_threshold >= r.halo_threshold {
            return Err(ConfigError::Validation(
                "recolor.seed_threshold must be below recolor.halo_threshold".into(),
            ));
        }
        if !(0.0..=1.0).contains(&r.strength) {
            return Err(ConfigError::Validation(
                "recolor.strength must be 0-1".into(),
            ));
        }
        let detect = &self.jpeg.detect;
        if detect.low_edge >= detect.high_edge {
            return Err(ConfigError::Validation(
                "jpeg.detect.low_edge must be below jpeg.detect.high_edge".into(),
            ));
        }
        let repair = &self.jpeg.repair;
        if repair.bilateral.radius == 0 {
            return Err(ConfigError::Validation(
                "jpeg.repair.bilateral.radius must be non-zero".into(),
            ));
        }
        if repair.bilateral.sigma_spatial <= 0.0 || repair.bilateral.sigma_range <= 0.0 {
            return Err(ConfigError::Validation(
                "jpeg.repair.bilateral sigmas must be positive".into(),
            ));
        }
        if repair.blur_kernel == 0 || repair.blur_kernel % 2 == 0 {
            return Err(ConfigError::Validation(
                "jpeg.repair.blur_kernel must be odd".into(),
            ));
        }
        if repair.blur_sigma <= 0.0 {
            return Err(ConfigError::Validation(
                "jpeg.repair.blur_sigma must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Where the reference background color comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Fixed background color. When absent it is estimated from the border.
    pub color: Option<Rgb>,
    /// Used when estimation finds no opaque border pixels, and as the
    /// auto-crop background when the corners are transparent.
    pub fallback: Rgb,
    /// Matte produced by `remove-bg`.
    pub strategy: RemovalStrategy,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            color: None,
            fallback: Rgb::WHITE,
            strategy: RemovalStrategy::default(),
        }
    }
}

/// Recolor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecolorConfig {
    /// New background color.
    pub target: Rgb,
    /// Feathered halo blend; `false` hard-fills the flood-filled background.
    pub feather: bool,
    pub seed_threshold: u32,
    pub halo_threshold: u32,
    pub strength: f64,
    pub halo_radius: u32,
}

impl Default for RecolorConfig {
    fn default() -> Self {
        let p = RecolorParams::default();
        Self {
            target: Rgb::WHITE,
            feather: true,
            seed_threshold: p.seed_threshold,
            halo_threshold: p.halo_threshold,
            strength: p.strength,
            halo_radius: p.halo_radius,
        }
    }
}

impl RecolorConfig {
    pub fn params(&self) -> RecolorParams {
        RecolorParams {
            seed_threshold: self.seed_threshold,
            halo_threshold: self.halo_threshold,
            strength: self.strength,
            halo_radius: self.halo_radius,
        }
    }
}

/// Desaturation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrayscaleConfig {
    /// 0 = untouched, 1 = fully gray. Out-of-range values are clamped.
    pub strength: Strength,
    pub weights: LumaWeights,
}

/// JPEG artifact settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JpegConfig {
    /// Overlay color for `jpeg-highlight`.
    pub highlight_color: Rgb,
    pub detect: ArtifactThresholds,
    /// Repair settings. Detection uses the same bilateral reference.
    pub repair: RepairParams,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self {
            highlight_color: Rgb::new(0x00, 0xe5, 0xff),
            detect: ArtifactThresholds::default(),
            repair: RepairParams::default(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EditConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config: stock defaults, then `path` if given.
///
/// A named file that does not exist is an error; with no path the stock
/// defaults are returned.
pub fn load_config(path: Option<&Path>) -> Result<EditConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(p) => Some(load_raw_config(p)?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", p.display()),
            )
        })?),
        None => None,
    };
    let config = resolve_config(base, overlay)?;
    tracing::debug!(?path, "config loaded");
    Ok(config)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rastermatte configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Distances are squared RGB distances: sum of (channel difference)^2.
# 2500 is roughly 50 per channel; 140 is roughly 7 per channel.

# ---------------------------------------------------------------------------
# Background reference color
# ---------------------------------------------------------------------------
[background]
# Fixed background color. Leave commented out to estimate it from a
# histogram of the image border.
# color = "#ffffff"

# Used when the border has no opaque pixels to estimate from, and as the
# auto-crop background when the image corners are transparent.
fallback = "#ffffff"

# remove-bg matte: "deblend" recovers soft alpha in linear light;
# "flood-fill" cuts out border-connected background with hard edges.
strategy = "deblend"

# ---------------------------------------------------------------------------
# Flood-fill segmentation (remove-bg strategy "flood-fill", recolor feather=false)
# ---------------------------------------------------------------------------
[segment]
threshold = 2500
# Pixels with alpha below this are background regardless of color.
low_alpha = 10

# ---------------------------------------------------------------------------
# Background recolor
# ---------------------------------------------------------------------------
[recolor]
target = "#ffffff"
# Blend a halo around the old background instead of a hard replacement.
feather = true
# At or below: replaced outright with the target color.
seed_threshold = 140
# Above: never touched. Between the two: blended if a core pixel is near.
halo_threshold = 100000
# Maximum blend toward the target in the halo band (0-1).
strength = 0.85
# How far (in pixels, including diagonals) to look for a core pixel.
halo_radius = 2

# ---------------------------------------------------------------------------
# Auto-crop
# ---------------------------------------------------------------------------
[crop]
# Corner patches closer than this vote for each other.
corner_match = 25
# Background tolerance for the flood from the corners.
tolerance = 140
# Pixels at or below this alpha are background.
alpha_min = 12
# Pixels kept around the content on every side.
padding = 1

# ---------------------------------------------------------------------------
# Grayscale
# ---------------------------------------------------------------------------
[grayscale]
# 0 = untouched, 1 = fully desaturated.
strength = 1.0
# Luma coefficients: "bt601" (0.299/0.587/0.114) or "bt709".
weights = "bt601"

# ---------------------------------------------------------------------------
# JPEG artifacts
# ---------------------------------------------------------------------------
[jpeg]
# Overlay color used by jpeg-highlight.
highlight_color = "#00e5ff"

[jpeg.detect]
# Mean per-channel deviation from the smoothed image to flag a pixel.
diff = 12.0
# Gradient that marks "near an edge" (after dilation).
low_edge = 40.0
# Gradient that marks the edge itself (never flagged).
high_edge = 150.0
dilate_iters = 1
# Flagged pixels must be flatter than this.
flat_gradient = 50.0

[jpeg.repair]
# Odd Gaussian kernel size for the low-frequency base.
blur_kernel = 5
blur_sigma = 1.0
# Detail added back: result = smooth + amount * (smooth - blurred).
amount = 1.5

# Edge-preserving smoother shared by detection and repair.
[jpeg.repair.bilateral]
radius = 2
sigma_spatial = 2.0
sigma_range = 25.0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel batch workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_canonical_values() {
        let config = EditConfig::default();
        assert_eq!(config.background.fallback, Rgb::WHITE);
        assert_eq!(config.background.color, None);
        assert_eq!(config.background.strategy, RemovalStrategy::Deblend);
        assert_eq!(config.segment.threshold, 2500);
        assert_eq!(config.recolor.params(), RecolorParams::default());
        assert_eq!(config.jpeg.highlight_color.to_hex(), "#00e5ff");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[background]
color = "#fafafa"

[recolor]
target = "#000"
"##;
        let config: EditConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.background.color, Some(Rgb::new(250, 250, 250)));
        assert_eq!(config.recolor.target, Rgb::BLACK);
        // Unspecified values use defaults
        assert_eq!(config.recolor.strength, 0.85);
        assert_eq!(config.crop, CropParams::default());
    }

    #[test]
    fn parse_strategy_and_weights() {
        let toml = r#"
[background]
strategy = "flood-fill"

[grayscale]
weights = "bt709"
strength = 0.5
"#;
        let config: EditConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.background.strategy, RemovalStrategy::FloodFill);
        assert_eq!(config.grayscale.weights, LumaWeights::Bt709);
        assert_eq!(config.grayscale.strength, Strength::new(0.5));
    }

    #[test]
    fn grayscale_strength_is_clamped_on_load() {
        let config: EditConfig = toml::from_str("[grayscale]\nstrength = 3.0\n").unwrap();
        assert_eq!(config.grayscale.strength, Strength::FULL);
    }

    #[test]
    fn parse_nested_jpeg_tables() {
        let toml = r#"
[jpeg.detect]
diff = 20.0

[jpeg.repair.bilateral]
radius = 3
"#;
        let config: EditConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.jpeg.detect.diff, 20.0);
        assert_eq!(config.jpeg.detect.low_edge, 40.0);
        assert_eq!(config.jpeg.repair.bilateral.radius, 3);
        assert_eq!(config.jpeg.repair.bilateral.sigma_range, 25.0);
        assert_eq!(config.jpeg.repair.amount, 1.5);
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("padding = 1").unwrap();
        let overlay: toml::Value = toml::from_str("padding = 4").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("padding").unwrap().as_integer(), Some(4));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[jpeg.repair.bilateral]\nradius = 4\n").unwrap();
        let merged = merge_toml(base, overlay);
        let bilateral = &merged["jpeg"]["repair"]["bilateral"];
        assert_eq!(bilateral["radius"].as_integer(), Some(4));
        assert_eq!(bilateral["sigma_range"].as_float(), Some(25.0));
        assert_eq!(merged["jpeg"]["repair"]["blur_kernel"].as_integer(), Some(5));
    }

    // =========================================================================
    // Unknown keys
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<EditConfig, _> = toml::from_str("[crop]\npaddding = 2\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<EditConfig, _> = toml::from_str("[sharpen]\namount = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<EditConfig, _> =
            toml::from_str("[jpeg.repair.bilateral]\nsigma = 2.0\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EditConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_recolor_thresholds_ordered() {
        let mut config = EditConfig::default();
        config.recolor.seed_threshold = config.recolor.halo_threshold;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_recolor_strength_range() {
        let mut config = EditConfig::default();
        config.recolor.strength = 1.2;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_edge_thresholds_ordered() {
        let mut config = EditConfig::default();
        config.jpeg.detect.low_edge = 200.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_bilateral_radius_and_sigma() {
        let mut config = EditConfig::default();
        config.jpeg.repair.bilateral.radius = 0;
        assert!(config.validate().is_err());

        let mut config = EditConfig::default();
        config.jpeg.repair.bilateral.sigma_range = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_blur_kernel_must_be_odd() {
        let mut config = EditConfig::default();
        config.jpeg.repair.blur_kernel = 4;
        assert!(config.validate().is_err());
        config.jpeg.repair.blur_kernel = 7;
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_without_path_is_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config, EditConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("edit.toml");
        fs::write(&path, "[crop]\npadding = 6\n\n[processing]\nmax_processes = 2\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.crop.padding, 6);
        assert_eq!(config.crop.tolerance, 140);
        assert_eq!(config.processing.max_processes, Some(2));
    }

    #[test]
    fn load_config_missing_named_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("edit.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("edit.toml");
        fs::write(&path, "[recolor]\nseed_threshold = 200000\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(&tmp.path().join("x.toml")).unwrap().is_none());
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: EditConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, EditConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[background]",
            "[segment]",
            "[recolor]",
            "[crop]",
            "[grayscale]",
            "[jpeg]",
            "[jpeg.detect]",
            "[jpeg.repair]",
            "[jpeg.repair.bilateral]",
            "[processing]",
        ] {
            assert!(content.contains(section), "{section} missing");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        for key in ["background", "segment", "recolor", "crop", "grayscale", "jpeg", "processing"] {
            assert!(val.get(key).is_some(), "{key} missing");
        }
    }
}

//! Colors and color math shared by every pass.
//!
//! [`Rgb`] is the reference/target color type. Its wire form is a `#rrggbb`
//! hex string, which is also how it serializes in `config.toml`.
//!
//! The sRGB transfer functions live here because both the alpha recoverer and
//! the deblend-and-fill path need them; the forward direction is a 256-entry
//! lookup table since inputs are always bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color leniently.
    ///
    /// Accepts `#rrggbb`, `rrggbb` and the `#rgb` shorthand. Surrounding
    /// whitespace is ignored. Any channel that is missing or not valid hex
    /// becomes 0, so this never fails.
    ///
    /// ```
    /// # use rastermatte::raster::Rgb;
    /// assert_eq!(Rgb::from_hex("#ff8000"), Rgb::new(255, 128, 0));
    /// assert_eq!(Rgb::from_hex("#fff"), Rgb::WHITE);
    /// assert_eq!(Rgb::from_hex("#12"), Rgb::new(0x12, 0, 0));
    /// ```
    pub fn from_hex(hex: &str) -> Self {
        let trimmed = hex.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed).trim();

        let expanded: String = if digits.chars().count() == 3 {
            digits.chars().flat_map(|c| [c, c]).collect()
        } else {
            digits.to_string()
        };

        let channel = |start: usize| -> u8 {
            expanded
                .get(start..start + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .unwrap_or(0)
        };

        Self::new(channel(0), channel(2), channel(4))
    }

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Squared Euclidean distance in byte RGB space.
    #[inline]
    pub fn distance_sq(self, r: u8, g: u8, b: u8) -> u32 {
        let dr = self.r as i32 - r as i32;
        let dg = self.g as i32 - g as i32;
        let db = self.b as i32 - b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<String> for Rgb {
    fn from(value: String) -> Self {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

static SRGB_TO_LINEAR: LazyLock<[f64; 256]> = LazyLock::new(|| {
    let mut lut = [0.0; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        let c = v as f64 / 255.0;
        *slot = if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        };
    }
    lut
});

/// sRGB byte to linear light in [0, 1].
#[inline]
pub fn srgb_to_linear(v: u8) -> f64 {
    SRGB_TO_LINEAR[v as usize]
}

/// Linear light back to an sRGB byte, clamped and rounded.
#[inline]
pub fn linear_to_srgb(v: f64) -> u8 {
    let encoded = if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

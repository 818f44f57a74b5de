//! Decode and encode at the edge of the pixel core.
//!
//! The [`Rasterizer`] trait is the seam between files on disk and the owned
//! [`PixelBuffer`]s the raster passes work on. Everything in [`crate::raster`]
//! is format-agnostic; this module is the only place that knows about JPEG,
//! PNG and friends.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` → `to_rgba8` |
//! | Encode → PNG | `image::RgbaImage::save_with_format` |

use crate::raster::{PixelBuffer, RasterError};
use image::{ImageFormat, ImageReader, RgbaImage};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: String, message: String },
    #[error(transparent)]
    Buffer(#[from] RasterError),
}

/// Turns files into RGBA buffers and back.
///
/// `Sync` so a single instance can be shared across rayon workers.
pub trait Rasterizer: Sync {
    /// Decode an image file into an RGBA buffer.
    fn rasterize(&self, path: &Path) -> Result<PixelBuffer, CodecError>;

    /// Encode a buffer as PNG at `path`.
    fn encode_png(&self, buf: &PixelBuffer, path: &Path) -> Result<(), CodecError>;
}

const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Extensions whose decoders are compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has a decodable extension (case-insensitive).
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// [`Rasterizer`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageRasterizer;

impl ImageRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for ImageRasterizer {
    fn rasterize(&self, path: &Path) -> Result<PixelBuffer, CodecError> {
        let decoded = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| CodecError::Decode {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!(path = %path.display(), width, height, "decoded");
        Ok(PixelBuffer::from_raw(width, height, rgba.into_raw())?)
    }

    fn encode_png(&self, buf: &PixelBuffer, path: &Path) -> Result<(), CodecError> {
        let encode_err = |message: String| CodecError::Encode {
            path: path.display().to_string(),
            message,
        };
        let img = RgbaImage::from_raw(buf.width(), buf.height(), buf.data().to_vec())
            .ok_or_else(|| encode_err("buffer does not match its dimensions".to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        img.save_with_format(path, ImageFormat::Png)
            .map_err(|e| encode_err(e.to_string()))?;
        tracing::debug!(path = %path.display(), "encoded png");
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::sync::Mutex;

    /// Rasterizer that hands out one fixed buffer and records every call.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    pub struct MockRasterizer {
        pub buffer: PixelBuffer,
        /// File names containing this string fail to decode.
        pub fail_on: Option<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Rasterize(String),
        EncodePng {
            output: String,
            width: u32,
            height: u32,
        },
    }

    impl MockRasterizer {
        pub fn with_buffer(buffer: PixelBuffer) -> Self {
            Self {
                buffer,
                fail_on: None,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_on(mut self, pattern: &str) -> Self {
            self.fail_on = Some(pattern.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl Rasterizer for MockRasterizer {
        fn rasterize(&self, path: &Path) -> Result<PixelBuffer, CodecError> {
            let name = path.to_string_lossy().to_string();
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Rasterize(name.clone()));
            if self.fail_on.as_ref().is_some_and(|p| name.contains(p.as_str())) {
                return Err(CodecError::Decode {
                    path: name,
                    message: "mock failure".to_string(),
                });
            }
            Ok(self.buffer.clone())
        }

        fn encode_png(&self, buf: &PixelBuffer, path: &Path) -> Result<(), CodecError> {
            self.operations.lock().unwrap().push(RecordedOp::EncodePng {
                output: path.to_string_lossy().to_string(),
                width: buf.width(),
                height: buf.height(),
            });
            Ok(())
        }
    }

    #[test]
    fn mock_records_rasterize_and_encode() {
        let mock = MockRasterizer::with_buffer(solid(3, 2, WHITE));
        let buf = mock.rasterize(Path::new("/in/a.jpg")).unwrap();
        mock.encode_png(&buf, Path::new("/out/a.png")).unwrap();

        let ops = mock.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Rasterize(p) if p == "/in/a.jpg"));
        assert!(matches!(
            &ops[1],
            RecordedOp::EncodePng {
                width: 3,
                height: 2,
                ..
            }
        ));
    }

    #[test]
    fn mock_fails_on_pattern() {
        let mock = MockRasterizer::with_buffer(solid(1, 1, WHITE)).failing_on("broken");
        assert!(mock.rasterize(Path::new("/in/broken.png")).is_err());
        assert!(mock.rasterize(Path::new("/in/fine.png")).is_ok());
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/out.png");
        let mut buf = canvas_with_block(8, 6, WHITE, (2, 1, 3, 3), [10, 200, 30, 128]);
        buf.put_pixel(0, 0, [0, 0, 0, 0]);

        let rasterizer = ImageRasterizer::new();
        rasterizer.encode_png(&buf, &path).unwrap();
        let back = rasterizer.rasterize(&path).unwrap();
        assert_eq!(back, buf);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ImageRasterizer::new().rasterize(Path::new("/nonexistent/x.png"));
        assert!(matches!(result, Err(CodecError::Io(_))));
    }

    #[test]
    fn garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("junk.png");
        std::fs::write(&path, b"not an image").unwrap();
        let result = ImageRasterizer::new().rasterize(&path);
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn supported_extensions_cover_common_formats() {
        let exts = supported_input_extensions();
        for ext in ["jpg", "jpeg", "png", "webp"] {
            assert!(exts.contains(&ext), "{ext} missing");
        }
        assert!(is_supported_input(Path::new("photo.JPG")));
        assert!(!is_supported_input(Path::new("notes.txt")));
        assert!(!is_supported_input(Path::new("no_extension")));
    }
}

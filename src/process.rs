//! Applying raster passes to files.
//!
//! Ties the pure passes in [`crate::raster`] to files on disk through a
//! [`Rasterizer`]. Single-file commands go through [`process_file`]; the
//! `batch` command walks a directory with [`process_dir`].
//!
//! ## Output Structure
//!
//! Every result is written as PNG named after the source and the operation,
//! mirroring the input directory layout:
//!
//! ```text
//! scans/                      out/
//! ├── page-01.jpg      →      ├── page-01-remove-bg.png
//! └── covers/                 └── covers/
//!     └── front.png    →          └── front-remove-bg.png
//! ```
//!
//! ## Parallel Processing
//!
//! Files are processed in parallel using [rayon](https://docs.rs/rayon); each
//! pass on a single buffer stays single-threaded. Progress is streamed as
//! [`ProcessEvent`]s over an optional `mpsc` channel so the CLI can print
//! while workers run.

use crate::codec::{CodecError, Rasterizer, is_supported_input};
use crate::config::EditConfig;
use crate::raster::{
    self, PixelBuffer, Rect, Rgb, content_bounds, estimate_background, grayscale,
    hard_fill, highlight_artifacts, recolor_background, remove_background, repair_artifacts,
    segment_background,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// A buffer → buffer edit that can be applied to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Make the background transparent.
    RemoveBg,
    /// Replace the background color.
    Recolor,
    /// Crop to the detected content.
    Autocrop,
    /// Desaturate.
    Grayscale,
    /// Render a JPEG ringing overlay.
    JpegHighlight,
    /// Suppress JPEG ringing.
    JpegRepair,
}

impl Operation {
    /// File name suffix for outputs of this operation.
    pub fn suffix(self) -> &'static str {
        match self {
            Operation::RemoveBg => "remove-bg",
            Operation::Recolor => "recolor",
            Operation::Autocrop => "autocrop",
            Operation::Grayscale => "grayscale",
            Operation::JpegHighlight => "jpeg-highlight",
            Operation::JpegRepair => "jpeg-repair",
        }
    }

    /// Whether this operation needs a reference background color.
    pub fn uses_background(self) -> bool {
        matches!(
            self,
            Operation::RemoveBg | Operation::Recolor | Operation::Autocrop
        )
    }

    /// Run the operation on one buffer.
    pub fn apply(self, buf: &PixelBuffer, config: &EditConfig) -> PixelBuffer {
        let bg = || reference_background(buf, config);
        match self {
            Operation::RemoveBg => {
                remove_background(buf, bg(), config.background.strategy, &config.segment)
            }
            Operation::Recolor => recolor(buf, bg(), config),
            Operation::Autocrop => match content_bounds(buf, None, bg(), &config.crop) {
                Some(rect) => buf.crop(rect),
                None => {
                    tracing::warn!("no content found; image left uncropped");
                    buf.clone()
                }
            },
            Operation::Grayscale => {
                grayscale(buf, config.grayscale.strength, config.grayscale.weights)
            }
            Operation::JpegHighlight => highlight_artifacts(
                buf,
                &config.jpeg.detect,
                &config.jpeg.repair.bilateral,
                config.jpeg.highlight_color,
            ),
            Operation::JpegRepair => repair_artifacts(buf, &config.jpeg.repair),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Background color for a buffer: the configured color, else the border
/// estimate, else the configured fallback.
pub fn reference_background(buf: &PixelBuffer, config: &EditConfig) -> Rgb {
    config
        .background
        .color
        .or_else(|| estimate_background(buf))
        .unwrap_or(config.background.fallback)
}

/// Recolor with the configured method: feathered halo or hard flood fill.
pub fn recolor(buf: &PixelBuffer, bg: Rgb, config: &EditConfig) -> PixelBuffer {
    let target = config.recolor.target;
    if config.recolor.feather {
        recolor_background(buf, bg, target, &config.recolor.params())
    } else {
        let mask = segment_background(buf, bg, &config.segment);
        hard_fill(buf, &mask, target)
    }
}

/// What `detect` reports about one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectReport {
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// Border estimate; `None` when no opaque border pixel was found.
    pub background: Option<Rgb>,
    pub has_alpha: bool,
    /// Padded content rectangle; `None` for a blank image.
    pub bounds: Option<Rect>,
    /// Pixels flagged as JPEG ringing.
    pub artifact_pixels: usize,
}

/// Analyze a buffer without changing it.
pub fn detect(source: &str, buf: &PixelBuffer, config: &EditConfig) -> DetectReport {
    let background = estimate_background(buf);
    let crop_bg = config
        .background
        .color
        .or(background)
        .unwrap_or(config.background.fallback);
    let artifacts =
        raster::detect_artifacts(buf, &config.jpeg.detect, &config.jpeg.repair.bilateral);
    DetectReport {
        source: source.to_string(),
        width: buf.width(),
        height: buf.height(),
        background,
        has_alpha: buf.has_alpha(200),
        bounds: content_bounds(buf, None, crop_bg, &config.crop),
        artifact_pixels: artifacts.count(),
    }
}

/// `<dir>/<stem>-<suffix>.png`
pub fn output_path_for(source: &Path, dir: &Path, op: Operation) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    dir.join(format!("{stem}-{}.png", op.suffix()))
}

/// Decode `source`, apply `op`, encode the result as PNG at `output`.
///
/// Returns the output dimensions.
pub fn process_file(
    rasterizer: &dyn Rasterizer,
    op: Operation,
    source: &Path,
    output: &Path,
    config: &EditConfig,
) -> Result<(u32, u32), ProcessError> {
    let buf = rasterizer.rasterize(source)?;
    let result = op.apply(&buf, config);
    rasterizer.encode_png(&result, output)?;
    tracing::info!(
        op = %op,
        source = %source.display(),
        output = %output.display(),
        "processed"
    );
    Ok((result.width(), result.height()))
}

/// Progress events streamed by [`process_dir`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    Started {
        operation: Operation,
        total: usize,
    },
    FileProcessed {
        index: usize,
        source: String,
        output: String,
        width: u32,
        height: u32,
    },
    FileSkipped {
        source: String,
    },
    FileFailed {
        index: usize,
        source: String,
        error: String,
    },
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    /// Files without a decodable extension.
    pub skipped: usize,
    /// Files that failed to decode or encode.
    pub failed: usize,
}

enum FileOutcome {
    Processed,
    Failed,
}

struct Job {
    source: PathBuf,
    output: PathBuf,
    /// Index of the earlier job writing the same output.
    shadowed_by: Option<usize>,
}

fn is_same_dir(path: &Path, canonical: &Path) -> bool {
    path.canonicalize().is_ok_and(|p| p == canonical)
}

/// Apply `op` to every image under `input_dir`, writing PNGs to `output_dir`.
///
/// Per-file failures are reported as events and counted, not returned; only
/// problems with the directories themselves are errors. Files already inside
/// `output_dir` are ignored so the output can live under the input. When two
/// sources in one directory share a stem, the later one fails instead of
/// overwriting the earlier result.
pub fn process_dir(
    rasterizer: &dyn Rasterizer,
    op: Operation,
    input_dir: &Path,
    output_dir: &Path,
    config: &EditConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchSummary, ProcessError> {
    if !input_dir.is_dir() {
        return Err(ProcessError::NotADirectory(input_dir.to_path_buf()));
    }
    std::fs::create_dir_all(output_dir)?;
    let output_root = output_dir.canonicalize()?;

    let emit = |event: ProcessEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };

    let mut sources = Vec::new();
    let mut skipped = 0;
    let walker = WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && is_same_dir(e.path(), &output_root)));
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if is_supported_input(path) {
            sources.push(path.to_path_buf());
        } else {
            skipped += 1;
            emit(ProcessEvent::FileSkipped {
                source: path.display().to_string(),
            });
        }
    }

    // Sources sharing a stem in one directory map to the same output; the
    // first in walk order keeps it.
    let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
    let jobs: Vec<Job> = sources
        .into_iter()
        .enumerate()
        .map(|(i, source)| {
            let rel_parent = source
                .parent()
                .and_then(|p| p.strip_prefix(input_dir).ok())
                .unwrap_or(Path::new(""));
            let output = output_path_for(&source, &output_dir.join(rel_parent), op);
            let first = *claimed.entry(output.clone()).or_insert(i);
            Job {
                source,
                output,
                shadowed_by: (first != i).then_some(first),
            }
        })
        .collect();

    emit(ProcessEvent::Started {
        operation: op,
        total: jobs.len(),
    });

    let outcomes: Vec<FileOutcome> = jobs
        .par_iter()
        .enumerate()
        .map(|(i, job)| {
            let (source, output) = (&job.source, &job.output);
            if let Some(first) = job.shadowed_by {
                let error = format!(
                    "output {} already produced from {}",
                    output.display(),
                    jobs[first].source.display()
                );
                tracing::warn!(source = %source.display(), %error, "output collision");
                emit(ProcessEvent::FileFailed {
                    index: i + 1,
                    source: source.display().to_string(),
                    error,
                });
                return FileOutcome::Failed;
            }
            match process_file(rasterizer, op, source, output, config) {
                Ok((width, height)) => {
                    emit(ProcessEvent::FileProcessed {
                        index: i + 1,
                        source: source.display().to_string(),
                        output: output.display().to_string(),
                        width,
                        height,
                    });
                    FileOutcome::Processed
                }
                Err(e) => {
                    tracing::warn!(source = %source.display(), error = %e, "file failed");
                    emit(ProcessEvent::FileFailed {
                        index: i + 1,
                        source: source.display().to_string(),
                        error: e.to_string(),
                    });
                    FileOutcome::Failed
                }
            }
        })
        .collect();

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, FileOutcome::Failed))
        .count();
    let summary = BatchSummary {
        processed: outcomes.len() - failed,
        skipped,
        failed,
    };
    tracing::debug!(?summary, "batch complete");
    Ok(summary)
}

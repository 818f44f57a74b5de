//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Detect
//!
//! ```text
//! scan.jpg (1200x1600)
//!     Background: #f8f6f0
//!     Alpha: none
//!     Content: 84,120 1032x1390
//!     Artifacts: 312 px (0.02%)
//! ```
//!
//! ## Single-file edits
//!
//! ```text
//! Background: #ffffff
//! Bounds: 39,39 22x22
//! Wrote scan-autocrop.png (22x22)
//! ```
//!
//! ## Batch
//!
//! ```text
//! remove-bg (3 images)
//!     001 scans/a.jpg → out/a-remove-bg.png (800x600)
//!     002 scans/b.jpg FAILED: Failed to decode scans/b.jpg: ...
//!     skipped scans/notes.txt
//! Processed 2, skipped 1, failed 1
//! ```
//!
//! # Architecture
//!
//! Each result has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::process::{BatchSummary, DetectReport, ProcessEvent};
use crate::raster::{Rect, Rgb};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// `x,y WxH`
pub fn format_rect(rect: &Rect) -> String {
    format!("{},{} {}x{}", rect.x, rect.y, rect.w, rect.h)
}

/// Background line; `None` means nothing opaque was found on the border.
pub fn format_background(bg: Option<Rgb>) -> String {
    match bg {
        Some(c) => format!("Background: {}", c.to_hex()),
        None => "Background: none (no opaque border pixels)".to_string(),
    }
}

pub fn format_bounds(bounds: Option<Rect>) -> String {
    match bounds {
        Some(r) => format!("Bounds: {}", format_rect(&r)),
        None => "Bounds: no content found".to_string(),
    }
}

pub fn format_written(path: &str, width: u32, height: u32) -> String {
    format!("Wrote {} ({}x{})", path, width, height)
}

/// Format a detect report as display lines.
pub fn format_detect_report(report: &DetectReport) -> Vec<String> {
    let total = report.width as usize * report.height as usize;
    let share = if total == 0 {
        0.0
    } else {
        report.artifact_pixels as f64 * 100.0 / total as f64
    };
    vec![
        format!("{} ({}x{})", report.source, report.width, report.height),
        format!("    {}", format_background(report.background)),
        format!(
            "    Alpha: {}",
            if report.has_alpha { "present" } else { "none" }
        ),
        match report.bounds {
            Some(r) => format!("    Content: {}", format_rect(&r)),
            None => "    Content: none".to_string(),
        },
        format!("    Artifacts: {} px ({:.2}%)", report.artifact_pixels, share),
    ]
}

pub fn print_detect_report(report: &DetectReport) {
    for line in format_detect_report(report) {
        println!("{}", line);
    }
}

/// Format a single batch progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { operation, total } => {
            vec![format!("{} ({} images)", operation, total)]
        }
        ProcessEvent::FileProcessed {
            index,
            source,
            output,
            width,
            height,
        } => vec![format!(
            "    {} {} → {} ({}x{})",
            format_index(*index),
            source,
            output,
            width,
            height
        )],
        ProcessEvent::FileSkipped { source } => vec![format!("    skipped {}", source)],
        ProcessEvent::FileFailed {
            index,
            source,
            error,
        } => vec![format!(
            "    {} {} FAILED: {}",
            format_index(*index),
            source,
            error
        )],
    }
}

pub fn format_summary(summary: &BatchSummary) -> String {
    format!(
        "Processed {}, skipped {}, failed {}",
        summary.processed, summary.skipped, summary.failed
    )
}

pub fn print_summary(summary: &BatchSummary) {
    println!("{}", format_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Operation;

    fn report() -> DetectReport {
        DetectReport {
            source: "scan.png".to_string(),
            width: 100,
            height: 100,
            background: Some(Rgb::WHITE),
            has_alpha: false,
            bounds: Some(Rect::new(39, 39, 22, 22)),
            artifact_pixels: 25,
        }
    }

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn rect_and_bounds() {
        assert_eq!(format_rect(&Rect::new(1, 2, 3, 4)), "1,2 3x4");
        assert_eq!(format_bounds(Some(Rect::new(39, 39, 22, 22))), "Bounds: 39,39 22x22");
        assert_eq!(format_bounds(None), "Bounds: no content found");
    }

    #[test]
    fn background_line() {
        assert_eq!(format_background(Some(Rgb::new(255, 128, 0))), "Background: #ff8000");
        assert!(format_background(None).contains("none"));
    }

    #[test]
    fn detect_report_lines() {
        let lines = format_detect_report(&report());
        assert_eq!(
            lines,
            vec![
                "scan.png (100x100)",
                "    Background: #ffffff",
                "    Alpha: none",
                "    Content: 39,39 22x22",
                "    Artifacts: 25 px (0.25%)",
            ]
        );
    }

    #[test]
    fn detect_report_without_content() {
        let mut r = report();
        r.bounds = None;
        r.background = None;
        r.has_alpha = true;
        let lines = format_detect_report(&r);
        assert!(lines[1].contains("none"));
        assert_eq!(lines[2], "    Alpha: present");
        assert_eq!(lines[3], "    Content: none");
    }

    #[test]
    fn process_events() {
        let started = ProcessEvent::Started {
            operation: Operation::RemoveBg,
            total: 3,
        };
        assert_eq!(format_process_event(&started), vec!["remove-bg (3 images)"]);

        let done = ProcessEvent::FileProcessed {
            index: 2,
            source: "in/a.jpg".to_string(),
            output: "out/a-remove-bg.png".to_string(),
            width: 8,
            height: 6,
        };
        assert_eq!(
            format_process_event(&done),
            vec!["    002 in/a.jpg → out/a-remove-bg.png (8x6)"]
        );

        let failed = ProcessEvent::FileFailed {
            index: 3,
            source: "in/b.jpg".to_string(),
            error: "bad".to_string(),
        };
        assert_eq!(format_process_event(&failed), vec!["    003 in/b.jpg FAILED: bad"]);

        let skipped = ProcessEvent::FileSkipped {
            source: "in/c.txt".to_string(),
        };
        assert_eq!(format_process_event(&skipped), vec!["    skipped in/c.txt"]);
    }

    #[test]
    fn summary_line() {
        let summary = BatchSummary {
            processed: 2,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(format_summary(&summary), "Processed 2, skipped 1, failed 0");
    }

    #[test]
    fn written_line() {
        assert_eq!(format_written("x.png", 3, 4), "Wrote x.png (3x4)");
    }
}

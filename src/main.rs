use clap::{Parser, Subcommand};
use rastermatte::codec::{ImageRasterizer, Rasterizer};
use rastermatte::config::{self, EditConfig};
use rastermatte::process::{self, Operation};
use rastermatte::raster::{self, LumaWeights, Rect, RemovalStrategy, Rgb, Strength};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rastermatte")]
#[command(about = "Background removal, recolor, auto-crop and JPEG cleanup for raster images")]
#[command(long_about = "\
Background removal, recolor, auto-crop and JPEG cleanup for raster images

Every command reads one image (JPEG, PNG, TIFF, WebP) and writes a PNG.
Without --output the result is written next to the input as
<stem>-<command>.png.

The background color is taken from [background].color in the config if set,
otherwise estimated from a histogram of the image border.

Examples:

  rastermatte detect scan.jpg
  rastermatte remove-bg product.jpg --strategy flood-fill
  rastermatte recolor logo.png --to '#1e1e1e'
  rastermatte autocrop page.png --roi 0,0,800,600
  rastermatte batch remove-bg photos/ out/

Run 'rastermatte gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); merged over the stock defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Input file plus optional output path.
#[derive(clap::Args, Clone)]
struct FileArgs {
    /// Source image
    input: PathBuf,

    /// Output PNG (default: <stem>-<command>.png next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Report background color, alpha, content bounds and JPEG artifacts
    Detect {
        /// Source image
        input: PathBuf,
    },
    /// Make the background transparent
    RemoveBg {
        #[command(flatten)]
        file: FileArgs,
        /// deblend (soft alpha) or flood-fill (border-connected cut-out)
        #[arg(long)]
        strategy: Option<Strategy>,
        /// Composite the result over this color instead of leaving alpha
        #[arg(long)]
        fill: Option<String>,
    },
    /// Replace the background color
    Recolor {
        #[command(flatten)]
        file: FileArgs,
        /// New background color (#rrggbb)
        #[arg(long)]
        to: Option<String>,
        /// Hard replacement of border-connected background, no halo
        #[arg(long)]
        hard: bool,
    },
    /// Crop to the non-background content
    Autocrop {
        #[command(flatten)]
        file: FileArgs,
        /// Only search inside x,y,w,h
        #[arg(long, value_parser = parse_rect)]
        roi: Option<Rect>,
        /// Report the bounds without writing a file
        #[arg(long)]
        dry_run: bool,
    },
    /// Desaturate
    Grayscale {
        #[command(flatten)]
        file: FileArgs,
        /// 0 = untouched, 1 = fully gray
        #[arg(long)]
        strength: Option<f64>,
        /// Use BT.709 luma weights instead of BT.601
        #[arg(long)]
        bt709: bool,
    },
    /// Write an overlay PNG marking suspected JPEG ringing
    JpegHighlight {
        #[command(flatten)]
        file: FileArgs,
        /// Overlay color (#rrggbb)
        #[arg(long)]
        color: Option<String>,
    },
    /// Suppress JPEG ringing
    JpegRepair {
        #[command(flatten)]
        file: FileArgs,
    },
    /// Apply one operation to every image under a directory
    Batch {
        /// Operation to apply
        operation: Operation,
        /// Input directory (searched recursively)
        input_dir: PathBuf,
        /// Output directory (layout mirrors the input)
        output_dir: PathBuf,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Strategy {
    Deblend,
    FloodFill,
}

impl From<Strategy> for RemovalStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Deblend => RemovalStrategy::Deblend,
            Strategy::FloodFill => RemovalStrategy::FloodFill,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = config::load_config(cli.config.as_deref())?;
    let rasterizer = ImageRasterizer::new();

    match cli.command {
        Command::Detect { input } => {
            let buf = rasterizer.rasterize(&input)?;
            let report = process::detect(&input.display().to_string(), &buf, &config);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                rastermatte::output::print_detect_report(&report);
            }
        }
        Command::RemoveBg {
            file,
            strategy,
            fill,
        } => {
            if let Some(s) = strategy {
                config.background.strategy = s.into();
            }
            let buf = rasterizer.rasterize(&file.input)?;
            let bg = process::reference_background(&buf, &config);
            let mut result = Operation::RemoveBg.apply(&buf, &config);
            if let Some(hex) = fill {
                result = result.composite_over(Rgb::from_hex(&hex));
            }
            print_background(bg, cli.json);
            write_result(&rasterizer, &result, &file, Operation::RemoveBg, cli.json)?;
        }
        Command::Recolor { file, to, hard } => {
            if let Some(hex) = to {
                config.recolor.target = Rgb::from_hex(&hex);
            }
            if hard {
                config.recolor.feather = false;
            }
            let buf = rasterizer.rasterize(&file.input)?;
            let bg = process::reference_background(&buf, &config);
            let result = process::recolor(&buf, bg, &config);
            print_background(bg, cli.json);
            write_result(&rasterizer, &result, &file, Operation::Recolor, cli.json)?;
        }
        Command::Autocrop { file, roi, dry_run } => {
            let buf = rasterizer.rasterize(&file.input)?;
            let bg = process::reference_background(&buf, &config);
            let bounds = raster::content_bounds(&buf, roi, bg, &config.crop);
            let written = if dry_run {
                None
            } else {
                let result = match bounds {
                    Some(rect) => buf.crop(rect),
                    None => buf,
                };
                let output = output_path(&file, Operation::Autocrop);
                rasterizer.encode_png(&result, &output)?;
                Some((output, result.width(), result.height()))
            };
            if cli.json {
                let written = written.as_ref().map(|(p, w, h)| (p.as_path(), *w, *h));
                println!("{}", serde_json::to_string(&autocrop_json(bounds, written))?);
            } else {
                println!("{}", rastermatte::output::format_bounds(bounds));
                if let Some((output, width, height)) = &written {
                    print_written(output, *width, *height, false)?;
                }
            }
        }
        Command::Grayscale {
            file,
            strength,
            bt709,
        } => {
            if let Some(s) = strength {
                config.grayscale.strength = Strength::new(s);
            }
            if bt709 {
                config.grayscale.weights = LumaWeights::Bt709;
            }
            run_file_op(&rasterizer, Operation::Grayscale, &file, &config, cli.json)?;
        }
        Command::JpegHighlight { file, color } => {
            if let Some(hex) = color {
                config.jpeg.highlight_color = Rgb::from_hex(&hex);
            }
            run_file_op(&rasterizer, Operation::JpegHighlight, &file, &config, cli.json)?;
        }
        Command::JpegRepair { file } => {
            run_file_op(&rasterizer, Operation::JpegRepair, &file, &config, cli.json)?;
        }
        Command::Batch {
            operation,
            input_dir,
            output_dir,
        } => {
            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let json = cli.json;
            let printer = std::thread::spawn(move || {
                for event in rx {
                    if json {
                        continue;
                    }
                    for line in rastermatte::output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = process::process_dir(
                &rasterizer,
                operation,
                &input_dir,
                &output_dir,
                &config,
                Some(tx),
            )?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                rastermatte::output::print_summary(&summary);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Filter used when `RUST_LOG` is unset.
fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn output_path(file: &FileArgs, op: Operation) -> PathBuf {
    file.output.clone().unwrap_or_else(|| {
        let dir = file.input.parent().unwrap_or(Path::new(""));
        process::output_path_for(&file.input, dir, op)
    })
}

fn run_file_op(
    rasterizer: &dyn Rasterizer,
    op: Operation,
    file: &FileArgs,
    config: &EditConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output_path(file, op);
    let (width, height) = process::process_file(rasterizer, op, &file.input, &output, config)?;
    print_written(&output, width, height, json)
}

fn write_result(
    rasterizer: &dyn Rasterizer,
    result: &raster::PixelBuffer,
    file: &FileArgs,
    op: Operation,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output_path(file, op);
    rasterizer.encode_png(result, &output)?;
    print_written(&output, result.width(), result.height(), json)
}

fn print_written(
    output: &Path,
    width: u32,
    height: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let value = serde_json::json!({
            "output": output.display().to_string(),
            "width": width,
            "height": height,
        });
        println!("{}", serde_json::to_string(&value)?);
    } else {
        println!(
            "{}",
            rastermatte::output::format_written(&output.display().to_string(), width, height)
        );
    }
    Ok(())
}

/// Single JSON document for `autocrop`: the bounds, plus the written file
/// unless it was a dry run.
fn autocrop_json(bounds: Option<Rect>, written: Option<(&Path, u32, u32)>) -> serde_json::Value {
    let mut value = serde_json::json!({ "bounds": bounds });
    if let Some((output, width, height)) = written {
        value["output"] = output.display().to_string().into();
        value["width"] = width.into();
        value["height"] = height.into();
    }
    value
}

fn print_background(bg: Rgb, json: bool) {
    if !json {
        println!("{}", rastermatte::output::format_background(Some(bg)));
    }
}

/// Parse `x,y,w,h`.
fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;
    match parts[..] {
        [x, y, w, h] => Ok(Rect::new(x, y, w, h)),
        _ => Err(format!("expected x,y,w,h, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_log_level() {
        assert_eq!(default_log_level(0), "warn");
        assert_eq!(default_log_level(1), "info");
        assert_eq!(default_log_level(2), "debug");
        assert_eq!(default_log_level(5), "debug");
    }

    #[test]
    fn autocrop_json_is_one_object() {
        let value = autocrop_json(
            Some(Rect::new(39, 39, 22, 22)),
            Some((Path::new("out/page-autocrop.png"), 22, 22)),
        );
        assert_eq!(value["bounds"]["x"], 39);
        assert_eq!(value["bounds"]["w"], 22);
        assert_eq!(value["output"], "out/page-autocrop.png");
        assert_eq!(value["width"], 22);
        assert_eq!(value["height"], 22);
    }

    #[test]
    fn autocrop_json_dry_run_has_only_bounds() {
        let value = autocrop_json(None, None);
        assert!(value["bounds"].is_null());
        assert_eq!(value.as_object().map(|o| o.len()), Some(1));
    }

    #[test]
    fn parse_rect_accepts_four_numbers() {
        assert_eq!(parse_rect("1, 2,3,4"), Ok(Rect::new(1, 2, 3, 4)));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
    }
}

//! CLI binary for uniconvert.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ConversionRequest` and a `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uniconvert::{
    convert, plan, ConversionConfig, ConversionFamily, ConversionReport, ConversionRequest,
    PageSize, ResolvedPlan,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const BANNER: &str = r#"
     _____                            _
    /  __ \                          | |
    | /  \/ ___  _ __   ___ _ __ __ _| |_
    | |    / _ \| '_ \ / _ \ '__/ _` | __|
    | \__/\ (_) | | | |  __/ | | (_| | |_
     \____/\___/|_| |_|\___|_|  \__,_|\__|

    Universal File Converter
"#;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown to PDF
  convert -f input.md -t pdf
  convert -f input.md -t pdf -o output.pdf
  convert -f input.md -o output.pdf

  # Image format conversion
  convert -f image.png -t jpg
  convert -f image.png -t jpg -o new_image.jpg
  convert -f image.png -o new_image.jpg
  convert -f logo.svg -t png -o logo.png

  # Show what would happen, as JSON
  convert -f logo.svg -o logo.webp --dry-run --json

SUPPORTED CONVERSIONS:
  Input                          Targets
  ─────────────────────────────  ──────────────────────
  .md .markdown                  pdf
  .png .jpg .jpeg .webp .svg     png, jpg, jpeg, webp

TARGET RESOLUTION:
  1. -t wins when given (case-insensitive).
  2. Otherwise the extension of -o is used.
  3. Without -o the output is the input path with the target extension.

ENVIRONMENT VARIABLES:
  CONVERT_PAGE_SIZE      PDF page size (a4, letter)
  CONVERT_MARGIN         PDF page margin in points
  CONVERT_FONT_SIZE      PDF body font size in points
  CONVERT_FONT           TrueType font for non-ASCII PDF text
  CONVERT_JPEG_QUALITY   JPEG quality (1-100)
  CONVERT_SVG_SCALE      SVG rasterisation zoom
  RUST_LOG               Log filter, e.g. uniconvert=debug
"#;

/// Convert Markdown to PDF and images between PNG, JPEG, WebP and SVG.
#[derive(Parser, Debug)]
#[command(
    name = "convert",
    version,
    about = "Universal file converter: Markdown to PDF and image format conversions",
    long_about = "Universal file converter supporting Markdown to PDF and image format \
conversions. The input extension picks the conversion; the target comes from -t or from \
the extension of -o.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the input file.
    #[arg(short, long)]
    file: PathBuf,

    /// Target format (pdf for Markdown; png, jpg, jpeg, webp for images).
    #[arg(short, long)]
    target: Option<String>,

    /// Path to the output file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resolve and print the plan without converting.
    #[arg(long)]
    dry_run: bool,

    /// Print the plan or report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Do not print the banner.
    #[arg(long)]
    no_banner: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// PDF page size: a4 or letter.
    #[arg(long, env = "CONVERT_PAGE_SIZE", default_value = "a4")]
    page_size: PageSize,

    /// PDF page margin in points (0–144).
    #[arg(long, env = "CONVERT_MARGIN", default_value_t = 40.0)]
    margin: f32,

    /// PDF body font size in points (6–32).
    #[arg(long, env = "CONVERT_FONT_SIZE", default_value_t = 11.0)]
    font_size: f32,

    /// JPEG quality (1–100).
    #[arg(long, env = "CONVERT_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Zoom applied when rasterising SVG (0.1–16).
    #[arg(long, env = "CONVERT_SVG_SCALE", default_value_t = 1.0)]
    svg_scale: f32,

    /// PDF document title (default: first heading, else file name).
    #[arg(long)]
    title: Option<String>,

    /// TrueType font for PDF text outside ASCII (searched before system fonts).
    #[arg(long, env = "CONVERT_FONT", value_name = "PATH")]
    font: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Keep library INFO logs out of the way while the spinner is drawn.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.dry_run;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if !cli.no_banner && !cli.quiet && !cli.json {
        eprintln!("{}", cyan(BANNER));
    }

    let request = ConversionRequest::new(&cli.file).with_options(cli.target.clone(), cli.output.clone());

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let plan = plan(&request)?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Failed to serialise plan")?
            );
        } else if !cli.quiet {
            print_plan(&plan);
        }
        return Ok(());
    }

    let config = build_config(&cli)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(cli.file.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = convert(&request, &config);
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let report = result?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_success(&report);
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .page_size(cli.page_size)
        .margin_pt(cli.margin)
        .font_size(cli.font_size)
        .jpeg_quality(cli.jpeg_quality)
        .svg_scale(cli.svg_scale);

    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(ref font) = cli.font {
        builder = builder.font_file(font.clone());
    }

    builder.build().context("Invalid configuration")
}

fn print_plan(plan: &ResolvedPlan) {
    println!("Family:  {}", plan.family());
    println!("Input:   {}", plan.input().display());
    println!("Target:  {}", plan.target());
    println!("Output:  {}", plan.output().display());
}

fn print_success(report: &ConversionReport) {
    let plan = &report.plan;
    match plan.family() {
        ConversionFamily::Markdown => println!(
            "{} Successfully created PDF at: {}",
            green("✔"),
            plan.output().display()
        ),
        ConversionFamily::Image => println!(
            "{} Successfully converted {} to {}",
            green("✔"),
            plan.input().display(),
            plan.output().display()
        ),
    }
    eprintln!(
        "   {}",
        dim(&format!("{} bytes in {}ms", report.bytes_written, report.duration_ms))
    );
}

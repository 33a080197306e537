//! # uniconvert
//!
//! Convert Markdown documents to PDF and images between PNG, JPEG, WebP and
//! SVG, deciding *what* to do from file extensions and an optional target.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ConversionRequest { input, -t?, -o? }
//!  │
//!  ├─ 1. Detect   input extension → Markdown | Image family
//!  ├─ 2. Target   explicit -t wins, else output extension, else error
//!  ├─ 3. Output   explicit -o, else input path with the target extension
//!  └─ 4. Dispatch exactly one backend:
//!                  markdown → PDF renderer (pulldown-cmark + pdf-writer)
//!                  svg      → rasterizer   (resvg)
//!                  raster   → codec        (image)
//! ```
//!
//! Steps 1–3 are pure and available on their own through [`plan`], which is
//! what `convert --dry-run` prints.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uniconvert::{convert, ConversionConfig, ConversionRequest};
//!
//! fn main() -> Result<(), uniconvert::ConvertError> {
//!     let request = ConversionRequest::new("icon.svg").with_output("icon.jpg");
//!     let report = convert(&request, &ConversionConfig::default())?;
//!     eprintln!("{} → {} ({} bytes)",
//!         report.plan.input().display(),
//!         report.plan.output().display(),
//!         report.bytes_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `convert` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! uniconvert = { version = "0.1", default-features = false }
//! ```
//!
//! ## Supported Conversions
//!
//! | Input | Targets |
//! |-------|---------|
//! | `.md`, `.markdown` | `pdf` |
//! | `.png`, `.jpg`, `.jpeg`, `.webp`, `.svg` | `png`, `jpg`, `jpeg`, `webp` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod registry;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{BackendError, ImageCodecConverter, MarkdownToPdfRenderer, SvgRasterizer};
pub use config::{ConversionConfig, ConversionConfigBuilder, PageSize};
pub use convert::{convert, convert_with, plan, render_markdown_text};
pub use error::{ConvertError, Stage};
pub use pipeline::dispatch::Backends;
pub use plan::{ConversionReport, ConversionRequest, ResolvedPlan};
pub use registry::{ConversionFamily, FormatSpec, TargetFormat};

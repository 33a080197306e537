//! Top-level conversion entry points.
//!
//! [`plan`] is the pure decision half: it checks the input, detects the
//! family, resolves the target and output path, and returns a
//! [`ResolvedPlan`] without touching any backend. [`convert`] and
//! [`convert_with`] run the plan through the backends and report what was
//! written. [`render_markdown_text`] skips planning entirely for callers that
//! already hold Markdown in memory.

use crate::backend::{MarkdownPdf, MarkdownToPdfRenderer};
use crate::config::ConversionConfig;
use crate::error::{ConvertError, Stage};
use crate::pipeline::dispatch::{dispatch, Backends};
use crate::pipeline::{detect, output_path, target};
use crate::plan::{ConversionReport, ConversionRequest, ResolvedPlan};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Resolve `request` into a [`ResolvedPlan`].
///
/// Checks run in a fixed order and the first failure wins:
/// existence → family → target → output path.
///
/// The output may name the input itself (`photo.png -t png`); the backends
/// decode the whole input before the atomic write replaces it.
///
/// # Errors
/// - [`ConvertError::InputNotFound`] if the input does not exist
/// - [`ConvertError::UnsupportedInputType`] if its extension is unknown
/// - target errors from [`target::resolve_target`]
///
/// # Example
/// ```rust,no_run
/// use uniconvert::{plan, ConversionRequest};
///
/// let request = ConversionRequest::new("logo.svg").with_target("png");
/// let plan = plan(&request)?;
/// assert_eq!(plan.output(), std::path::Path::new("logo.png"));
/// # Ok::<(), uniconvert::ConvertError>(())
/// ```
pub fn plan(request: &ConversionRequest) -> Result<ResolvedPlan, ConvertError> {
    let input = request.input();

    // ── Step 1: Input must exist ─────────────────────────────────────────
    if !input.exists() {
        return Err(ConvertError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    // ── Step 2: Family from input extension ──────────────────────────────
    let family = detect::detect_family(input).ok_or_else(|| ConvertError::UnsupportedInputType {
        path: input.to_path_buf(),
    })?;

    // ── Step 3: Target format ────────────────────────────────────────────
    let target = target::resolve_target(family, request.explicit_target(), request.output())?;

    // ── Step 4: Output path ──────────────────────────────────────────────
    let output = match request.output() {
        Some(path) => path.to_path_buf(),
        None => output_path::default_output_path(input, family, target),
    };

    let plan = ResolvedPlan::new(family, input.to_path_buf(), target, output);
    info!(
        "Plan: {} '{}' → {} '{}'",
        plan.family(),
        plan.input().display(),
        plan.target(),
        plan.output().display()
    );
    Ok(plan)
}

/// Plan and run a conversion with the built-in backends.
///
/// # Example
/// ```rust,no_run
/// use uniconvert::{convert, ConversionConfig, ConversionRequest};
///
/// let report = convert(&ConversionRequest::new("report.md"), &ConversionConfig::default())?;
/// println!("wrote {} bytes to {}", report.bytes_written, report.plan.output().display());
/// # Ok::<(), uniconvert::ConvertError>(())
/// ```
pub fn convert(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionReport, ConvertError> {
    convert_with(request, &Backends::from_config(config))
}

/// Plan and run a conversion with caller-supplied backends.
///
/// Exactly one backend is invoked per successful plan; none is invoked when
/// planning fails.
pub fn convert_with(
    request: &ConversionRequest,
    backends: &Backends,
) -> Result<ConversionReport, ConvertError> {
    let start = Instant::now();
    let plan = plan(request)?;

    dispatch(&plan, backends)?;

    let bytes_written = output_size(plan.output())?;
    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} bytes in {}ms",
        bytes_written, duration_ms
    );

    Ok(ConversionReport {
        plan,
        bytes_written,
        duration_ms,
    })
}

/// Render Markdown held in memory to a PDF at `output`.
///
/// Uses the same renderer and style sheet as file conversion. Returns the
/// size of the written file.
pub fn render_markdown_text(
    markdown: &str,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<u64, ConvertError> {
    let output = output.as_ref();
    debug!("Rendering {} bytes of Markdown text", markdown.len());

    MarkdownPdf::new(config)
        .render(markdown, output)
        .map_err(|e| ConvertError::Conversion {
            stage: Stage::PdfRender,
            detail: e.to_string(),
        })?;

    output_size(output)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn output_size(path: &Path) -> Result<u64, ConvertError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

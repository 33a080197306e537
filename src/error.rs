//! Error types for the uniconvert library.
//!
//! Two error types reflect two layers of the conversion:
//!
//! * [`ConvertError`]: what the caller sees. Every failure of a single
//!   invocation, from "the input does not exist" to "the JPEG encoder
//!   rejected the image", ends up here and is reported to the user verbatim.
//!
//! * [`crate::backend::BackendError`]: what a backend returns. The
//!   dispatcher wraps it into [`ConvertError::Conversion`] together with the
//!   [`Stage`] that failed, so messages name the step that broke.
//!
//! Nothing is retried or silently recovered: any error is terminal for the
//! invocation.

use crate::registry::ConversionFamily;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// All errors returned by the uniconvert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File {} does not exist", path.display())]
    InputNotFound { path: PathBuf },

    /// The input extension matches no conversion family.
    #[error(
        "Unsupported file type '{}'. Supported formats: {}",
        path.display(),
        crate::registry::supported_input_list()
    )]
    UnsupportedInputType { path: PathBuf },

    /// The input exists but could not be read as UTF-8 text.
    #[error("Failed to read '{}': {source}", path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Target resolution errors ──────────────────────────────────────────
    /// An explicit `-t` value is not valid for the detected family.
    #[error("Unsupported target format for {family}: {target}. Supported formats: {allowed}")]
    UnsupportedTargetFormat {
        family: ConversionFamily,
        target: String,
        allowed: String,
    },

    /// No explicit target and nothing usable in the output path.
    #[error("{}", undetectable_message(.output.as_deref()))]
    TargetUndetectable { output: Option<PathBuf> },

    /// The target inferred from the output path is not valid for the family.
    #[error("Cannot convert {family} to {target}. Supported formats: {allowed}")]
    TargetFamilyMismatch {
        family: ConversionFamily,
        target: String,
        allowed: String,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// A backend failed; `detail` carries the underlying error text.
    #[error("Error in {stage}: {detail}")]
    Conversion { stage: Stage, detail: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{}': {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn undetectable_message(output: Option<&Path>) -> String {
    match output {
        Some(path) => format!(
            "Could not detect target format from output file: {}",
            path.display()
        ),
        None => "Please specify target format using -t option or provide output file with -o option"
            .to_string(),
    }
}

/// The conversion step a [`ConvertError::Conversion`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Stage {
    #[serde(rename = "pdf-render")]
    PdfRender,
    #[serde(rename = "image-convert")]
    ImageConvert,
    #[serde(rename = "svg-convert")]
    SvgConvert,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PdfRender => "pdf-render",
            Stage::ImageConvert => "image-convert",
            Stage::SvgConvert => "svg-convert",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Configuration for the default backends.
//!
//! [`ConversionConfig`] only tunes *how* bytes are produced: page geometry and
//! type size for PDFs, JPEG quality, SVG zoom. It never influences *what*
//! conversion happens; that is decided from the request alone by
//! [`crate::pipeline`].
//!
//! Built via [`ConversionConfig::builder()`] so callers set only the knobs
//! they care about and keep the documented defaults for the rest.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Backend configuration.
///
/// # Example
/// ```rust
/// use uniconvert::{ConversionConfig, PageSize};
///
/// let config = ConversionConfig::builder()
///     .page_size(PageSize::Letter)
///     .jpeg_quality(80)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 80);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// PDF page size. Default: A4.
    pub page_size: PageSize,

    /// Page margin in points on all four sides. Range: 0–144. Default: 40.
    pub margin_pt: f32,

    /// Body text size in points. Range: 6–32. Default: 11.
    ///
    /// Headings and code are sized relative to this.
    pub font_size: f32,

    /// JPEG quality. Range: 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Zoom applied when rasterising SVG. Range: 0.1–16. Default: 1.0
    /// (one output pixel per SVG user unit).
    pub svg_scale: f32,

    /// PDF document title. If None, the first heading is used, then the
    /// input file stem.
    pub title: Option<String>,

    /// TrueType font tried first for PDF text outside ASCII. Installed
    /// system fonts are searched after it. Default: None.
    pub font_file: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            margin_pt: 40.0,
            font_size: 11.0,
            jpeg_quality: 90,
            svg_scale: 1.0,
            title: None,
            font_file: None,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn margin_pt(mut self, margin: f32) -> Self {
        self.config.margin_pt = margin.clamp(0.0, 144.0);
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.config.font_size = size.clamp(6.0, 32.0);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn svg_scale(mut self, scale: f32) -> Self {
        self.config.svg_scale = scale.clamp(0.1, 16.0);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_file = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        // Clamping does not catch NaN.
        if !c.margin_pt.is_finite() || !c.font_size.is_finite() || !c.svg_scale.is_finite() {
            return Err(ConvertError::InvalidConfig(
                "margin, font size and SVG scale must be finite numbers".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Physical page size for PDF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// 210 × 297 mm (default).
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PageSize {
    /// Width and height in PDF points (1/72 in).
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PageSize::A4 => "a4",
            PageSize::Letter => "letter",
        })
    }
}

impl FromStr for PageSize {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" | "us-letter" => Ok(PageSize::Letter),
            other => Err(ConvertError::InvalidConfig(format!(
                "unknown page size '{other}' (expected a4 or letter)"
            ))),
        }
    }
}

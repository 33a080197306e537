//! Static knowledge of supported formats, per conversion family.
//!
//! Every question of the form "is `.markdown` an input we accept?" or "may an
//! image be converted to `pdf`?" is answered from the single [`FORMATS`]
//! table. Adding a format means adding one row (plus the encoder mapping in
//! the backend that actually writes it).

use serde::Serialize;
use std::fmt;

/// Category of conversion, decided solely by the input file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionFamily {
    /// Markdown text rendered to a styled PDF.
    Markdown,
    /// Raster or vector image re-encoded to another raster format.
    Image,
}

impl ConversionFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionFamily::Markdown => "markdown",
            ConversionFamily::Image => "image",
        }
    }

    /// The registry row describing this family.
    pub fn spec(self) -> &'static FormatSpec {
        match self {
            ConversionFamily::Markdown => &FORMATS[0],
            ConversionFamily::Image => &FORMATS[1],
        }
    }
}

impl fmt::Display for ConversionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The byte-level encoding a target token maps to.
///
/// `jpg` and `jpeg` are two tokens for the same [`Encoding::Jpeg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Pdf,
    Png,
    Jpeg,
    WebP,
}

/// A valid target: the canonical lowercase token plus its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TargetFormat {
    pub token: &'static str,
    pub encoding: Encoding,
}

impl TargetFormat {
    pub const PDF: TargetFormat = TargetFormat::new("pdf", Encoding::Pdf);
    pub const PNG: TargetFormat = TargetFormat::new("png", Encoding::Png);
    pub const JPG: TargetFormat = TargetFormat::new("jpg", Encoding::Jpeg);
    pub const JPEG: TargetFormat = TargetFormat::new("jpeg", Encoding::Jpeg);
    pub const WEBP: TargetFormat = TargetFormat::new("webp", Encoding::WebP);

    const fn new(token: &'static str, encoding: Encoding) -> Self {
        Self { token, encoding }
    }

    pub fn as_str(&self) -> &'static str {
        self.token
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token)
    }
}

/// One registry row: what a family accepts and what it can produce.
#[derive(Debug)]
pub struct FormatSpec {
    pub family: ConversionFamily,
    /// Lowercase input extensions, without the leading dot.
    pub input_extensions: &'static [&'static str],
    pub targets: &'static [TargetFormat],
}

impl FormatSpec {
    /// Look up a target token (case-insensitive) valid for this family.
    pub fn target(&self, token: &str) -> Option<TargetFormat> {
        self.targets
            .iter()
            .copied()
            .find(|t| t.token.eq_ignore_ascii_case(token))
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.input_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Human-readable list of targets, e.g. `png, jpg, jpeg, webp`.
    pub fn allowed_targets(&self) -> String {
        self.targets
            .iter()
            .map(|t| t.token)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The registry. Order matters only for [`supported_input_list`].
pub static FORMATS: [FormatSpec; 2] = [
    FormatSpec {
        family: ConversionFamily::Markdown,
        input_extensions: &["md", "markdown"],
        targets: &[TargetFormat::PDF],
    },
    FormatSpec {
        family: ConversionFamily::Image,
        input_extensions: &["png", "jpg", "jpeg", "webp", "svg"],
        targets: &[
            TargetFormat::PNG,
            TargetFormat::JPG,
            TargetFormat::JPEG,
            TargetFormat::WEBP,
        ],
    },
];

/// Vector input routed to the SVG rasterizer instead of the raster codec.
pub const SVG_EXTENSION: &str = "svg";

/// Family whose input extensions contain `ext` (case-insensitive).
pub fn family_for_extension(ext: &str) -> Option<ConversionFamily> {
    FORMATS
        .iter()
        .find(|spec| spec.accepts_extension(ext))
        .map(|spec| spec.family)
}

/// Target named by an output-file extension, regardless of family.
///
/// Any token some family can produce is recognised here; whether the
/// detected family may actually produce it is checked separately.
pub fn target_for_extension(ext: &str) -> Option<TargetFormat> {
    FORMATS.iter().find_map(|spec| spec.target(ext))
}

/// `.md, .markdown, .png, …`, used in error messages and `--help`.
pub fn supported_input_list() -> String {
    FORMATS
        .iter()
        .flat_map(|spec| spec.input_extensions.iter())
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_rows_match_families() {
        assert_eq!(ConversionFamily::Markdown.spec().family, ConversionFamily::Markdown);
        assert_eq!(ConversionFamily::Image.spec().family, ConversionFamily::Image);
    }

    #[test]
    fn target_lookup_is_case_insensitive() {
        let image = ConversionFamily::Image.spec();
        assert_eq!(image.target("WEBP"), Some(TargetFormat::WEBP));
        assert_eq!(image.target("Jpeg"), Some(TargetFormat::JPEG));
        assert_eq!(image.target("pdf"), None);
        assert_eq!(ConversionFamily::Markdown.spec().target("PDF"), Some(TargetFormat::PDF));
    }

    #[test]
    fn jpg_and_jpeg_share_encoding() {
        assert_eq!(TargetFormat::JPG.encoding, TargetFormat::JPEG.encoding);
        assert_ne!(TargetFormat::JPG.token, TargetFormat::JPEG.token);
    }

    #[test]
    fn svg_is_input_only() {
        assert_eq!(family_for_extension("svg"), Some(ConversionFamily::Image));
        assert_eq!(target_for_extension("svg"), None);
    }

    #[test]
    fn output_extensions_cover_all_targets() {
        for token in ["pdf", "png", "jpg", "jpeg", "webp"] {
            assert!(target_for_extension(token).is_some(), "{token}");
        }
        assert!(target_for_extension("gif").is_none());
    }

    #[test]
    fn supported_list_is_dotted() {
        assert_eq!(
            supported_input_list(),
            ".md, .markdown, .png, .jpg, .jpeg, .webp, .svg"
        );
    }

    #[test]
    fn allowed_targets_for_image() {
        assert_eq!(
            ConversionFamily::Image.spec().allowed_targets(),
            "png, jpg, jpeg, webp"
        );
    }
}

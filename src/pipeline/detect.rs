//! Conversion-type detection: input extension → [`ConversionFamily`].

use crate::registry::{self, ConversionFamily};
use std::path::Path;
use tracing::debug;

/// Lowercase extension of `path` without the dot, if it has one.
///
/// Dot-files such as `.md` have no extension, matching how `Path` treats
/// them.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Detect the conversion family of `input` from its extension.
///
/// Returns `None` when the path has no extension or the extension belongs to
/// no family. Side-effect free: the file is never opened.
pub fn detect_family(input: &Path) -> Option<ConversionFamily> {
    let ext = extension_of(input)?;
    let family = registry::family_for_extension(&ext);
    debug!("Detected family {:?} for '{}'", family, input.display());
    family
}

/// True when `input` is an SVG document and needs the rasterizer.
pub fn is_svg(input: &Path) -> bool {
    extension_of(input).as_deref() == Some(registry::SVG_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_extensions() {
        for name in ["doc.md", "doc.markdown", "DOC.MD", "notes.MarkDown"] {
            assert_eq!(
                detect_family(Path::new(name)),
                Some(ConversionFamily::Markdown),
                "{name}"
            );
        }
    }

    #[test]
    fn image_extensions() {
        for name in ["a.png", "a.JPG", "a.jpeg", "a.WebP", "dir/logo.svg"] {
            assert_eq!(
                detect_family(Path::new(name)),
                Some(ConversionFamily::Image),
                "{name}"
            );
        }
    }

    #[test]
    fn unknown_or_missing_extension() {
        for name in ["README", "a.txt", "a.pdf", "archive.md.gz", ".md", "a."] {
            assert_eq!(detect_family(Path::new(name)), None, "{name}");
        }
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of(Path::new("Photo.JPEG")).as_deref(), Some("jpeg"));
        assert_eq!(extension_of(Path::new("noext")), None);
    }

    #[test]
    fn svg_detection_ignores_case() {
        assert!(is_svg(Path::new("icon.SVG")));
        assert!(!is_svg(Path::new("icon.png")));
    }
}

//! Backends: the collaborators that turn a resolved plan into bytes.
//!
//! The decision logic in [`crate::pipeline`] only ever talks to the three
//! traits below, which keeps it testable with stub backends and lets callers
//! swap a renderer without touching resolution.
//!
//! ```text
//!  markdown ──▶ MarkdownToPdfRenderer  (pulldown-cmark → layout → pdf-writer)
//!  png/jpg/webp ──▶ ImageCodecConverter (image)
//!  svg ──▶ SvgRasterizer               (resvg, + re-encode via intermediate PNG)
//! ```
//!
//! All default backends encode into memory and hand the bytes to
//! [`write_output`], which writes atomically: a failed conversion never leaves
//! a half-written output file behind.

mod fonts;
mod layout;
pub mod markdown;
mod pdf;
pub mod raster;
pub mod svg;

use crate::registry::{Encoding, TargetFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub use markdown::MarkdownPdf;
pub use raster::ImageCodec;
pub use svg::SvgRenderer;

/// Renders Markdown text to a PDF file.
pub trait MarkdownToPdfRenderer {
    fn render(&self, markdown: &str, output: &Path) -> Result<(), BackendError>;
}

/// Re-encodes a raster image file into another raster format.
pub trait ImageCodecConverter {
    fn convert(&self, input: &Path, output: &Path, target: TargetFormat) -> Result<(), BackendError>;
}

/// Rasterizes an SVG document into a raster format.
pub trait SvgRasterizer {
    fn rasterize(&self, input: &Path, output: &Path, target: TargetFormat)
        -> Result<(), BackendError>;
}

/// Failure inside a backend. The dispatcher attaches the stage.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("invalid SVG: {0}")]
    Svg(#[from] resvg::usvg::Error),

    /// Rasterisation or layout could not produce output.
    #[error("{0}")]
    Render(String),

    /// The backend was handed a target it cannot encode.
    #[error("'{0}' is not supported by this backend")]
    UnsupportedTarget(&'static str),
}

/// Write `bytes` to `path` atomically, creating parent directories.
///
/// The data goes to a temporary file in the destination directory which is
/// then renamed over `path`; on error the temporary file is removed when it
/// is dropped.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".uniconvert-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} bytes → {}", bytes.len(), path.display());
    Ok(())
}

/// Directory a file at `path` lives in; `.` for bare file names.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Composite `img` onto an opaque white background.
///
/// JPEG has no alpha channel, so any partially or fully transparent pixel is
/// blended with white before encoding. Opaque images are converted as-is.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }
    out
}

/// Encode a decoded image as `target`.
///
/// `jpg` and `jpeg` share [`Encoding::Jpeg`] and produce identical bytes.
pub fn encode_raster(
    img: &DynamicImage,
    target: TargetFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    match target.encoding {
        Encoding::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
        Encoding::Jpeg => {
            let flat = flatten_onto_white(img);
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality).encode_image(&flat)?;
        }
        Encoding::WebP => {
            // The WebP encoder only takes 8-bit RGB(A).
            let eight_bit = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            eight_bit.write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)?;
        }
        Encoding::Pdf => return Err(BackendError::UnsupportedTarget(target.token)),
    }
    debug!(
        "Encoded {}x{} image as {} ({} bytes)",
        img.width(),
        img.height(),
        target,
        buf.len()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn half_transparent_red() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128])))
    }

    #[test]
    fn flatten_blends_with_white() {
        let flat = flatten_onto_white(&half_transparent_red());
        let px = flat.get_pixel(0, 0).0;
        assert_eq!(px[0], 255);
        assert!((126..=128).contains(&px[1]), "got {px:?}");
        assert_eq!(px[1], px[2]);
    }

    #[test]
    fn flatten_fully_transparent_is_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_onto_white(&img).get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn flatten_opaque_is_unchanged() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([10, 20, 30])));
        assert_eq!(flatten_onto_white(&img).get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn jpg_and_jpeg_encode_identically() {
        let img = half_transparent_red();
        let a = encode_raster(&img, TargetFormat::JPG, 90).unwrap();
        let b = encode_raster(&img, TargetFormat::JPEG, 90).unwrap();
        assert_eq!(a, b);
        assert_eq!(image::guess_format(&a).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn webp_and_png_are_decodable() {
        let img = half_transparent_red();
        for (target, format) in [
            (TargetFormat::WEBP, ImageFormat::WebP),
            (TargetFormat::PNG, ImageFormat::Png),
        ] {
            let bytes = encode_raster(&img, target, 90).unwrap();
            let decoded = image::load_from_memory_with_format(&bytes, format).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (4, 4));
        }
    }

    #[test]
    fn pdf_is_not_a_raster_target() {
        let err = encode_raster(&half_transparent_red(), TargetFormat::PDF, 90).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedTarget("pdf")));
    }

    #[test]
    fn write_output_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/deeper/out.bin");
        write_output(&out, b"hello").unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"hello");
        let names: Vec<_> = std::fs::read_dir(out.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.bin")]);
    }

    #[test]
    fn write_output_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, b"old contents that are longer").unwrap();
        write_output(&out, b"new").unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"new");
    }

    #[test]
    fn parent_dir_of_bare_name_is_cwd() {
        assert_eq!(parent_dir(Path::new("out.png")), Path::new("."));
        assert_eq!(parent_dir(Path::new("a/out.png")), Path::new("a"));
    }
}

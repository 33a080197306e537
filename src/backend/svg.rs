//! SVG rasterisation via resvg.
//!
//! PNG targets are written straight from the rendered pixmap. JPEG and WebP
//! go through two steps: the pixmap is saved as an intermediate PNG, which is
//! then decoded and re-encoded like any other raster input. The intermediate
//! lives in an [`IntermediateRaster`], a uniquely named temporary file beside
//! the output that is deleted when the guard drops, on success, error, or
//! panic alike. It can never collide with a real `name.png` the user owns.

use super::{encode_raster, parent_dir, write_output, BackendError, SvgRasterizer};
use crate::config::ConversionConfig;
use crate::registry::{Encoding, TargetFormat};
use resvg::{tiny_skia, usvg};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Default [`SvgRasterizer`].
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    scale: f32,
    jpeg_quality: u8,
}

impl SvgRenderer {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            scale: config.svg_scale,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Render the SVG at `input` to PNG bytes.
    fn render_png(&self, input: &Path) -> Result<Vec<u8>, BackendError> {
        let data = std::fs::read(input)?;

        let mut options = usvg::Options {
            resources_dir: input.parent().map(Path::to_path_buf),
            ..usvg::Options::default()
        };
        options.fontdb_mut().load_system_fonts();

        let tree = usvg::Tree::from_data(&data, &options)?;
        let size = tree.size();
        let pixels = size
            .to_int_size()
            .scale_by(self.scale)
            .ok_or_else(|| BackendError::Render(format!("cannot scale SVG by {}", self.scale)))?;

        let mut pixmap = tiny_skia::Pixmap::new(pixels.width(), pixels.height()).ok_or_else(|| {
            BackendError::Render(format!(
                "cannot allocate a {}x{} canvas",
                pixels.width(),
                pixels.height()
            ))
        })?;

        let transform = tiny_skia::Transform::from_scale(
            pixels.width() as f32 / size.width(),
            pixels.height() as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());
        debug!(
            "Rasterised '{}' → {}x{} px",
            input.display(),
            pixels.width(),
            pixels.height()
        );

        pixmap
            .encode_png()
            .map_err(|e| BackendError::Render(format!("PNG encoding failed: {e}")))
    }
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::new(&ConversionConfig::default())
    }
}

impl SvgRasterizer for SvgRenderer {
    fn rasterize(&self, input: &Path, output: &Path, target: TargetFormat) -> Result<(), BackendError> {
        let png = self.render_png(input)?;

        match target.encoding {
            Encoding::Png => write_output(output, &png),
            Encoding::Jpeg | Encoding::WebP => {
                let mut intermediate = IntermediateRaster::beside(output)?;
                intermediate.write_all(&png)?;
                let img = image::open(intermediate.path())?;
                let bytes = encode_raster(&img, target, self.jpeg_quality)?;
                write_output(output, &bytes)
            }
            Encoding::Pdf => Err(BackendError::UnsupportedTarget(target.token)),
        }
    }
}

/// Scoped intermediate PNG. The file is removed when this value drops.
pub(crate) struct IntermediateRaster {
    file: NamedTempFile,
}

impl IntermediateRaster {
    /// Create an empty, uniquely named `.png` in the output's directory.
    pub(crate) fn beside(output: &Path) -> std::io::Result<Self> {
        let dir = parent_dir(output);
        std::fs::create_dir_all(dir)?;
        let file = tempfile::Builder::new()
            .prefix(".uniconvert-raster-")
            .suffix(".png")
            .tempfile_in(dir)?;
        debug!("Intermediate raster at {}", file.path().display());
        Ok(Self { file })
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    pub(crate) fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()
    }
}

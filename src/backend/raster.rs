//! Default raster converter built on the `image` crate.

use super::{encode_raster, write_output, BackendError, ImageCodecConverter};
use crate::config::ConversionConfig;
use crate::registry::TargetFormat;
use image::ImageReader;
use std::path::Path;
use tracing::debug;

/// PNG/JPEG/WebP re-encoder.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    jpeg_quality: u8,
}

impl ImageCodec {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
        }
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new(&ConversionConfig::default())
    }
}

impl ImageCodecConverter for ImageCodec {
    fn convert(&self, input: &Path, output: &Path, target: TargetFormat) -> Result<(), BackendError> {
        // Sniff the header rather than trusting the extension: a mislabelled
        // `.jpg` that is really a PNG still decodes.
        let img = ImageReader::open(input)?.with_guessed_format()?.decode()?;
        debug!(
            "Decoded '{}' → {}x{} {:?}",
            input.display(),
            img.width(),
            img.height(),
            img.color()
        );

        let bytes = encode_raster(&img, target, self.jpeg_quality)?;
        write_output(output, &bytes)
    }
}

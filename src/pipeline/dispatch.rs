//! Route a resolved plan to the backend that produces its output.

use crate::backend::{
    BackendError, ImageCodec, ImageCodecConverter, MarkdownPdf, MarkdownToPdfRenderer,
    SvgRasterizer, SvgRenderer,
};
use crate::config::ConversionConfig;
use crate::error::{ConvertError, Stage};
use crate::pipeline::detect::is_svg;
use crate::plan::ResolvedPlan;
use crate::registry::ConversionFamily;
use tracing::{debug, error};

/// The three collaborators a plan can be dispatched to.
pub struct Backends {
    pub markdown: Box<dyn MarkdownToPdfRenderer>,
    pub raster: Box<dyn ImageCodecConverter>,
    pub svg: Box<dyn SvgRasterizer>,
}

impl Backends {
    /// The built-in backends, tuned by `config`.
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            markdown: Box::new(MarkdownPdf::new(config)),
            raster: Box::new(ImageCodec::new(config)),
            svg: Box::new(SvgRenderer::new(config)),
        }
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// Invoke exactly one backend for `plan`.
///
/// Markdown input is read as UTF-8 and rendered to PDF. Image input goes to
/// the SVG rasterizer when its extension is `svg`, otherwise to the raster
/// codec. Backend failures are tagged with the stage that ran.
pub fn dispatch(plan: &ResolvedPlan, backends: &Backends) -> Result<(), ConvertError> {
    let (stage, result) = match plan.family() {
        ConversionFamily::Markdown => {
            let markdown = std::fs::read_to_string(plan.input()).map_err(|source| {
                ConvertError::InputUnreadable {
                    path: plan.input().to_path_buf(),
                    source,
                }
            })?;
            debug!("Dispatching to Markdown renderer ({} bytes)", markdown.len());
            (
                Stage::PdfRender,
                backends.markdown.render(&markdown, plan.output()),
            )
        }
        ConversionFamily::Image if is_svg(plan.input()) => {
            debug!("Dispatching to SVG rasterizer");
            (
                Stage::SvgConvert,
                backends.svg.rasterize(plan.input(), plan.output(), plan.target()),
            )
        }
        ConversionFamily::Image => {
            debug!("Dispatching to image codec");
            (
                Stage::ImageConvert,
                backends.raster.convert(plan.input(), plan.output(), plan.target()),
            )
        }
    };

    result.map_err(|e: BackendError| {
        error!("{} failed for '{}': {}", stage, plan.input().display(), e);
        ConvertError::Conversion {
            stage,
            detail: e.to_string(),
        }
    })
}

//! Default output path: the input path with its extension swapped.

use crate::registry::{ConversionFamily, TargetFormat};
use std::path::{Path, PathBuf};

/// Compute the output path used when `-o` is not given.
///
/// Markdown always becomes `.pdf`; images take the resolved target token, so
/// `-t JPEG` yields `name.jpeg` and `-t jpg` yields `name.jpg`. The file is
/// written next to the input.
pub fn default_output_path(input: &Path, family: ConversionFamily, target: TargetFormat) -> PathBuf {
    let ext = match family {
        ConversionFamily::Markdown => TargetFormat::PDF.token,
        ConversionFamily::Image => target.token,
    };
    input.with_extension(ext)
}

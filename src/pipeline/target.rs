//! Target resolution: decide the output encoding from partial user input.
//!
//! ## Order of precedence
//!
//! 1. An explicit `-t` value always wins and is validated against the family.
//! 2. Otherwise the output path's extension is used, and the inferred token
//!    goes through the *same* family validation.
//! 3. With neither, resolution fails.
//!
//! Re-validating inferred targets is what stops `-f notes.md -o notes.png`
//! from writing PDF bytes into a file named `.png`.

use crate::error::ConvertError;
use crate::pipeline::detect::extension_of;
use crate::registry::{self, ConversionFamily, TargetFormat};
use std::path::Path;
use tracing::debug;

/// Resolve the effective target format for `family`.
pub fn resolve_target(
    family: ConversionFamily,
    explicit: Option<&str>,
    output: Option<&Path>,
) -> Result<TargetFormat, ConvertError> {
    let spec = family.spec();

    if let Some(requested) = explicit {
        return spec
            .target(requested)
            .inspect(|t| debug!("Using explicit target '{}'", t))
            .ok_or_else(|| ConvertError::UnsupportedTargetFormat {
                family,
                target: requested.to_string(),
                allowed: spec.allowed_targets(),
            });
    }

    let Some(output) = output else {
        return Err(ConvertError::TargetUndetectable { output: None });
    };

    let inferred = extension_of(output)
        .and_then(|ext| registry::target_for_extension(&ext))
        .ok_or_else(|| ConvertError::TargetUndetectable {
            output: Some(output.to_path_buf()),
        })?;
    debug!(
        "Inferred target '{}' from output '{}'",
        inferred,
        output.display()
    );

    spec.target(inferred.token)
        .ok_or_else(|| ConvertError::TargetFamilyMismatch {
            family,
            target: inferred.token.to_string(),
            allowed: spec.allowed_targets(),
        })
}

//! Values flowing through a single conversion.
//!
//! A [`ConversionRequest`] holds what the user typed. [`crate::convert::plan`]
//! consumes it once and either fails or yields a [`ResolvedPlan`], the
//! unambiguous instruction handed to the dispatcher. Neither is mutated after
//! construction; the plan's fields are private so its invariants (the target
//! is valid for the family, the output path is non-empty) cannot be broken
//! from outside the resolver.

use crate::registry::{ConversionFamily, TargetFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Raw, possibly conflicting user input for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    input: PathBuf,
    explicit_target: Option<String>,
    output: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            explicit_target: None,
            output: None,
        }
    }

    /// Set the explicit target format (`-t`). Blank values count as absent.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        self.explicit_target = if target.trim().is_empty() {
            None
        } else {
            Some(target)
        };
        self
    }

    /// Set the output path (`-o`). An empty path counts as absent.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        self.output = if output.as_os_str().is_empty() {
            None
        } else {
            Some(output)
        };
        self
    }

    /// Convenience for CLI plumbing where both flags are optional.
    pub fn with_options(self, target: Option<String>, output: Option<PathBuf>) -> Self {
        let req = match target {
            Some(t) => self.with_target(t),
            None => self,
        };
        match output {
            Some(o) => req.with_output(o),
            None => req,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn explicit_target(&self) -> Option<&str> {
        self.explicit_target.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// Fully validated conversion instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPlan {
    family: ConversionFamily,
    input: PathBuf,
    target: TargetFormat,
    output: PathBuf,
}

impl ResolvedPlan {
    /// Only the resolver builds plans, after validating `target` against
    /// `family`.
    pub(crate) fn new(
        family: ConversionFamily,
        input: PathBuf,
        target: TargetFormat,
        output: PathBuf,
    ) -> Self {
        debug_assert!(family.spec().target(target.token).is_some());
        debug_assert!(!output.as_os_str().is_empty());
        Self {
            family,
            input,
            target,
            output,
        }
    }

    pub fn family(&self) -> ConversionFamily {
        self.family
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    /// Canonical lowercase target token, e.g. `"jpeg"`.
    pub fn target_format(&self) -> &'static str {
        self.target.token
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub plan: ResolvedPlan,
    /// Size of the written output file.
    pub bytes_written: u64,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_target_is_absent() {
        let req = ConversionRequest::new("a.md").with_target("  ");
        assert_eq!(req.explicit_target(), None);
    }

    #[test]
    fn empty_output_is_absent() {
        let req = ConversionRequest::new("a.md").with_output("");
        assert_eq!(req.output(), None);
    }

    #[test]
    fn with_options_sets_both() {
        let req = ConversionRequest::new("a.png")
            .with_options(Some("webp".into()), Some(PathBuf::from("b.webp")));
        assert_eq!(req.explicit_target(), Some("webp"));
        assert_eq!(req.output(), Some(Path::new("b.webp")));
    }

    #[test]
    fn plan_serialises_lowercase() {
        let plan = ResolvedPlan::new(
            ConversionFamily::Image,
            PathBuf::from("logo.svg"),
            TargetFormat::PNG,
            PathBuf::from("logo.png"),
        );
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["family"], "image");
        assert_eq!(json["target"]["token"], "png");
        assert_eq!(json["output"], "logo.png");
    }
}

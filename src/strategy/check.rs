//! File check types for the `file` strategy.

use serde::{Deserialize, Serialize};

/// Byte-size bounds for a matched file. Both ends are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConstraint {
    /// Minimum size in bytes.
    #[serde(default)]
    pub min: Option<u64>,
    /// Maximum size in bytes.
    #[serde(default)]
    pub max: Option<u64>,
}

impl SizeConstraint {
    /// Returns `true` if `size` lies within the configured bounds.
    #[must_use]
    pub fn admits(&self, size: u64) -> bool {
        self.min.is_none_or(|min| size >= min) && self.max.is_none_or(|max| size <= max)
    }
}

/// A single check applied to every file matched by a `file` strategy.
///
/// Unit checks are written as bare strings (`"exists"`, `"notEmpty"`), the
/// rest as single-key maps (`{"containsPattern": "export"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCheck {
    /// The path exists.
    Exists,
    /// The file has a non-zero size.
    NotEmpty,
    /// The file content matches a regular expression.
    ContainsPattern(String),
    /// The file content equals the given text exactly.
    MatchesContent(String),
    /// The file size lies within bounds.
    SizeConstraint(SizeConstraint),
    /// The Unix permission bits equal the given octal mode (e.g. `"755"`).
    Permissions(String),
}

impl FileCheck {
    /// Name used in per-check diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::NotEmpty => "notEmpty",
            Self::ContainsPattern(_) => "containsPattern",
            Self::MatchesContent(_) => "matchesContent",
            Self::SizeConstraint(_) => "sizeConstraint",
            Self::Permissions(_) => "permissions",
        }
    }
}

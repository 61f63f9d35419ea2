//! Feature document parsing.
//!
//! A feature document is either Markdown with a YAML frontmatter block, a
//! plain YAML file, or a JSON file. The frontmatter carries the feature fields
//! plus an optional `verification` strategy tree.

use serde::{Deserialize, Serialize};

use super::feature::Feature;
use super::verification::VerificationStrategy;

/// A feature together with its declared verification strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDocument {
    /// The feature itself.
    #[serde(flatten)]
    pub feature: Feature,
    /// The declared verification tree, if any.
    #[serde(default)]
    pub verification: Option<VerificationStrategy>,
}

/// Parses a feature document.
///
/// # Errors
///
/// Returns an error string if the content does not deserialize into a
/// [`FeatureDocument`].
pub fn parse_feature_document(content: &str) -> Result<FeatureDocument, String> {
    let trimmed = content.trim_start_matches('\u{feff}');
    if trimmed.trim_start().starts_with('{') {
        return serde_json::from_str(trimmed)
            .map_err(|e| format!("Failed to parse feature JSON: {e}"));
    }

    // Without a closing fence the whole file is a YAML document.
    let yaml = extract_frontmatter(trimmed).unwrap_or(trimmed);
    serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse feature frontmatter: {e}"))
}

/// Returns the frontmatter body when `content` is fenced by `---` lines.
fn extract_frontmatter(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

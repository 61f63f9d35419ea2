//! Feature context consumed by verification.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a feature as tracked by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    /// Not yet implemented or currently failing verification.
    #[default]
    Failing,
    /// Verified and passing.
    Passing,
    /// Waiting on another feature or an external dependency.
    Blocked,
    /// Verified with an inconclusive outcome; a human should look.
    NeedsReview,
    /// Verification failed after implementation was attempted.
    Failed,
    /// No longer relevant.
    Deprecated,
}

/// A unit of work with acceptance criteria.
///
/// The engine never mutates a feature; it is read for prompt construction and
/// diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Stable identifier (e.g. `"auth.login"`).
    pub id: String,
    /// Free-text description of the feature.
    #[serde(default)]
    pub description: String,
    /// Module the feature belongs to.
    #[serde(default)]
    pub module: String,
    /// Ordered acceptance criteria.
    #[serde(default)]
    pub acceptance: Vec<String>,
    /// Current status.
    #[serde(default)]
    pub status: FeatureStatus,
}

impl Feature {
    /// Creates a feature with the given id and description and no criteria.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            module: String::new(),
            acceptance: Vec::new(),
            status: FeatureStatus::default(),
        }
    }

    /// Returns the feature with the given acceptance criteria.
    #[must_use]
    pub fn with_acceptance<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance = criteria.into_iter().map(Into::into).collect();
        self
    }
}

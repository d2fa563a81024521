use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feature::ProcessType;

/// Input of one resolution.
///
/// Built once per resolution attempt and discarded afterwards. Every field
/// takes part in result caching, the preferred lists included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionRequest {
    /// Requested features, concrete (`servlet-3.1`) or versionless (`servlet`)
    pub roots: Vec<String>,

    /// Features already active, excluded from conflict checks
    pub kernel_features: Vec<String>,

    /// Features treated as satisfied without expansion
    pub pre_resolved: Vec<String>,

    /// Allow mutually tolerated versions of a singleton side by side
    pub allow_multiple_versions: bool,

    /// Empty means server only
    pub process_types: BTreeSet<ProcessType>,

    /// Platforms from static configuration, highest precedence
    pub configured_platforms: Vec<String>,

    /// Platforms from the environment or defaults, in preference order
    pub preferred_platform_versions: Vec<String>,

    /// Exact feature versions preferred when several are acceptable
    pub preferred_feature_versions: Vec<String>,
}

impl ResolutionRequest {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root feature
    pub fn root(mut self, name: impl Into<String>) -> Self {
        self.roots.push(name.into());
        self
    }

    /// Add several root features
    pub fn roots<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add a kernel feature
    pub fn kernel(mut self, name: impl Into<String>) -> Self {
        self.kernel_features.push(name.into());
        self
    }

    /// Add a pre-resolved feature
    pub fn pre_resolved(mut self, name: impl Into<String>) -> Self {
        self.pre_resolved.push(name.into());
        self
    }

    pub fn allow_multiple_versions(mut self, allow: bool) -> Self {
        self.allow_multiple_versions = allow;
        self
    }

    /// Add a process type to resolve for
    pub fn process_type(mut self, process_type: ProcessType) -> Self {
        self.process_types.insert(process_type);
        self
    }

    /// Add a configured platform
    pub fn platform(mut self, name: impl Into<String>) -> Self {
        self.configured_platforms.push(name.into());
        self
    }

    /// Set the preferred platform list
    pub fn preferred_platforms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_platform_versions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the preferred feature version list
    pub fn preferred_features<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_feature_versions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Process types in effect, defaulting to server
    pub fn effective_process_types(&self) -> BTreeSet<ProcessType> {
        if self.process_types.is_empty() {
            [ProcessType::Server].into_iter().collect()
        } else {
            self.process_types.clone()
        }
    }

    /// Reject names that can never identify a feature or platform.
    ///
    /// Preference lists are not checked here; bad entries there are
    /// reported as warnings during resolution.
    pub fn validate(&self) -> Result<()> {
        let lists = [
            ("root", &self.roots),
            ("kernel feature", &self.kernel_features),
            ("pre-resolved feature", &self.pre_resolved),
            ("platform", &self.configured_platforms),
        ];

        for (what, names) in lists {
            for name in names.iter() {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(Error::Request(format!("empty {} name", what)));
                }
                if trimmed.chars().any(|c| c.is_whitespace() || c == ',') {
                    return Err(Error::Request(format!("invalid {} name \"{}\"", what, name)));
                }
            }
        }
        Ok(())
    }
}

//! Building a resolution request from configuration.
//!
//! Inputs are layered, highest precedence first:
//!
//! 1. command-line values
//! 2. the TOML server descriptor
//! 3. the `PREFERRED_PLATFORM_VERSIONS` and `PREFERRED_FEATURE_VERSIONS`
//!    environment variables, which only ever feed the preferred lists
//! 4. defaults
//!
//! The source of every request field is recorded so tooling can explain
//! where a value came from.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feature::ProcessType;
use crate::resolver::ResolutionRequest;

/// Ordered, comma-separated platform preference
pub const PREFERRED_PLATFORM_VERSIONS: &str = "PREFERRED_PLATFORM_VERSIONS";

/// Ordered, comma-separated exact feature version preference
pub const PREFERRED_FEATURE_VERSIONS: &str = "PREFERRED_FEATURE_VERSIONS";

/// Server descriptor as written in TOML.
///
/// ```toml
/// features = ["servlet", "jsp"]
/// platforms = ["javaee-7.0"]
/// process_types = ["server"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub features: Vec<String>,
    pub platforms: Vec<String>,
    pub kernel: Vec<String>,
    pub pre_resolved: Vec<String>,
    pub process_types: Vec<ProcessType>,
    pub allow_multiple_versions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_platform_versions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_feature_versions: Option<Vec<String>>,
}

impl ServerConfig {
    /// Parse a server descriptor
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a server descriptor from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::debug!(
            "Loaded server config {} with {} features",
            path.display(),
            config.features.len()
        );
        Ok(config)
    }
}

/// Where a configuration value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigSource {
    Default,
    Environment,
    ServerFile,
    CommandLine,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Environment => "environment",
            ConfigSource::ServerFile => "server-file",
            ConfigSource::CommandLine => "command-line",
        }
    }
}

/// Reads the environment surface and layers configuration sources
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Capture the preference variables from the process environment
    pub fn new() -> Self {
        Self::with_vars(
            [PREFERRED_PLATFORM_VERSIONS, PREFERRED_FEATURE_VERSIONS]
                .into_iter()
                .filter_map(|name| std::env::var(name).ok().map(|value| (name, value))),
        )
    }

    /// Use the given variables instead of the process environment
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Comma-separated list variable; `None` when unset or blank
    pub fn get_env_list(&self, name: &str) -> Option<Vec<String>> {
        let value = self.vars.get(name)?;
        let items: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    }

    /// Layer defaults, environment and an optional server descriptor
    pub fn load(&self, server: Option<&ServerConfig>) -> ResolvedConfig {
        let mut resolved = ResolvedConfig::default();

        if let Some(platforms) = self.get_env_list(PREFERRED_PLATFORM_VERSIONS) {
            resolved.request.preferred_platform_versions = platforms;
            resolved.set_source("preferred_platform_versions", ConfigSource::Environment);
        }
        if let Some(features) = self.get_env_list(PREFERRED_FEATURE_VERSIONS) {
            resolved.request.preferred_feature_versions = features;
            resolved.set_source("preferred_feature_versions", ConfigSource::Environment);
        }

        let Some(server) = server else {
            return resolved;
        };

        let request = &mut resolved.request;
        let mut from_file = Vec::new();
        if !server.features.is_empty() {
            request.roots = server.features.clone();
            from_file.push("roots");
        }
        if !server.platforms.is_empty() {
            request.configured_platforms = server.platforms.clone();
            from_file.push("configured_platforms");
        }
        if !server.kernel.is_empty() {
            request.kernel_features = server.kernel.clone();
            from_file.push("kernel_features");
        }
        if !server.pre_resolved.is_empty() {
            request.pre_resolved = server.pre_resolved.clone();
            from_file.push("pre_resolved");
        }
        if !server.process_types.is_empty() {
            request.process_types = server.process_types.iter().copied().collect();
            from_file.push("process_types");
        }
        if server.allow_multiple_versions {
            request.allow_multiple_versions = true;
            from_file.push("allow_multiple_versions");
        }
        if let Some(platforms) = &server.preferred_platform_versions {
            request.preferred_platform_versions = platforms.clone();
            from_file.push("preferred_platform_versions");
        }
        if let Some(features) = &server.preferred_feature_versions {
            request.preferred_feature_versions = features.clone();
            from_file.push("preferred_feature_versions");
        }

        for field in from_file {
            resolved.set_source(field, ConfigSource::ServerFile);
        }
        resolved
    }
}

const FIELDS: [&str; 8] = [
    "roots",
    "configured_platforms",
    "kernel_features",
    "pre_resolved",
    "process_types",
    "allow_multiple_versions",
    "preferred_platform_versions",
    "preferred_feature_versions",
];

/// A request together with the source of each of its fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub request: ResolutionRequest,
    sources: IndexMap<&'static str, ConfigSource>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            request: ResolutionRequest::default(),
            sources: FIELDS.iter().map(|f| (*f, ConfigSource::Default)).collect(),
        }
    }
}

impl ResolvedConfig {
    fn set_source(&mut self, field: &'static str, source: ConfigSource) {
        self.sources.insert(field, source);
    }

    /// Source of a request field
    pub fn source(&self, field: &str) -> Option<ConfigSource> {
        self.sources.get(field).copied()
    }

    /// Every request field with its source, in declaration order
    pub fn sources(&self) -> impl Iterator<Item = (&'static str, ConfigSource)> + '_ {
        self.sources.iter().map(|(field, source)| (*field, *source))
    }

    /// Replace the roots when any are given on the command line
    pub fn with_roots(mut self, roots: Vec<String>) -> Self {
        if !roots.is_empty() {
            self.request.roots = roots;
            self.set_source("roots", ConfigSource::CommandLine);
        }
        self
    }

    /// Replace the configured platforms when any are given on the command line
    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        if !platforms.is_empty() {
            self.request.configured_platforms = platforms;
            self.set_source("configured_platforms", ConfigSource::CommandLine);
        }
        self
    }

    pub fn with_preferred_platforms(mut self, platforms: Vec<String>) -> Self {
        if !platforms.is_empty() {
            self.request.preferred_platform_versions = platforms;
            self.set_source("preferred_platform_versions", ConfigSource::CommandLine);
        }
        self
    }

    pub fn with_preferred_features(mut self, features: Vec<String>) -> Self {
        if !features.is_empty() {
            self.request.preferred_feature_versions = features;
            self.set_source("preferred_feature_versions", ConfigSource::CommandLine);
        }
        self
    }

    pub fn with_process_types(mut self, process_types: Vec<ProcessType>) -> Self {
        if !process_types.is_empty() {
            self.request.process_types = process_types.into_iter().collect();
            self.set_source("process_types", ConfigSource::CommandLine);
        }
        self
    }

    pub fn with_allow_multiple_versions(mut self, allow: bool) -> Self {
        if allow {
            self.request.allow_multiple_versions = true;
            self.set_source("allow_multiple_versions", ConfigSource::CommandLine);
        }
        self
    }
}

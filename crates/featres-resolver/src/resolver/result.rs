use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Stable identifiers of resolution findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    NoConfiguredPlatform,
    PlatformVersionConflict,
    PlatformVersionInvalid,
    NoFeatureVersionForPlatform,
    ResolvedPlatformsInfo,
    SingletonConflict,
    MissingRootFeature,
    MissingDependency,
    NonPublicRoot,
    WrongProcessType,
    AutoFeatureRoot,
    FeatureVersionInvalid,
    UnknownTolerate,
}

/// How a diagnostic affects the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::NoConfiguredPlatform => "no-configured-platform",
            DiagnosticCode::PlatformVersionConflict => "platform-version-conflict",
            DiagnosticCode::PlatformVersionInvalid => "platform-version-invalid",
            DiagnosticCode::NoFeatureVersionForPlatform => "no-feature-version-for-platform",
            DiagnosticCode::ResolvedPlatformsInfo => "resolved-platforms-info",
            DiagnosticCode::SingletonConflict => "singleton-conflict",
            DiagnosticCode::MissingRootFeature => "missing-root-feature",
            DiagnosticCode::MissingDependency => "missing-dependency",
            DiagnosticCode::NonPublicRoot => "non-public-root",
            DiagnosticCode::WrongProcessType => "wrong-process-type",
            DiagnosticCode::AutoFeatureRoot => "auto-feature-root",
            DiagnosticCode::FeatureVersionInvalid => "feature-version-invalid",
            DiagnosticCode::UnknownTolerate => "unknown-tolerate",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::ResolvedPlatformsInfo => Severity::Info,
            DiagnosticCode::PlatformVersionInvalid
            | DiagnosticCode::AutoFeatureRoot
            | DiagnosticCode::FeatureVersionInvalid
            | DiagnosticCode::UnknownTolerate => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a feature was selected.
///
/// `path` lists the features that led to the selection, starting at a
/// root and ending with the direct requester. It is empty for roots,
/// kernel features and auto features.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chain {
    pub path: Vec<String>,
    /// Every version that was acceptable at the point of selection
    pub candidates: Vec<String>,
    /// The version the requesting edge preferred, if it named one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
}

impl Chain {
    pub fn root(name: &str) -> Self {
        Chain {
            path: Vec::new(),
            candidates: vec![name.to_string()],
            preferred: None,
        }
    }

    /// The root this chain starts at, or `own` when it is a root itself
    pub fn origin<'a>(&'a self, own: &'a str) -> &'a str {
        self.path.first().map(String::as_str).unwrap_or(own)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str("(root)")
        } else {
            f.write_str(&self.path.join(" -> "))
        }
    }
}

/// One structured finding
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    /// Feature, platform or preference the finding is about
    pub subject: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<Chain>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            subject: subject.into(),
            message: message.into(),
            features: Vec::new(),
            chains: Vec::new(),
        }
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chains.push(chain);
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Outcome of one resolution.
///
/// Contains no timing or other run-dependent data: the same request
/// against the same catalog always yields an equal, identically
/// serialized result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Concrete features to activate, kernel and pre-resolved included
    pub resolved_features: BTreeSet<String>,
    /// Platforms actually used to resolve versionless features
    pub resolved_platforms: Vec<String>,
    /// Versionless feature to the concrete feature chosen for it
    pub versionless: BTreeMap<String, String>,
    /// Why each resolved feature was selected
    pub chains: BTreeMap<String, Chain>,
    pub conflicts: Vec<Diagnostic>,
    pub missing: Vec<Diagnostic>,
    /// Non-public roots and features unavailable for the process type
    pub rejected: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub info: Vec<Diagnostic>,
}

impl ResolutionResult {
    /// Whether any finding should stop the caller from using the set
    pub fn has_errors(&self) -> bool {
        !self.conflicts.is_empty() || !self.missing.is_empty() || !self.rejected.is_empty()
    }

    /// All diagnostics, errors first
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.conflicts
            .iter()
            .chain(&self.missing)
            .chain(&self.rejected)
            .chain(&self.warnings)
            .chain(&self.info)
    }

    /// First diagnostic carrying `code`
    pub fn find(&self, code: DiagnosticCode) -> Option<&Diagnostic> {
        self.diagnostics().find(|d| d.code == code)
    }

    /// Whether a feature is in the resolved set (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.resolved_features
            .iter()
            .any(|f| f.eq_ignore_ascii_case(name.trim()))
    }
}

/// Wall-clock cost of each stage, reported apart from the result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionTiming {
    pub expansion: Duration,
    pub platforms: Duration,
    pub validation: Duration,
    pub total: Duration,
}

/// Collects diagnostics from every stage and routes them by code
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Error | Severity::Warning => log::warn!("{}", diagnostic),
            Severity::Info => log::info!("{}", diagnostic),
        }
        self.entries.push(diagnostic);
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Sort, deduplicate and route into `result`
    pub fn assemble_into(mut self, result: &mut ResolutionResult) {
        self.entries.sort();
        self.entries.dedup();

        for diagnostic in self.entries {
            let bucket = match diagnostic.code {
                DiagnosticCode::NoConfiguredPlatform
                | DiagnosticCode::PlatformVersionConflict
                | DiagnosticCode::NoFeatureVersionForPlatform
                | DiagnosticCode::SingletonConflict => &mut result.conflicts,
                DiagnosticCode::MissingRootFeature | DiagnosticCode::MissingDependency => {
                    &mut result.missing
                }
                DiagnosticCode::NonPublicRoot | DiagnosticCode::WrongProcessType => {
                    &mut result.rejected
                }
                DiagnosticCode::ResolvedPlatformsInfo => &mut result.info,
                DiagnosticCode::PlatformVersionInvalid
                | DiagnosticCode::AutoFeatureRoot
                | DiagnosticCode::FeatureVersionInvalid
                | DiagnosticCode::UnknownTolerate => &mut result.warnings,
            };
            bucket.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_strings() {
        assert_eq!(DiagnosticCode::SingletonConflict.as_str(), "singleton-conflict");
        let json = serde_json::to_string(&DiagnosticCode::NoFeatureVersionForPlatform).unwrap();
        assert_eq!(json, "\"no-feature-version-for-platform\"");
        assert_eq!(DiagnosticCode::ResolvedPlatformsInfo.severity(), Severity::Info);
        assert_eq!(DiagnosticCode::UnknownTolerate.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::MissingRootFeature.severity(), Severity::Error);
    }

    #[test]
    fn test_assemble_routes_and_dedupes() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(DiagnosticCode::MissingRootFeature, "foo", "missing foo"));
        diagnostics.push(Diagnostic::new(DiagnosticCode::UnknownTolerate, "jta-1.3", "unknown"));
        diagnostics.push(Diagnostic::new(DiagnosticCode::UnknownTolerate, "jta-1.3", "unknown"));
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::ResolvedPlatformsInfo,
            "javaee-7.0",
            "resolved",
        ));
        diagnostics.push(Diagnostic::new(DiagnosticCode::MissingRootFeature, "bar", "missing bar"));
        assert_eq!(diagnostics.entries().len(), 5);

        let mut result = ResolutionResult::default();
        diagnostics.assemble_into(&mut result);

        let missing: Vec<_> = result.missing.iter().map(|d| d.subject.as_str()).collect();
        assert_eq!(missing, vec!["bar", "foo"]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.info.len(), 1);
        assert!(result.has_errors());
        assert_eq!(result.find(DiagnosticCode::UnknownTolerate).unwrap().subject, "jta-1.3");
        assert!(result.find(DiagnosticCode::SingletonConflict).is_none());
    }

    #[test]
    fn test_info_alone_is_not_an_error() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(DiagnosticCode::ResolvedPlatformsInfo, "javaee-7.0", "ok"));
        let mut result = ResolutionResult::default();
        diagnostics.assemble_into(&mut result);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_chain_display() {
        let root = Chain::root("jsp-2.3");
        assert_eq!(root.to_string(), "(root)");
        assert_eq!(root.origin("jsp-2.3"), "jsp-2.3");

        let chain = Chain {
            path: vec!["jsp-2.3".to_string(), "el-3.0".to_string()],
            candidates: vec!["servlet-3.1".to_string()],
            preferred: None,
        };
        assert_eq!(chain.to_string(), "jsp-2.3 -> el-3.0");
        assert_eq!(chain.origin("servlet-3.1"), "jsp-2.3");
    }
}

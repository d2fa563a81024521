use std::cmp::Ordering;
use std::sync::Arc;

use featres_version::{split_feature_name, Version};

use super::result::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::catalog::CatalogView;
use crate::feature::{key, FeatureDescriptor};

/// Policy for choosing between acceptable feature versions.
///
/// Candidates are ranked by, in order:
/// 1. position in the operator's preferred feature versions
/// 2. the version the requesting edge names
/// 3. earliest platform in the platform order the version belongs to
/// 4. highest version
#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    /// Preferred versions as (lowercased symbolic name, version)
    preferred: Vec<(String, Version)>,
    /// Lowercased platform names, most preferred first
    platform_order: Vec<String>,
}

impl SelectionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `<base>-<version>` preference entries, reporting entries
    /// that name no catalog feature
    pub(crate) fn from_preferences(
        catalog: &dyn CatalogView,
        entries: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut preferred = Vec::new();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::FeatureVersionInvalid,
                    "",
                    "Preferred feature version list contains an empty entry, which is ignored",
                ));
                continue;
            }
            let (base, version) = split_feature_name(entry);
            let Some(version) = version else {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::FeatureVersionInvalid,
                    entry,
                    format!("Preferred feature version \"{}\" has no version suffix and is ignored", entry),
                ));
                continue;
            };
            if catalog.feature_version(base, &version).is_none() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::FeatureVersionInvalid,
                    entry,
                    format!("Preferred feature version \"{}\" is not in the catalog and is ignored", entry),
                ));
                continue;
            }
            preferred.push((key(base), version));
        }
        Self {
            preferred,
            platform_order: Vec::new(),
        }
    }

    /// Set the platform order used for ranking
    pub fn with_platform_order<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.platform_order = Vec::new();
        for platform in platforms {
            let platform = key(platform.as_ref());
            if !self.platform_order.contains(&platform) {
                self.platform_order.push(platform);
            }
        }
        self
    }

    /// Prefer `symbolic_name` at `version`
    pub fn prefer(mut self, symbolic_name: &str, version: Version) -> Self {
        self.preferred.push((key(symbolic_name), version));
        self
    }

    fn preference_rank(&self, fd: &FeatureDescriptor) -> Option<usize> {
        let base = key(&fd.symbolic_name);
        let version = fd.version.as_ref()?;
        self.preferred
            .iter()
            .position(|(b, v)| *b == base && v == version)
    }

    fn platform_rank(&self, fd: &FeatureDescriptor) -> Option<usize> {
        self.platform_order.iter().position(|p| fd.belongs_to(p))
    }

    /// Sort candidates by preference, best first
    pub fn select_preferred(
        &self,
        candidates: &[Arc<FeatureDescriptor>],
        edge_preferred: Option<&Version>,
    ) -> Vec<Arc<FeatureDescriptor>> {
        let mut sorted = candidates.to_vec();

        sorted.sort_by(|a, b| {
            rank_some_first(self.preference_rank(a), self.preference_rank(b))
                .then_with(|| {
                    let a_named = edge_preferred.is_some() && a.version.as_ref() == edge_preferred;
                    let b_named = edge_preferred.is_some() && b.version.as_ref() == edge_preferred;
                    b_named.cmp(&a_named)
                })
                .then_with(|| rank_some_first(self.platform_rank(a), self.platform_rank(b)))
                .then_with(|| b.version.cmp(&a.version))
                .then_with(|| a.name.cmp(&b.name))
        });

        sorted
    }

    /// Select the single best candidate
    pub fn select_best(
        &self,
        candidates: &[Arc<FeatureDescriptor>],
        edge_preferred: Option<&Version>,
    ) -> Option<Arc<FeatureDescriptor>> {
        self.select_preferred(candidates, edge_preferred).into_iter().next()
    }
}

/// Lower ranks first, unranked last
fn rank_some_first(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::CatalogView;
use crate::feature::key;

/// How serious a catalog finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Error,
    Warning,
}

/// A structural problem found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogLint {
    pub level: LintLevel,
    /// Feature the finding is about
    pub feature: String,
    pub message: String,
}

impl fmt::Display for CatalogLint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.feature, self.message)
    }
}

/// Check a catalog for descriptors that resolve badly or not at all.
///
/// Errors: dependencies on unknown features, platform memberships naming
/// unknown platforms. Warnings: auto features marked singleton, symbolic
/// names with several versions none of which is singleton.
pub fn lint(catalog: &dyn CatalogView) -> Vec<CatalogLint> {
    let features = catalog.select(&|_| true);
    let mut lints = Vec::new();

    for fd in &features {
        for dep in &fd.dependencies {
            if catalog.versions_of(&dep.symbolic_name).is_empty() && catalog.feature(&dep.symbolic_name).is_none() {
                lints.push(CatalogLint {
                    level: LintLevel::Error,
                    feature: fd.name.clone(),
                    message: format!("depends on unknown feature {}", dep),
                });
            }
        }

        for platform in &fd.platforms {
            if catalog.platform(platform).is_none() {
                lints.push(CatalogLint {
                    level: LintLevel::Error,
                    feature: fd.name.clone(),
                    message: format!("belongs to unknown platform {}", platform),
                });
            }
        }

        if fd.is_auto_feature() && fd.singleton {
            lints.push(CatalogLint {
                level: LintLevel::Warning,
                feature: fd.name.clone(),
                message: "auto feature is marked singleton".to_string(),
            });
        }
    }

    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for fd in features.iter().filter(|fd| !fd.versionless && fd.version.is_some()) {
        groups.entry(key(&fd.symbolic_name)).or_default().push(&fd.name);
    }
    for (symbolic_name, names) in groups {
        if names.len() < 2 {
            continue;
        }
        let any_singleton = catalog.versions_of(&symbolic_name).iter().any(|fd| fd.singleton);
        if !any_singleton {
            lints.push(CatalogLint {
                level: LintLevel::Warning,
                feature: names.join(", "),
                message: format!(
                    "{} versions of {} exist but none is singleton",
                    names.len(),
                    symbolic_name
                ),
            });
        }
    }

    lints.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.feature.cmp(&b.feature)));
    lints
}

use std::collections::BTreeSet;
use std::sync::Arc;

use super::policy::SelectionPolicy;
use super::request::ResolutionRequest;
use super::result::{Chain, Diagnostic, DiagnosticCode, Diagnostics};
use super::selections::Selections;
use crate::catalog::CatalogView;
use crate::feature::{key, FeatureDescriptor, PlatformDescriptor, ProcessType};

/// Concrete version picked for a versionless feature
#[derive(Debug, Clone)]
pub(crate) struct PlatformChoice {
    pub versionless: String,
    pub selected: Arc<FeatureDescriptor>,
    pub chain: Chain,
}

#[derive(Debug, Default)]
pub(crate) struct PlatformOutcome {
    pub choices: Vec<PlatformChoice>,
    pub resolved_platforms: Vec<String>,
}

/// Maps versionless features to platform-scoped concrete versions.
///
/// Configured platforms come first. Families they leave uncovered are
/// filled from the preferred list, one platform per family.
pub(crate) struct PlatformResolver<'a> {
    catalog: &'a dyn CatalogView,
    request: &'a ResolutionRequest,
    process_types: &'a BTreeSet<ProcessType>,
    policy: &'a SelectionPolicy,
}

impl<'a> PlatformResolver<'a> {
    pub fn new(
        catalog: &'a dyn CatalogView,
        request: &'a ResolutionRequest,
        process_types: &'a BTreeSet<ProcessType>,
        policy: &'a SelectionPolicy,
    ) -> Self {
        Self {
            catalog,
            request,
            process_types,
            policy,
        }
    }

    /// Resolve every versionless feature, given in name order
    pub fn resolve(
        &self,
        versionless: &[Arc<FeatureDescriptor>],
        selections: &Selections,
        diagnostics: &mut Diagnostics,
    ) -> PlatformOutcome {
        let versionless_names: Vec<&str> = versionless.iter().map(|fd| fd.name.as_str()).collect();

        let configured = self.known_platforms(&self.request.configured_platforms, "Configured", diagnostics);
        let preferred = self.known_platforms(
            &self.request.preferred_platform_versions,
            "Preferred",
            diagnostics,
        );

        let mut in_conflict = false;
        for (i, a) in configured.iter().enumerate() {
            for b in &configured[i + 1..] {
                if a.conflicts_with(b) {
                    in_conflict = true;
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::PlatformVersionConflict,
                            format!("{}, {}", a.name, b.name),
                            format!(
                                "Configured platforms {} and {} are mutually exclusive; versionless features cannot be resolved",
                                a.name, b.name
                            ),
                        )
                        .with_features(versionless_names.iter().copied()),
                    );
                }
            }
        }
        if in_conflict || versionless.is_empty() {
            return PlatformOutcome::default();
        }

        let mut effective = configured;
        self.add_preferred(&mut effective, &preferred, versionless);

        if effective.is_empty() {
            for fd in versionless {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::NoConfiguredPlatform,
                        fd.name.as_str(),
                        format!(
                            "Versionless feature {} requires a platform, but none is configured",
                            fd.name
                        ),
                    )
                    .with_features([fd.name.as_str()]),
                );
            }
            return PlatformOutcome::default();
        }

        let effective_names: Vec<&str> = effective.iter().map(|p| p.name.as_str()).collect();
        log::debug!("Effective platforms: {}", effective_names.join(", "));
        let policy = self.policy.clone().with_platform_order(effective_names.iter());

        let mut used = vec![false; effective.len()];
        let mut choices = Vec::new();
        for fd in versionless {
            let candidates: Vec<_> = self
                .catalog
                .versions_of(&fd.symbolic_name)
                .into_iter()
                .filter(|c| c.supports_any(self.process_types))
                .filter(|c| effective.iter().any(|p| c.belongs_to(&p.name)))
                .collect();

            let reused = selections
                .versions_of(&fd.symbolic_name)
                .into_iter()
                .map(|s| Arc::clone(&s.descriptor))
                .find(|s| candidates.iter().any(|c| c.name == s.name));

            let Some(selected) = reused.or_else(|| policy.select_best(&candidates, None)) else {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::NoFeatureVersionForPlatform,
                        fd.name.as_str(),
                        format!(
                            "No version of {} belongs to platform(s) {}",
                            fd.name,
                            effective_names.join(", ")
                        ),
                    )
                    .with_features([fd.name.as_str()]),
                );
                continue;
            };

            if let Some(index) = effective.iter().position(|p| selected.belongs_to(&p.name)) {
                used[index] = true;
            }

            log::debug!("Versionless {} resolved to {}", fd.name, selected.name);
            choices.push(PlatformChoice {
                versionless: fd.name.clone(),
                chain: Chain {
                    path: vec![fd.name.clone()],
                    candidates: candidates.iter().map(|c| c.name.clone()).collect(),
                    preferred: None,
                },
                selected,
            });
        }

        let resolved_platforms: Vec<String> = effective
            .iter()
            .zip(&used)
            .filter(|(_, used)| **used)
            .map(|(p, _)| p.name.clone())
            .collect();

        if !resolved_platforms.is_empty() {
            let joined = resolved_platforms.join(", ");
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::ResolvedPlatformsInfo,
                    joined.as_str(),
                    format!("Versionless features resolved using platform(s) {}", joined),
                )
                .with_features(choices.iter().map(|c| c.selected.name.clone())),
            );
        }

        PlatformOutcome {
            choices,
            resolved_platforms,
        }
    }

    /// Look up platform names, reporting and skipping unknown ones
    fn known_platforms(
        &self,
        names: &[String],
        origin: &str,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Arc<PlatformDescriptor>> {
        let mut platforms: Vec<Arc<PlatformDescriptor>> = Vec::new();
        for name in names {
            if name.trim().is_empty() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::PlatformVersionInvalid,
                    "",
                    format!("{} platform list contains an empty entry, which is ignored", origin),
                ));
                continue;
            }
            match self.catalog.platform(name) {
                Some(platform) => {
                    if !platforms.iter().any(|p| key(&p.name) == key(&platform.name)) {
                        platforms.push(platform);
                    }
                }
                None => diagnostics.push(Diagnostic::new(
                    DiagnosticCode::PlatformVersionInvalid,
                    name.trim(),
                    format!("{} platform \"{}\" is not a known platform and is ignored", origin, name.trim()),
                )),
            }
        }
        platforms
    }

    /// Whether `platform` offers a usable version of `fd`
    fn offers(&self, fd: &FeatureDescriptor, platform: &PlatformDescriptor) -> bool {
        self.catalog
            .versions_of(&fd.symbolic_name)
            .iter()
            .any(|c| c.supports_any(self.process_types) && c.belongs_to(&platform.name))
    }

    /// Fill families not covered by `effective` from the preferred list
    fn add_preferred(
        &self,
        effective: &mut Vec<Arc<PlatformDescriptor>>,
        preferred: &[Arc<PlatformDescriptor>],
        versionless: &[Arc<FeatureDescriptor>],
    ) {
        let mut families: Vec<String> = Vec::new();
        for platform in preferred {
            let family = key(&platform.family);
            if !families.contains(&family) {
                families.push(family);
            }
        }

        for family in families {
            let uncovered: Vec<&Arc<FeatureDescriptor>> = versionless
                .iter()
                .filter(|fd| !effective.iter().any(|p| self.offers(fd, p)))
                .collect();
            if uncovered.is_empty() {
                break;
            }

            let group: Vec<&Arc<PlatformDescriptor>> = preferred
                .iter()
                .filter(|p| key(&p.family) == family)
                .filter(|p| {
                    !effective
                        .iter()
                        .any(|e| key(&e.name) == key(&p.name) || e.conflicts_with(p))
                })
                .collect();

            let family_features: Vec<&&Arc<FeatureDescriptor>> = uncovered
                .iter()
                .filter(|fd| group.iter().any(|p| self.offers(fd, p)))
                .collect();
            if family_features.is_empty() {
                continue;
            }

            let chosen = group
                .iter()
                .find(|p| family_features.iter().all(|fd| self.offers(fd, p)))
                .or_else(|| {
                    group
                        .iter()
                        .find(|p| family_features.iter().any(|fd| self.offers(fd, p)))
                });

            if let Some(platform) = chosen {
                log::debug!("Using preferred platform {}", platform.name);
                effective.push(Arc::clone(platform));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn catalog() -> Catalog {
        Catalog::builder()
            .add_platform(PlatformDescriptor::new("javaee-7.0").unwrap())
            .add_platform(PlatformDescriptor::new("javaee-8.0").unwrap())
            .add_platform(PlatformDescriptor::new("microProfile-1.0").unwrap())
            .add_platform(PlatformDescriptor::new("microProfile-2.0").unwrap())
            .add_feature(FeatureDescriptor::versionless("servlet"))
            .add_feature(FeatureDescriptor::new("servlet-3.1").platform("javaee-7.0"))
            .add_feature(FeatureDescriptor::new("servlet-4.0").platform("javaee-8.0"))
            .add_feature(FeatureDescriptor::versionless("mpConfig"))
            .add_feature(FeatureDescriptor::new("mpConfig-1.1").platform("microProfile-1.0"))
            .add_feature(FeatureDescriptor::new("mpConfig-1.3").platform("microProfile-2.0"))
            .build()
            .unwrap()
    }

    fn run(catalog: &Catalog, request: &ResolutionRequest, names: &[&str]) -> (PlatformOutcome, Diagnostics) {
        let process_types = request.effective_process_types();
        let policy = SelectionPolicy::new();
        let resolver = PlatformResolver::new(catalog, request, &process_types, &policy);
        let versionless: Vec<_> = names.iter().filter_map(|n| catalog.feature(n)).collect();
        let mut diagnostics = Diagnostics::new();
        let outcome = resolver.resolve(&versionless, &Selections::new(), &mut diagnostics);
        (outcome, diagnostics)
    }

    fn chosen(outcome: &PlatformOutcome) -> Vec<String> {
        outcome.choices.iter().map(|c| c.selected.name.clone()).collect()
    }

    #[test]
    fn test_configured_wins_and_preferred_fills_other_family() {
        let catalog = catalog();
        let request = ResolutionRequest::new()
            .platform("javaee-7.0")
            .preferred_platforms(["javaee-8.0", "microProfile-2.0", "microProfile-1.0"]);

        let (outcome, diagnostics) = run(&catalog, &request, &["mpConfig", "servlet"]);
        assert_eq!(chosen(&outcome), vec!["mpConfig-1.3", "servlet-3.1"]);
        assert_eq!(outcome.resolved_platforms, vec!["javaee-7.0", "microProfile-2.0"]);
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.code == DiagnosticCode::ResolvedPlatformsInfo));
    }

    #[test]
    fn test_unknown_platform_reported_and_skipped() {
        let catalog = catalog();
        let request = ResolutionRequest::new().platform("javaee-99.0").platform("javaee-8.0");

        let (outcome, diagnostics) = run(&catalog, &request, &["servlet"]);
        assert_eq!(chosen(&outcome), vec!["servlet-4.0"]);
        assert_eq!(diagnostics.entries()[0].code, DiagnosticCode::PlatformVersionInvalid);
        assert_eq!(diagnostics.entries()[0].subject, "javaee-99.0");
    }

    #[test]
    fn test_no_version_for_platform() {
        let catalog = catalog();
        let request = ResolutionRequest::new().platform("javaee-7.0");

        let (outcome, diagnostics) = run(&catalog, &request, &["mpConfig"]);
        assert!(outcome.choices.is_empty());
        assert!(outcome.resolved_platforms.is_empty());
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.code == DiagnosticCode::NoFeatureVersionForPlatform && d.subject == "mpConfig"));
    }

    #[test]
    fn test_conflict_without_versionless_still_reported() {
        let catalog = catalog();
        let request = ResolutionRequest::new().platform("javaee-7.0").platform("javaee-8.0");

        let (outcome, diagnostics) = run(&catalog, &request, &[]);
        assert!(outcome.choices.is_empty());
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(diagnostics.entries()[0].code, DiagnosticCode::PlatformVersionConflict);
    }

    #[test]
    fn test_preferred_checked_without_versionless_features() {
        let catalog = catalog();
        let request = ResolutionRequest::new().preferred_platforms(["MicroProfile 9", "", "javaee-8.0"]);

        let (outcome, diagnostics) = run(&catalog, &request, &[]);
        assert!(outcome.choices.is_empty());
        let invalid: Vec<&str> = diagnostics
            .entries()
            .iter()
            .filter(|d| d.code == DiagnosticCode::PlatformVersionInvalid)
            .map(|d| d.subject.as_str())
            .collect();
        assert_eq!(invalid, vec!["MicroProfile 9", ""]);
    }

    #[test]
    fn test_preferred_checked_when_configured_platforms_conflict() {
        let catalog = catalog();
        let request = ResolutionRequest::new()
            .platform("javaee-7.0")
            .platform("javaee-8.0")
            .preferred_platforms(["javaee-99.0"]);

        let (_, diagnostics) = run(&catalog, &request, &["servlet"]);
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.code == DiagnosticCode::PlatformVersionInvalid && d.subject == "javaee-99.0"));
    }
}

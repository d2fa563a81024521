use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use super::platform::PlatformChoice;
use super::policy::SelectionPolicy;
use super::request::ResolutionRequest;
use super::result::{Chain, Diagnostic, DiagnosticCode, Diagnostics};
use super::selections::Selections;
use crate::catalog::CatalogView;
use crate::feature::{key, Dependency, FeatureDescriptor, ProcessType};

/// A dependency edge with more than one acceptable version, decided
/// once the rigid edges have been followed
#[derive(Debug, Clone)]
struct PostponedEdge {
    requester: String,
    dependency: Dependency,
    candidates: Vec<Arc<FeatureDescriptor>>,
    path: Vec<String>,
}

impl PostponedEdge {
    fn chain(&self) -> Chain {
        Chain {
            path: self.path.clone(),
            candidates: self.candidates.iter().map(|c| c.name.clone()).collect(),
            preferred: self.dependency.preferred_name(),
        }
    }
}

/// Computes the transitive closure of the requested features.
///
/// Roots are seeded in name order so the closure does not depend on the
/// order they were requested in. Edges with a single acceptable version
/// are followed immediately; edges with several are postponed per
/// symbolic name and decided one name at a time once the queue drains.
/// Auto features are checked whenever no other work is left.
pub(crate) struct Expander<'a> {
    catalog: &'a dyn CatalogView,
    process_types: &'a BTreeSet<ProcessType>,
    policy: &'a SelectionPolicy,
    selections: Selections,
    /// Selected features whose dependencies are still to be followed
    queue: VecDeque<String>,
    /// Postponed edges by lowercased symbolic name
    postponed: BTreeMap<String, Vec<PostponedEdge>>,
    /// Versionless roots waiting for platform resolution
    versionless: BTreeMap<String, Arc<FeatureDescriptor>>,
    passes: usize,
}

impl<'a> Expander<'a> {
    pub fn new(
        catalog: &'a dyn CatalogView,
        process_types: &'a BTreeSet<ProcessType>,
        policy: &'a SelectionPolicy,
    ) -> Self {
        Self {
            catalog,
            process_types,
            policy,
            selections: Selections::new(),
            queue: VecDeque::new(),
            postponed: BTreeMap::new(),
            versionless: BTreeMap::new(),
            passes: 0,
        }
    }

    /// Seed kernel features, pre-resolved features and roots
    pub fn seed(&mut self, request: &ResolutionRequest, diagnostics: &mut Diagnostics) {
        for name in canonical(&request.kernel_features) {
            match self.catalog.feature(&name) {
                Some(fd) if fd.versionless => {
                    self.versionless.insert(key(&fd.name), fd);
                }
                Some(fd) => {
                    let chain = Chain::root(&fd.name);
                    self.add(fd, chain, true);
                }
                None => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::MissingRootFeature,
                        name.as_str(),
                        format!("Kernel feature {} is not in the catalog", name),
                    )
                    .with_features([name.as_str()]),
                ),
            }
        }

        for name in canonical(&request.pre_resolved) {
            match self.catalog.feature(&name) {
                Some(fd) if !fd.versionless => {
                    let chain = Chain::root(&fd.name);
                    self.selections.select(fd, chain, false);
                }
                _ => log::debug!("Pre-resolved feature {} has no concrete catalog entry", name),
            }
        }

        for name in canonical(&request.roots) {
            self.seed_root(&name, diagnostics);
        }
    }

    fn seed_root(&mut self, name: &str, diagnostics: &mut Diagnostics) {
        let Some(fd) = self.catalog.feature(name) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::MissingRootFeature,
                    name,
                    format!("Root feature {} is not in the catalog", name),
                )
                .with_features([name]),
            );
            return;
        };

        if fd.is_auto_feature() {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::AutoFeatureRoot,
                    fd.name.as_str(),
                    format!(
                        "Auto feature {} cannot be requested directly; it activates when its condition is met",
                        fd.name
                    ),
                )
                .with_features([fd.name.as_str()]),
            );
            return;
        }

        if !fd.is_public() {
            let visibility = format!("{:?}", fd.visibility).to_lowercase();
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::NonPublicRoot,
                    fd.name.as_str(),
                    format!(
                        "Feature {} is {} and cannot be requested as a root",
                        fd.name, visibility
                    ),
                )
                .with_features([fd.name.as_str()])
                .with_chain(Chain::root(&fd.name)),
            );
            return;
        }

        if fd.versionless {
            log::debug!("Versionless root {} deferred to platform resolution", fd.name);
            self.versionless.insert(key(&fd.name), fd);
            return;
        }

        if !fd.supports_any(self.process_types) {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::WrongProcessType,
                    fd.name.as_str(),
                    format!(
                        "Feature {} is not available for process type {}",
                        fd.name,
                        describe(self.process_types)
                    ),
                )
                .with_features([fd.name.as_str()])
                .with_chain(Chain::root(&fd.name)),
            );
            return;
        }

        let chain = Chain::root(&fd.name);
        self.add(fd, chain, false);
    }

    /// Select a feature and queue its dependencies
    fn add(&mut self, fd: Arc<FeatureDescriptor>, chain: Chain, kernel: bool) -> bool {
        let name = key(&fd.name);
        if self.selections.select(fd, chain, kernel) {
            self.queue.push_back(name);
            true
        } else {
            false
        }
    }

    /// Expand to a fixed point
    pub fn run(&mut self, diagnostics: &mut Diagnostics) {
        loop {
            self.passes += 1;

            while let Some(name) = self.queue.pop_front() {
                self.expand(&name, diagnostics);
            }

            if let Some((symbolic_name, edges)) = self.postponed.pop_first() {
                self.decide(&symbolic_name, edges);
                continue;
            }

            if self.activate_auto_features() {
                continue;
            }

            break;
        }
        log::debug!(
            "Closure holds {} features after {} passes",
            self.selections.len(),
            self.passes
        );
    }

    fn expand(&mut self, name: &str, diagnostics: &mut Diagnostics) {
        let Some(selected) = self.selections.get(name) else {
            return;
        };
        let fd = Arc::clone(&selected.descriptor);
        let mut path = selected.chain.path.clone();
        path.push(fd.name.clone());

        let process_types = self.process_types;
        for dep in fd.dependencies.iter().filter(|d| d.applies_to(process_types)) {
            self.check_tolerates(&fd, dep, diagnostics);

            if let Some(existing) = self.selections.satisfying(dep) {
                log::debug!("{} required by {} satisfied by {}", dep, fd.name, existing.descriptor.name);
                continue;
            }

            let acceptable: Vec<_> = self
                .catalog
                .versions_of(&dep.symbolic_name)
                .into_iter()
                .filter(|c| dep.accepts(c.version.as_ref()))
                .collect();

            if acceptable.is_empty() {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::MissingDependency,
                        dep.to_string(),
                        format!("{} required by {} is not in the catalog", dep, fd.name),
                    )
                    .with_features([fd.name.as_str()])
                    .with_chain(Chain {
                        path: path.clone(),
                        candidates: Vec::new(),
                        preferred: dep.preferred_name(),
                    }),
                );
                continue;
            }

            let candidates: Vec<_> = acceptable
                .iter()
                .filter(|c| c.supports_any(self.process_types))
                .cloned()
                .collect();

            if candidates.is_empty() {
                let rejected = self
                    .policy
                    .select_best(&acceptable, dep.preferred_version())
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| dep.to_string());
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::WrongProcessType,
                        rejected.as_str(),
                        format!(
                            "Feature {} required by {} is not available for process type {}",
                            rejected,
                            fd.name,
                            describe(self.process_types)
                        ),
                    )
                    .with_features([fd.name.as_str()])
                    .with_chain(Chain {
                        path: path.clone(),
                        candidates: acceptable.iter().map(|c| c.name.clone()).collect(),
                        preferred: dep.preferred_name(),
                    }),
                );
                continue;
            }

            if let [only] = candidates.as_slice() {
                let chain = Chain {
                    path: path.clone(),
                    candidates: vec![only.name.clone()],
                    preferred: dep.preferred_name(),
                };
                self.add(Arc::clone(only), chain, false);
            } else {
                log::debug!("Postponing {} required by {}", dep, fd.name);
                self.postponed
                    .entry(key(&dep.symbolic_name))
                    .or_default()
                    .push(PostponedEdge {
                        requester: fd.name.clone(),
                        dependency: dep.clone(),
                        candidates,
                        path: path.clone(),
                    });
            }
        }
    }

    /// Report tolerated versions that name no catalog feature
    fn check_tolerates(&self, fd: &FeatureDescriptor, dep: &Dependency, diagnostics: &mut Diagnostics) {
        for version in &dep.tolerates {
            if self.catalog.feature_version(&dep.symbolic_name, version).is_none() {
                let tolerated = format!("{}-{}", dep.symbolic_name, version);
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::UnknownTolerate,
                        tolerated.as_str(),
                        format!("{} tolerates {}, which is not in the catalog", fd.name, tolerated),
                    )
                    .with_features([fd.name.as_str()]),
                );
            }
        }
    }

    /// Decide one postponed symbolic name.
    ///
    /// A version acceptable to every pending edge wins when there is one;
    /// otherwise each edge gets its own best version.
    fn decide(&mut self, symbolic_name: &str, edges: Vec<PostponedEdge>) {
        let mut edges: Vec<_> = edges
            .into_iter()
            .filter(|e| self.selections.satisfying(&e.dependency).is_none())
            .collect();
        if edges.is_empty() {
            return;
        }
        edges.sort_by(|a, b| {
            key(&a.requester)
                .cmp(&key(&b.requester))
                .then_with(|| a.dependency.to_string().cmp(&b.dependency.to_string()))
        });

        let common: Vec<_> = edges[0]
            .candidates
            .iter()
            .filter(|c| edges.iter().all(|e| e.dependency.accepts(c.version.as_ref())))
            .cloned()
            .collect();

        // The first edge whose own preference is acceptable to all leads
        let leader = edges
            .iter()
            .find(|e| {
                e.dependency
                    .preferred_version()
                    .is_some_and(|p| common.iter().any(|c| c.version.as_ref() == Some(p)))
            })
            .unwrap_or(&edges[0]);

        if let Some(best) = self
            .policy
            .select_best(&common, leader.dependency.preferred_version())
        {
            log::debug!("Decided {} for {} postponed edge(s) on {}", best.name, edges.len(), symbolic_name);
            let chain = leader.chain();
            self.add(best, chain, false);
            return;
        }

        log::debug!("No common version of {} for {} edges", symbolic_name, edges.len());
        for edge in &edges {
            if self.selections.satisfying(&edge.dependency).is_some() {
                continue;
            }
            if let Some(best) = self
                .policy
                .select_best(&edge.candidates, edge.dependency.preferred_version())
            {
                self.add(best, edge.chain(), false);
            }
        }
    }

    /// Add every auto feature whose condition now holds
    fn activate_auto_features(&mut self) -> bool {
        let mut added = false;
        for fd in self.catalog.auto_features() {
            if self.selections.contains(&fd.name) || !fd.supports_any(self.process_types) {
                continue;
            }
            let satisfied = fd
                .auto_condition
                .as_ref()
                .is_some_and(|c| c.is_satisfied(|member| self.selections.is_present(member)));
            if satisfied {
                log::debug!("Auto feature {} activated", fd.name);
                let chain = Chain::root(&fd.name);
                added |= self.add(fd, chain, false);
            }
        }
        added
    }

    /// Select the concrete versions chosen for versionless features
    pub fn add_platform_choices(&mut self, choices: Vec<PlatformChoice>) {
        for choice in choices {
            self.add(choice.selected, choice.chain, false);
        }
    }

    /// Versionless features awaiting platform resolution, in name order
    pub fn pending_versionless(&self) -> Vec<Arc<FeatureDescriptor>> {
        self.versionless.values().cloned().collect()
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn into_selections(self) -> Selections {
        self.selections
    }
}

/// Trimmed names, deduplicated case-insensitively and ordered by name
fn canonical(names: &[String]) -> Vec<String> {
    let mut unique: BTreeMap<String, String> = BTreeMap::new();
    for name in names {
        let name = name.trim();
        unique.entry(key(name)).or_insert_with(|| name.to_string());
    }
    unique.into_values().collect()
}

fn describe(process_types: &BTreeSet<ProcessType>) -> String {
    process_types
        .iter()
        .map(ProcessType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::feature::AutoCondition;
    use featres_version::Version;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn expand(catalog: &Catalog, request: &ResolutionRequest) -> (Vec<String>, Diagnostics) {
        let process_types = request.effective_process_types();
        let policy = SelectionPolicy::new();
        let mut diagnostics = Diagnostics::new();
        let mut expander = Expander::new(catalog, &process_types, &policy);
        expander.seed(request, &mut diagnostics);
        expander.run(&mut diagnostics);
        let names = expander
            .into_selections()
            .iter()
            .map(|s| s.descriptor.name.clone())
            .collect();
        (names, diagnostics)
    }

    #[test]
    fn test_transitive_closure_with_cycle() {
        let catalog = Catalog::builder()
            .add_feature(FeatureDescriptor::new("a-1.0").depends_on(Dependency::on("b-1.0")))
            .add_feature(FeatureDescriptor::new("b-1.0").depends_on(Dependency::on("c-1.0")))
            .add_feature(FeatureDescriptor::new("c-1.0").depends_on(Dependency::on("a-1.0")))
            .build()
            .unwrap();

        let (names, diagnostics) = expand(&catalog, &ResolutionRequest::new().root("a-1.0"));
        assert_eq!(names, vec!["a-1.0", "b-1.0", "c-1.0"]);
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn test_postponed_edges_share_a_version() {
        // a tolerates 1.1..1.3, b tolerates 1.2..1.3: both accept 1.2 and 1.3
        let catalog = Catalog::builder()
            .add_feature(
                FeatureDescriptor::new("a-1.0")
                    .depends_on(Dependency::on("jta-1.1").tolerating(&[v("1.2"), v("1.3")])),
            )
            .add_feature(
                FeatureDescriptor::new("b-1.0")
                    .depends_on(Dependency::on("jta-1.2").tolerating(&[v("1.3")])),
            )
            .add_feature(FeatureDescriptor::new("jta-1.1").singleton(true))
            .add_feature(FeatureDescriptor::new("jta-1.2").singleton(true))
            .add_feature(FeatureDescriptor::new("jta-1.3").singleton(true))
            .build()
            .unwrap();

        let (names, _) = expand(&catalog, &ResolutionRequest::new().roots(["b-1.0", "a-1.0"]));
        assert_eq!(names, vec!["a-1.0", "b-1.0", "jta-1.2"]);
    }

    #[test]
    fn test_rigid_edge_wins_over_postponed() {
        let catalog = Catalog::builder()
            .add_feature(
                FeatureDescriptor::new("a-1.0")
                    .depends_on(Dependency::on("jta-1.2").tolerating(&[v("1.1")])),
            )
            .add_feature(FeatureDescriptor::new("b-1.0").depends_on(Dependency::on("jta-1.1")))
            .add_feature(FeatureDescriptor::new("jta-1.1"))
            .add_feature(FeatureDescriptor::new("jta-1.2"))
            .build()
            .unwrap();

        let (names, _) = expand(&catalog, &ResolutionRequest::new().roots(["a-1.0", "b-1.0"]));
        assert_eq!(names, vec!["a-1.0", "b-1.0", "jta-1.1"]);
    }

    #[test]
    fn test_root_checks() {
        let catalog = Catalog::builder()
            .add_feature(FeatureDescriptor::new("internal-1.0").visibility(crate::feature::Visibility::Private))
            .add_feature(FeatureDescriptor::new("clientOnly-1.0").process_type(ProcessType::Client))
            .add_feature(
                FeatureDescriptor::new("bridge-1.0")
                    .visibility(crate::feature::Visibility::Private)
                    .auto_when(AutoCondition::new().requires_any(["internal"])),
            )
            .build()
            .unwrap();

        let request = ResolutionRequest::new().roots(["internal-1.0", "clientOnly-1.0", "bridge-1.0", "nope-1.0"]);
        let (names, diagnostics) = expand(&catalog, &request);
        assert!(names.is_empty());

        let codes: BTreeSet<_> = diagnostics.entries().iter().map(|d| d.code).collect();
        assert!(codes.contains(&DiagnosticCode::NonPublicRoot));
        assert!(codes.contains(&DiagnosticCode::WrongProcessType));
        assert!(codes.contains(&DiagnosticCode::AutoFeatureRoot));
        assert!(codes.contains(&DiagnosticCode::MissingRootFeature));
    }

    #[test]
    fn test_auto_feature_activates_on_closure() {
        let catalog = Catalog::builder()
            .add_feature(FeatureDescriptor::new("jsonp-1.1"))
            .add_feature(FeatureDescriptor::new("cdi-2.0"))
            .add_feature(
                FeatureDescriptor::new("jsonpCdi-1.0")
                    .visibility(crate::feature::Visibility::Private)
                    .auto_when(AutoCondition::new().requires_any(["jsonp"]).requires_any(["cdi-2.0"])),
            )
            .build()
            .unwrap();

        let (names, _) = expand(&catalog, &ResolutionRequest::new().root("jsonp-1.1"));
        assert_eq!(names, vec!["jsonp-1.1"]);

        let (names, _) = expand(&catalog, &ResolutionRequest::new().roots(["jsonp-1.1", "cdi-2.0"]));
        assert_eq!(names, vec!["cdi-2.0", "jsonp-1.1", "jsonpCdi-1.0"]);
    }

    #[test]
    fn test_missing_dependency_and_unknown_tolerate() {
        let catalog = Catalog::builder()
            .add_feature(
                FeatureDescriptor::new("a-1.0")
                    .depends_on(Dependency::on("gone-1.0"))
                    .depends_on(Dependency::on("jta-1.1").tolerating(&[v("9.0")])),
            )
            .add_feature(FeatureDescriptor::new("jta-1.1"))
            .build()
            .unwrap();

        let (names, diagnostics) = expand(&catalog, &ResolutionRequest::new().root("a-1.0"));
        assert_eq!(names, vec!["a-1.0", "jta-1.1"]);

        let missing = diagnostics
            .entries()
            .iter()
            .find(|d| d.code == DiagnosticCode::MissingDependency)
            .unwrap();
        assert_eq!(missing.subject, "gone-1.0");
        assert_eq!(missing.chains[0].path, vec!["a-1.0"]);

        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.code == DiagnosticCode::UnknownTolerate && d.subject == "jta-9.0"));
    }

    #[test]
    fn test_process_type_filters_edges() {
        let catalog = Catalog::builder()
            .add_feature(
                FeatureDescriptor::new("jaxrs-2.1")
                    .depends_on(Dependency::on("jaxrsClient-2.1"))
                    .depends_on(Dependency::on("webContainer-1.0").only_for(ProcessType::Server)),
            )
            .add_feature(FeatureDescriptor::new("jaxrsClient-2.1"))
            .add_feature(FeatureDescriptor::new("webContainer-1.0").process_type(ProcessType::Server))
            .build()
            .unwrap();

        let server = ResolutionRequest::new().root("jaxrs-2.1");
        let (names, _) = expand(&catalog, &server);
        assert_eq!(names, vec!["jaxrs-2.1", "jaxrsClient-2.1", "webContainer-1.0"]);

        let client = ResolutionRequest::new().root("jaxrs-2.1").process_type(ProcessType::Client);
        let (names, diagnostics) = expand(&catalog, &client);
        assert_eq!(names, vec!["jaxrs-2.1", "jaxrsClient-2.1"]);
        assert!(diagnostics.entries().is_empty());
    }
}

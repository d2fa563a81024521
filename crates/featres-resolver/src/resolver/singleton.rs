use std::collections::{BTreeMap, BTreeSet};

use featres_version::Version;

use super::request::ResolutionRequest;
use super::result::{Diagnostic, DiagnosticCode, Diagnostics};
use super::selections::{Selected, Selections};
use crate::catalog::CatalogView;
use crate::feature::key;

/// Report singleton symbolic names with more than one selected version.
///
/// Kernel features are left out. Several versions are accepted only when
/// multiple versions are allowed and every two of them tolerate each
/// other. Never changes the closure.
pub(crate) fn detect(
    catalog: &dyn CatalogView,
    request: &ResolutionRequest,
    selections: &Selections,
    diagnostics: &mut Diagnostics,
) {
    let mut groups: BTreeMap<String, Vec<&Selected>> = BTreeMap::new();
    for selected in selections.iter().filter(|s| !s.kernel) {
        groups
            .entry(key(&selected.descriptor.symbolic_name))
            .or_default()
            .push(selected);
    }

    for (symbolic_name, members) in groups {
        let versions: BTreeSet<_> = members.iter().map(|s| s.descriptor.version.as_ref()).collect();
        if versions.len() < 2 || !members.iter().any(|s| s.descriptor.singleton) {
            continue;
        }

        if request.allow_multiple_versions && mutually_tolerated(catalog, &symbolic_name, &members) {
            log::debug!("Multiple versions of {} allowed by tolerates", symbolic_name);
            continue;
        }

        let found: Vec<String> = members
            .iter()
            .map(|s| {
                format!(
                    "{} (requested by {})",
                    s.descriptor.name,
                    s.chain.origin(&s.descriptor.name)
                )
            })
            .collect();
        let display_name = &members[0].descriptor.symbolic_name;

        let mut diagnostic = Diagnostic::new(
            DiagnosticCode::SingletonConflict,
            display_name.as_str(),
            format!(
                "Only one version of singleton feature {} may be active, found {}",
                display_name,
                found.join(", ")
            ),
        )
        .with_features(members.iter().map(|s| s.descriptor.name.clone()));
        for member in &members {
            diagnostic = diagnostic.with_chain(member.chain.clone());
        }
        diagnostics.push(diagnostic);
    }
}

fn mutually_tolerated(catalog: &dyn CatalogView, symbolic_name: &str, members: &[&Selected]) -> bool {
    let versions: Option<Vec<&Version>> = members.iter().map(|s| s.descriptor.version.as_ref()).collect();
    versions.is_some_and(|versions| catalog.tolerance(symbolic_name).allows_all(versions))
}

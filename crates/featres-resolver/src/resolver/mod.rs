//! Feature resolution engine.
//!
//! A resolution runs in fixed stages, none of which revisits an earlier
//! one:
//!
//! 1. **Expansion**: closure of kernel features, pre-resolved
//!    features and roots, with version selection by [`SelectionPolicy`]
//!    and auto-feature activation
//! 2. **Platforms**: versionless roots are mapped to
//!    platform-scoped concrete versions, which are then expanded in turn
//! 3. **Validation**: singleton conflicts in the closure
//! 4. **Assembly**: diagnostics are sorted, deduplicated and routed into
//!    the [`ResolutionResult`]
//!
//! Every finding is a [`Diagnostic`]; only malformed requests fail with
//! an error.

mod expander;
mod platform;
mod policy;
mod request;
mod result;
mod selections;
mod singleton;


pub use policy::SelectionPolicy;
pub use request::ResolutionRequest;
pub use result::{Chain, Diagnostic, DiagnosticCode, ResolutionResult, ResolutionTiming, Severity};

use std::collections::BTreeMap;
use std::time::Instant;

use expander::Expander;
use platform::PlatformResolver;
use result::Diagnostics;

use crate::catalog::CatalogView;
use crate::error::Result;
use crate::feature::ProcessType;

/// Resolves requests against a shared, read-only catalog.
///
/// Holds no state of its own between calls, so one resolver (or one
/// catalog shared by many resolvers) can serve concurrent resolutions.
pub struct Resolver<'a> {
    catalog: &'a dyn CatalogView,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a dyn CatalogView) -> Self {
        Self { catalog }
    }

    /// Resolve a request
    pub fn resolve(&self, request: &ResolutionRequest) -> Result<ResolutionResult> {
        self.resolve_timed(request).map(|(result, _)| result)
    }

    /// Resolve a request and report how long each stage took
    pub fn resolve_timed(&self, request: &ResolutionRequest) -> Result<(ResolutionResult, ResolutionTiming)> {
        request.validate()?;

        let started = Instant::now();
        let process_types = request.effective_process_types();
        let mut diagnostics = Diagnostics::new();

        let policy = SelectionPolicy::from_preferences(
            self.catalog,
            &request.preferred_feature_versions,
            &mut diagnostics,
        )
        .with_platform_order(
            request
                .configured_platforms
                .iter()
                .chain(&request.preferred_platform_versions),
        );

        // Expansion
        let mut expander = Expander::new(self.catalog, &process_types, &policy);
        expander.seed(request, &mut diagnostics);
        expander.run(&mut diagnostics);
        let mut expansion = started.elapsed();

        // Platforms
        let platforms_started = Instant::now();
        let outcome = PlatformResolver::new(self.catalog, request, &process_types, &policy).resolve(
            &expander.pending_versionless(),
            expander.selections(),
            &mut diagnostics,
        );
        let platforms = platforms_started.elapsed();

        let versionless: BTreeMap<String, String> = outcome
            .choices
            .iter()
            .map(|c| (c.versionless.clone(), c.selected.name.clone()))
            .collect();

        if !outcome.choices.is_empty() {
            let reexpansion_started = Instant::now();
            expander.add_platform_choices(outcome.choices);
            expander.run(&mut diagnostics);
            expansion += reexpansion_started.elapsed();
        }
        let selections = expander.into_selections();

        // Validation
        let validation_started = Instant::now();
        singleton::detect(self.catalog, request, &selections, &mut diagnostics);
        let validation = validation_started.elapsed();

        // Assembly
        let mut result = ResolutionResult {
            resolved_features: selections.iter().map(|s| s.descriptor.name.clone()).collect(),
            resolved_platforms: outcome.resolved_platforms,
            versionless,
            chains: selections
                .iter()
                .map(|s| (s.descriptor.name.clone(), s.chain.clone()))
                .collect(),
            ..Default::default()
        };
        diagnostics.assemble_into(&mut result);

        let timing = ResolutionTiming {
            expansion,
            platforms,
            validation,
            total: started.elapsed(),
        };

        log::info!(
            "Resolved {} features ({} conflicts, {} missing) in {:?}",
            result.resolved_features.len(),
            result.conflicts.len(),
            result.missing.len(),
            timing.total
        );

        Ok((result, timing))
    }
}

/// Resolve with the positional inputs a server bootstrap supplies.
///
/// An empty `process_types` resolves for the server.
pub fn resolve(
    catalog: &dyn CatalogView,
    kernel: &[String],
    roots: &[String],
    pre_resolved: &[String],
    allow_multiple_versions: bool,
    process_types: &[ProcessType],
    configured_platforms: &[String],
) -> Result<ResolutionResult> {
    let request = ResolutionRequest {
        roots: roots.to_vec(),
        kernel_features: kernel.to_vec(),
        pre_resolved: pre_resolved.to_vec(),
        allow_multiple_versions,
        process_types: process_types.iter().copied().collect(),
        configured_platforms: configured_platforms.to_vec(),
        ..Default::default()
    };
    Resolver::new(catalog).resolve(&request)
}

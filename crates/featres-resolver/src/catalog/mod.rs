//! Read-only views over feature descriptors.
//!
//! The resolver only ever sees a [`CatalogView`]. Lookups never fail with
//! an error: an unknown name is simply `None` or an empty list.
//!
//! - [`Catalog`]: indexed in-memory catalog, built with [`CatalogBuilder`]
//!   or loaded from JSON
//! - [`CompositeCatalog`]: ordered layering of several views, first hit wins
//!
//! [`lint()`] reports descriptors that would resolve badly.

mod catalog;
mod composite;
mod lint;
mod tolerance;

pub use catalog::{Catalog, CatalogBuilder, CatalogManifest};
pub use composite::CompositeCatalog;
pub use lint::{lint, CatalogLint, LintLevel};
pub use tolerance::Tolerance;

use std::sync::Arc;

use featres_version::{split_feature_name, Version};

use crate::feature::{FeatureDescriptor, PlatformDescriptor};

/// Read-only, side-effect free access to feature descriptors.
pub trait CatalogView: Send + Sync {
    /// Look up a feature by full name (`servlet-3.1`) or versionless name (`servlet`)
    fn feature(&self, name: &str) -> Option<Arc<FeatureDescriptor>>;

    /// All descriptors matching a predicate, ordered by name
    fn select(&self, predicate: &dyn Fn(&FeatureDescriptor) -> bool) -> Vec<Arc<FeatureDescriptor>>;

    /// Concrete (non-versionless) descriptors of a symbolic name, lowest version first
    fn versions_of(&self, symbolic_name: &str) -> Vec<Arc<FeatureDescriptor>>;

    /// Pairs of versions of `symbolic_name` that declared tolerances let coexist
    fn tolerance(&self, symbolic_name: &str) -> Tolerance;

    /// Look up a platform by name
    fn platform(&self, name: &str) -> Option<Arc<PlatformDescriptor>>;

    /// All platforms, ordered by name
    fn platforms(&self) -> Vec<Arc<PlatformDescriptor>>;

    /// Stable content hash of the catalog
    fn fingerprint(&self) -> String;

    /// Versions of `symbolic_name` that take part in a declared tolerance
    fn configured_tolerates(&self, symbolic_name: &str) -> Vec<Version> {
        self.tolerance(symbolic_name).versions()
    }

    /// Auto features, ordered by name
    fn auto_features(&self) -> Vec<Arc<FeatureDescriptor>> {
        self.select(&|fd| fd.is_auto_feature())
    }

    /// Look up `symbolic_name` at `version`
    fn feature_version(&self, symbolic_name: &str, version: &Version) -> Option<Arc<FeatureDescriptor>> {
        self.versions_of(symbolic_name)
            .into_iter()
            .find(|fd| fd.version.as_ref() == Some(version))
    }

    /// Platform family for a platform name, falling back to the name's base
    fn platform_family(&self, name: &str) -> String {
        match self.platform(name) {
            Some(platform) => platform.family.to_lowercase(),
            None => split_feature_name(name).0.to_lowercase(),
        }
    }
}

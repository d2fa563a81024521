use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use featres_version::Version;
use sha2::{Digest, Sha256};

use super::tolerance::{self, Tolerance};
use super::CatalogView;
use crate::feature::{key, FeatureDescriptor, PlatformDescriptor};

/// Ordered stack of catalog views.
///
/// Earlier layers shadow later ones: a name found in the first layer hides
/// the same name in every following layer. Typical use is a product
/// extension catalog layered over the core catalog.
#[derive(Default, Clone)]
pub struct CompositeCatalog {
    layers: Vec<Arc<dyn CatalogView>>,
}

impl CompositeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with lower precedence than the existing ones
    pub fn with_layer(mut self, layer: Arc<dyn CatalogView>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl CatalogView for CompositeCatalog {
    fn feature(&self, name: &str) -> Option<Arc<FeatureDescriptor>> {
        self.layers.iter().find_map(|layer| layer.feature(name))
    }

    fn select(&self, predicate: &dyn Fn(&FeatureDescriptor) -> bool) -> Vec<Arc<FeatureDescriptor>> {
        let mut merged: BTreeMap<String, Arc<FeatureDescriptor>> = BTreeMap::new();
        for layer in &self.layers {
            for fd in layer.select(predicate) {
                merged.entry(key(&fd.name)).or_insert(fd);
            }
        }
        merged.into_values().collect()
    }

    fn versions_of(&self, symbolic_name: &str) -> Vec<Arc<FeatureDescriptor>> {
        let mut seen = BTreeSet::new();
        let mut versions = Vec::new();
        for layer in &self.layers {
            for fd in layer.versions_of(symbolic_name) {
                if seen.insert(key(&fd.name)) {
                    versions.push(fd);
                }
            }
        }
        versions.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));
        versions
    }

    fn tolerance(&self, symbolic_name: &str) -> Tolerance {
        // Filter after merging so a shadowed declaration cannot leak through
        let declaring: Vec<Arc<FeatureDescriptor>> = self
            .select(&|_| true)
            .into_iter()
            .filter(|fd| {
                fd.dependencies
                    .iter()
                    .any(|d| !d.tolerates.is_empty() && d.symbolic_name.eq_ignore_ascii_case(symbolic_name.trim()))
            })
            .collect();
        let versions_of = |base: &str| -> Vec<Version> {
            self.versions_of(base)
                .into_iter()
                .filter_map(|fd| fd.version.clone())
                .collect()
        };
        tolerance::index(declaring.iter().map(|fd| fd.as_ref()), &versions_of)
            .remove(&key(symbolic_name))
            .unwrap_or_default()
    }

    fn platform(&self, name: &str) -> Option<Arc<PlatformDescriptor>> {
        self.layers.iter().find_map(|layer| layer.platform(name))
    }

    fn platforms(&self) -> Vec<Arc<PlatformDescriptor>> {
        let mut merged: BTreeMap<String, Arc<PlatformDescriptor>> = BTreeMap::new();
        for layer in &self.layers {
            for platform in layer.platforms() {
                merged.entry(key(&platform.name)).or_insert(platform);
            }
        }
        merged.into_values().collect()
    }

    fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for layer in &self.layers {
            hasher.update(layer.fingerprint().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::feature::Dependency;

    fn layer(features: Vec<FeatureDescriptor>) -> Arc<dyn CatalogView> {
        Arc::new(Catalog::builder().add_features(features).build().unwrap())
    }

    #[test]
    fn test_first_layer_wins() {
        let extension = layer(vec![FeatureDescriptor::new("servlet-4.0").singleton(true)]);
        let core = layer(vec![
            FeatureDescriptor::new("servlet-4.0"),
            FeatureDescriptor::new("servlet-3.1"),
        ]);
        let composite = CompositeCatalog::new().with_layer(extension).with_layer(core);

        assert_eq!(composite.len(), 2);
        assert!(composite.feature("servlet-4.0").unwrap().singleton);
        assert!(composite.feature("servlet-3.1").is_some());

        let versions: Vec<_> = composite
            .versions_of("servlet")
            .iter()
            .map(|fd| (fd.name.clone(), fd.singleton))
            .collect();
        assert_eq!(
            versions,
            vec![("servlet-3.1".to_string(), false), ("servlet-4.0".to_string(), true)]
        );
        assert_eq!(composite.select(&|_| true).len(), 2);
    }

    #[test]
    fn test_fingerprint_depends_on_layer_order() {
        let a = layer(vec![FeatureDescriptor::new("a-1.0")]);
        let b = layer(vec![FeatureDescriptor::new("b-1.0")]);

        let ab = CompositeCatalog::new().with_layer(a.clone()).with_layer(b.clone());
        let ba = CompositeCatalog::new().with_layer(b).with_layer(a);
        assert_ne!(ab.fingerprint(), ba.fingerprint());
        assert_eq!(ab.fingerprint(), ab.clone().fingerprint());
    }

    #[test]
    fn test_shadowed_tolerance_is_ignored() {
        let v = |s: &str| Version::parse(s).unwrap();
        let extension = layer(vec![
            FeatureDescriptor::new("jsp-2.3").depends_on(Dependency::on("servlet-3.1")),
            FeatureDescriptor::new("el-3.0").depends_on(Dependency::on("servlet-4.0").tolerating(&[v("5.0")])),
        ]);
        let core = layer(vec![
            FeatureDescriptor::new("jsp-2.3").depends_on(Dependency::on("servlet-3.1").tolerating(&[v("4.0")])),
            FeatureDescriptor::new("servlet-3.1"),
            FeatureDescriptor::new("servlet-4.0"),
            FeatureDescriptor::new("servlet-5.0"),
        ]);
        let composite = CompositeCatalog::new().with_layer(extension).with_layer(core);

        let servlet = composite.tolerance("servlet");
        assert!(!servlet.allows(&v("3.1"), &v("4.0")));
        assert!(servlet.allows(&v("4.0"), &v("5.0")));
        assert_eq!(composite.configured_tolerates("servlet"), vec![v("4.0"), v("5.0")]);
    }
}

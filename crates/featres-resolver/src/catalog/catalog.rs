use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use featres_version::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::tolerance::{self, Tolerance};
use super::CatalogView;
use crate::error::{Error, Result};
use crate::feature::{key, FeatureDescriptor, PlatformDescriptor};

/// Serialized form of a whole catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogManifest {
    #[serde(default)]
    pub platforms: Vec<PlatformDescriptor>,
    #[serde(default)]
    pub features: Vec<FeatureDescriptor>,
}

/// Indexed, immutable feature catalog.
///
/// Features are indexed by lowercased full name and, for concrete
/// versions, by symbolic name. The catalog is built once and shared
/// read-only between any number of concurrent resolutions.
pub struct Catalog {
    /// All descriptors keyed by lowercased full name
    features: BTreeMap<String, Arc<FeatureDescriptor>>,

    /// Concrete descriptors by lowercased symbolic name, lowest version first
    by_symbolic_name: HashMap<String, Vec<Arc<FeatureDescriptor>>>,

    /// Platforms keyed by lowercased name
    platforms: BTreeMap<String, Arc<PlatformDescriptor>>,

    /// Declared tolerances by lowercased symbolic name
    tolerances: HashMap<String, Tolerance>,

    fingerprint: String,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("features", &self.features.keys().collect::<Vec<_>>())
            .field("platforms", &self.platforms.keys().collect::<Vec<_>>())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Catalog {
    /// Create a catalog builder for fluent construction
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Build a catalog from its serialized form
    pub fn from_manifest(manifest: CatalogManifest) -> Result<Self> {
        CatalogBuilder::new()
            .add_platforms(manifest.platforms)
            .add_features(manifest.features)
            .build()
    }

    /// Parse a JSON catalog
    pub fn from_json(content: &str) -> Result<Self> {
        let manifest: CatalogManifest = serde_json::from_str(content)?;
        Self::from_manifest(manifest)
    }

    /// Load a JSON catalog from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&content)?;
        log::debug!("Loaded {} features from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Serialized form, features and platforms ordered by name
    pub fn manifest(&self) -> CatalogManifest {
        CatalogManifest {
            platforms: self.platforms.values().map(|p| (**p).clone()).collect(),
            features: self.features.values().map(|f| (**f).clone()).collect(),
        }
    }

    /// Number of descriptors
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// All descriptors ordered by name
    pub fn features(&self) -> impl Iterator<Item = &Arc<FeatureDescriptor>> {
        self.features.values()
    }
}

impl CatalogView for Catalog {
    fn feature(&self, name: &str) -> Option<Arc<FeatureDescriptor>> {
        self.features.get(&key(name)).cloned()
    }

    fn select(&self, predicate: &dyn Fn(&FeatureDescriptor) -> bool) -> Vec<Arc<FeatureDescriptor>> {
        self.features
            .values()
            .filter(|fd| predicate(fd))
            .cloned()
            .collect()
    }

    fn versions_of(&self, symbolic_name: &str) -> Vec<Arc<FeatureDescriptor>> {
        self.by_symbolic_name
            .get(&key(symbolic_name))
            .cloned()
            .unwrap_or_default()
    }

    fn tolerance(&self, symbolic_name: &str) -> Tolerance {
        self.tolerances
            .get(&key(symbolic_name))
            .cloned()
            .unwrap_or_default()
    }

    fn platform(&self, name: &str) -> Option<Arc<PlatformDescriptor>> {
        self.platforms.get(&key(name)).cloned()
    }

    fn platforms(&self) -> Vec<Arc<PlatformDescriptor>> {
        self.platforms.values().cloned().collect()
    }

    fn fingerprint(&self) -> String {
        self.fingerprint.clone()
    }
}

/// Builder for constructing a [`Catalog`]
#[derive(Default)]
pub struct CatalogBuilder {
    features: Vec<FeatureDescriptor>,
    platforms: Vec<PlatformDescriptor>,
}

impl CatalogBuilder {
    /// Create a new catalog builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature descriptor
    pub fn add_feature(mut self, feature: FeatureDescriptor) -> Self {
        self.features.push(feature);
        self
    }

    /// Add multiple feature descriptors
    pub fn add_features(mut self, features: impl IntoIterator<Item = FeatureDescriptor>) -> Self {
        self.features.extend(features);
        self
    }

    /// Add a platform
    pub fn add_platform(mut self, platform: PlatformDescriptor) -> Self {
        self.platforms.push(platform);
        self
    }

    /// Add multiple platforms
    pub fn add_platforms(mut self, platforms: impl IntoIterator<Item = PlatformDescriptor>) -> Self {
        self.platforms.extend(platforms);
        self
    }

    /// Index the descriptors and build the catalog
    pub fn build(self) -> Result<Catalog> {
        let mut features = BTreeMap::new();
        for feature in self.features {
            feature.validate()?;
            let name = key(&feature.name);
            if features.contains_key(&name) {
                return Err(Error::DuplicateFeature(feature.name));
            }
            features.insert(name, Arc::new(feature));
        }

        let mut platforms = BTreeMap::new();
        for platform in self.platforms {
            let name = key(&platform.name);
            if platforms.contains_key(&name) {
                return Err(Error::DuplicatePlatform(platform.name));
            }
            platforms.insert(name, Arc::new(platform));
        }

        // Index concrete versions by symbolic name
        let mut by_symbolic_name: HashMap<String, Vec<Arc<FeatureDescriptor>>> = HashMap::new();
        for feature in features.values().filter(|fd| !fd.versionless) {
            by_symbolic_name
                .entry(key(&feature.symbolic_name))
                .or_default()
                .push(Arc::clone(feature));
        }
        for versions in by_symbolic_name.values_mut() {
            versions.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));
        }

        // Index declared tolerances
        let tolerances = tolerance::index(features.values().map(|fd| fd.as_ref()), &|base: &str| -> Vec<Version> {
            by_symbolic_name
                .get(&key(base))
                .map(|versions| versions.iter().filter_map(|fd| fd.version.clone()).collect())
                .unwrap_or_default()
        });

        let fingerprint = fingerprint_of(&features, &platforms)?;

        Ok(Catalog {
            features,
            by_symbolic_name,
            platforms,
            tolerances,
            fingerprint,
        })
    }
}

/// SHA-256 over the serialized, name-ordered catalog content
fn fingerprint_of(
    features: &BTreeMap<String, Arc<FeatureDescriptor>>,
    platforms: &BTreeMap<String, Arc<PlatformDescriptor>>,
) -> Result<String> {
    let mut hasher = Sha256::new();
    for platform in platforms.values() {
        hasher.update(serde_json::to_vec(platform.as_ref())?);
        hasher.update(b"\n");
    }
    for feature in features.values() {
        hasher.update(serde_json::to_vec(feature.as_ref())?);
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}

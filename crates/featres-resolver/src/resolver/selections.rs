use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use featres_version::split_feature_name;

use super::result::Chain;
use crate::feature::{key, Dependency, FeatureDescriptor};

/// A feature chosen for the closure
#[derive(Debug, Clone)]
pub(crate) struct Selected {
    pub descriptor: Arc<FeatureDescriptor>,
    pub chain: Chain,
    /// Named directly as a kernel feature, which exempts it from conflict
    /// checks. Features pulled in through a kernel feature's dependencies
    /// are not marked and are still checked.
    pub kernel: bool,
}

/// The growing closure.
///
/// Only ever grows: a feature once selected stays selected for the rest
/// of the resolution.
#[derive(Debug, Default)]
pub(crate) struct Selections {
    /// Selected features keyed by lowercased name
    selected: BTreeMap<String, Selected>,

    /// Selected feature keys by lowercased symbolic name
    by_symbolic_name: BTreeMap<String, BTreeSet<String>>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature; returns false when it was already selected
    pub fn select(&mut self, descriptor: Arc<FeatureDescriptor>, chain: Chain, kernel: bool) -> bool {
        let name = key(&descriptor.name);
        if self.selected.contains_key(&name) {
            return false;
        }

        log::debug!("Selected {} via {}", descriptor.name, chain);

        self.by_symbolic_name
            .entry(key(&descriptor.symbolic_name))
            .or_default()
            .insert(name.clone());
        self.selected.insert(
            name,
            Selected {
                descriptor,
                chain,
                kernel,
            },
        );
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.selected.contains_key(&key(name))
    }

    pub fn get(&self, name: &str) -> Option<&Selected> {
        self.selected.get(&key(name))
    }

    /// Selected versions of a symbolic name
    pub fn versions_of(&self, symbolic_name: &str) -> Vec<&Selected> {
        self.by_symbolic_name
            .get(&key(symbolic_name))
            .map(|names| names.iter().filter_map(|n| self.selected.get(n)).collect())
            .unwrap_or_default()
    }

    /// First selected feature satisfying a dependency edge
    pub fn satisfying(&self, dependency: &Dependency) -> Option<&Selected> {
        self.versions_of(&dependency.symbolic_name)
            .into_iter()
            .find(|s| dependency.accepts(s.descriptor.version.as_ref()))
    }

    /// Presence test for auto-feature conditions: a full name must be
    /// selected itself, a bare symbolic name matches any selected version
    pub fn is_present(&self, member: &str) -> bool {
        if self.contains(member) {
            return true;
        }
        let (base, version) = split_feature_name(member.trim());
        version.is_none() && self.by_symbolic_name.contains_key(&key(base))
    }

    /// Selected features, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &Selected> {
        self.selected.values()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }
}

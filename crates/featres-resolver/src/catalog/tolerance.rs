use std::collections::{BTreeSet, HashMap};

use featres_version::{Version, VersionConstraint};

use crate::feature::{key, FeatureDescriptor};

/// Versions of one symbolic name that declared tolerances let coexist.
///
/// An edge on `servlet-3.1` tolerating `4.0` makes 3.1 and 4.0 tolerate
/// each other. A ranged edge makes every catalog version inside the range
/// tolerate each listed version. The relation is symmetric and is not
/// transitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tolerance {
    pairs: BTreeSet<(Version, Version)>,
}

impl Tolerance {
    fn insert(&mut self, a: &Version, b: &Version) {
        if a != b {
            self.pairs.insert((a.clone(), b.clone()));
            self.pairs.insert((b.clone(), a.clone()));
        }
    }

    /// Whether `a` and `b` may be active together
    pub fn allows(&self, a: &Version, b: &Version) -> bool {
        a == b || self.pairs.contains(&(a.clone(), b.clone()))
    }

    /// Whether every two of `versions` tolerate each other
    pub fn allows_all<'a, I>(&self, versions: I) -> bool
    where
        I: IntoIterator<Item = &'a Version>,
    {
        let versions: Vec<&Version> = versions.into_iter().collect();
        versions
            .iter()
            .enumerate()
            .all(|(i, a)| versions[i + 1..].iter().all(|b| self.allows(a, b)))
    }

    /// Every version taking part in some tolerated pair, ascending
    pub fn versions(&self) -> Vec<Version> {
        let versions: BTreeSet<&Version> = self.pairs.iter().map(|(a, _)| a).collect();
        versions.into_iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Build the tolerance relation of every symbolic name targeted by a
/// tolerating edge of `features`.
///
/// `versions_of` lists the catalog versions of a symbolic name, used to
/// expand ranged edges.
pub(crate) fn index<'a, I>(features: I, versions_of: &dyn Fn(&str) -> Vec<Version>) -> HashMap<String, Tolerance>
where
    I: IntoIterator<Item = &'a FeatureDescriptor>,
{
    let mut index: HashMap<String, Tolerance> = HashMap::new();
    for feature in features {
        for dep in feature.dependencies.iter().filter(|d| !d.tolerates.is_empty()) {
            let anchors = match &dep.constraint {
                VersionConstraint::Exact(v) => vec![v.clone()],
                constraint => versions_of(&dep.symbolic_name)
                    .into_iter()
                    .filter(|v| constraint.matches(v))
                    .collect(),
            };
            let tolerance = index.entry(key(&dep.symbolic_name)).or_default();
            for anchor in &anchors {
                for tolerated in &dep.tolerates {
                    tolerance.insert(anchor, tolerated);
                }
            }
        }
    }
    index
}

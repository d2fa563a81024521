use std::collections::BTreeSet;
use std::fmt;

use featres_version::{split_feature_name, Version, VersionConstraint};
use serde::{Deserialize, Serialize};

use super::ProcessType;
use crate::error::Error;

/// A dependency edge from one feature to another symbolic name.
///
/// `servlet-3.1` with tolerates `4.0` accepts either version and prefers
/// 3.1; `servlet` with a range accepts every catalog version inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DependencyManifest", into = "DependencyManifest")]
pub struct Dependency {
    pub symbolic_name: String,
    pub constraint: VersionConstraint,
    pub tolerates: Vec<Version>,
    /// Process types this edge applies to, empty means all
    pub process_types: Vec<ProcessType>,
}

impl Dependency {
    /// Depend on a feature by name; `servlet-3.1` is exact, `servlet` accepts any version
    pub fn on(name: &str) -> Self {
        let (base, version) = split_feature_name(name.trim());
        Self {
            symbolic_name: base.to_string(),
            constraint: version.map(VersionConstraint::Exact).unwrap_or(VersionConstraint::Any),
            tolerates: Vec::new(),
            process_types: Vec::new(),
        }
    }

    /// Depend on any version of `symbolic_name` satisfying `constraint`
    pub fn with_constraint(symbolic_name: &str, constraint: VersionConstraint) -> Self {
        Self {
            symbolic_name: symbolic_name.trim().to_string(),
            constraint,
            tolerates: Vec::new(),
            process_types: Vec::new(),
        }
    }

    /// Add tolerated alternative versions
    pub fn tolerating(mut self, versions: &[Version]) -> Self {
        for version in versions {
            if !self.tolerates.contains(version) {
                self.tolerates.push(version.clone());
            }
        }
        self
    }

    /// Restrict the edge to a process type
    pub fn only_for(mut self, process_type: ProcessType) -> Self {
        if !self.process_types.contains(&process_type) {
            self.process_types.push(process_type);
        }
        self
    }

    /// Check whether the edge applies to any of the given process types
    pub fn applies_to(&self, process_types: &BTreeSet<ProcessType>) -> bool {
        self.process_types.is_empty() || self.process_types.iter().any(|p| process_types.contains(p))
    }

    /// Check whether a concrete version satisfies the edge, tolerates included
    pub fn accepts(&self, version: Option<&Version>) -> bool {
        match version {
            Some(v) => self.constraint.matches(v) || self.tolerates.contains(v),
            None => matches!(self.constraint, VersionConstraint::Any),
        }
    }

    /// The version this edge prefers, when it names one
    pub fn preferred_version(&self) -> Option<&Version> {
        self.constraint.exact()
    }

    /// Full name of the preferred feature (`servlet-3.1`)
    pub fn preferred_name(&self) -> Option<String> {
        self.preferred_version()
            .map(|v| format!("{}-{}", self.symbolic_name, v))
    }

    /// Full names of every tolerated alternative
    pub fn tolerated_names(&self) -> Vec<String> {
        self.tolerates
            .iter()
            .map(|v| format!("{}-{}", self.symbolic_name, v))
            .collect()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            VersionConstraint::Exact(v) => write!(f, "{}-{}", self.symbolic_name, v)?,
            VersionConstraint::Any => write!(f, "{}", self.symbolic_name)?,
            VersionConstraint::Range(r) => write!(f, "{} {}", self.symbolic_name, r)?,
        }
        if !self.tolerates.is_empty() {
            let tolerated: Vec<_> = self.tolerates.iter().map(|v| v.to_string()).collect();
            write!(f, " (tolerates {})", tolerated.join(", "))?;
        }
        Ok(())
    }
}

/// Serialized form of a dependency edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyManifest {
    pub feature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerates: Vec<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub process_types: Vec<ProcessType>,
}

impl TryFrom<DependencyManifest> for Dependency {
    type Error = Error;

    fn try_from(manifest: DependencyManifest) -> Result<Self, Self::Error> {
        let mut dependency = match manifest.range.as_deref() {
            None => Dependency::on(&manifest.feature),
            Some(range) => {
                if split_feature_name(&manifest.feature).1.is_some() {
                    return Err(Error::InvalidFeature {
                        name: manifest.feature,
                        reason: "a ranged dependency must name the symbolic name without a version"
                            .to_string(),
                    });
                }
                Dependency::with_constraint(&manifest.feature, VersionConstraint::parse(range)?)
            }
        };

        if dependency.symbolic_name.is_empty() {
            return Err(Error::InvalidFeature {
                name: manifest.feature,
                reason: "dependency names no feature".to_string(),
            });
        }

        dependency = dependency.tolerating(&manifest.tolerates);
        dependency.process_types = manifest.process_types;
        Ok(dependency)
    }
}

impl From<Dependency> for DependencyManifest {
    fn from(dependency: Dependency) -> Self {
        let (feature, range) = match &dependency.constraint {
            VersionConstraint::Exact(v) => (format!("{}-{}", dependency.symbolic_name, v), None),
            VersionConstraint::Any => (dependency.symbolic_name.clone(), None),
            VersionConstraint::Range(r) => (dependency.symbolic_name.clone(), Some(r.to_string())),
        };
        DependencyManifest {
            feature,
            range,
            tolerates: dependency.tolerates,
            process_types: dependency.process_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_on_exact_and_any() {
        let exact = Dependency::on("servlet-3.1");
        assert_eq!(exact.symbolic_name, "servlet");
        assert_eq!(exact.preferred_version(), Some(&v("3.1")));
        assert_eq!(exact.preferred_name().as_deref(), Some("servlet-3.1"));

        let any = Dependency::on("servlet");
        assert_eq!(any.constraint, VersionConstraint::Any);
        assert!(any.preferred_version().is_none());
    }

    #[test]
    fn test_accepts_tolerates() {
        let dep = Dependency::on("servlet-3.1").tolerating(&[v("4.0")]);
        assert!(dep.accepts(Some(&v("3.1"))));
        assert!(dep.accepts(Some(&v("4.0"))));
        assert!(!dep.accepts(Some(&v("5.0"))));
        assert!(!dep.accepts(None));
        assert_eq!(dep.tolerated_names(), vec!["servlet-4.0".to_string()]);
    }

    #[test]
    fn test_accepts_range() {
        let dep = Dependency::with_constraint("mpConfig", VersionConstraint::parse("[2.0,3.0)").unwrap());
        assert!(dep.accepts(Some(&v("2.0"))));
        assert!(!dep.accepts(Some(&v("3.0"))));
    }

    #[test]
    fn test_applies_to() {
        let server: BTreeSet<_> = [ProcessType::Server].into_iter().collect();
        let client: BTreeSet<_> = [ProcessType::Client].into_iter().collect();

        let dep = Dependency::on("jaxrs-2.0").only_for(ProcessType::Client);
        assert!(!dep.applies_to(&server));
        assert!(dep.applies_to(&client));
        assert!(Dependency::on("jaxrs-2.0").applies_to(&server));
    }

    #[test]
    fn test_manifest_forms() {
        let dep: Dependency = serde_json::from_str(
            r#"{"feature": "jta-1.1", "tolerates": ["1.2"], "process_types": ["server"]}"#,
        )
        .unwrap();
        assert_eq!(dep.to_string(), "jta-1.1 (tolerates 1.2)");
        assert_eq!(dep.process_types, vec![ProcessType::Server]);

        let ranged: Dependency =
            serde_json::from_str(r#"{"feature": "mpConfig", "range": "[1.0,2.0)"}"#).unwrap();
        assert_eq!(ranged.to_string(), "mpConfig [1.0,2.0)");

        let json = serde_json::to_value(&ranged).unwrap();
        assert_eq!(json["feature"], "mpConfig");
        assert_eq!(json["range"], "[1.0,2.0)");

        assert!(serde_json::from_str::<Dependency>(r#"{"feature": "jta-1.1", "range": "[1,2)"}"#).is_err());
        assert!(serde_json::from_str::<Dependency>(r#"{"feature": "mpConfig", "range": "nope"}"#).is_err());
    }
}

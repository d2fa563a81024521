use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use featres_version::{split_feature_name, Version};
use serde::{Deserialize, Serialize};

use super::Dependency;
use crate::error::Error;

/// Whether a feature may be requested directly as a root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// The execution context a resolution is performed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    Server,
    Client,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessType::Server => "server",
            ProcessType::Client => "client",
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" => Ok(ProcessType::Server),
            "client" => Ok(ProcessType::Client),
            other => Err(Error::Request(format!(
                "unknown process type \"{}\", expected server or client",
                other
            ))),
        }
    }
}

/// Activation condition of an auto feature.
///
/// Every group must have at least one member present in the closure.
/// A member is either a concrete feature name (`servlet-4.0`) or a bare
/// symbolic name matching any version (`servlet`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AutoCondition {
    pub all_of: Vec<Vec<String>>,
}

impl AutoCondition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require one of the given features
    pub fn requires_any<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all_of.push(alternatives.into_iter().map(Into::into).collect());
        self
    }

    /// Evaluate the condition against a presence test
    pub fn is_satisfied<F>(&self, present: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        !self.all_of.is_empty()
            && self
                .all_of
                .iter()
                .all(|group| group.iter().any(|member| present(member)))
    }
}

/// Serialized form of a feature descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub versionless: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub process_types: Vec<ProcessType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<AutoCondition>,
}

/// One installable capability version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FeatureManifest", into = "FeatureManifest")]
pub struct FeatureDescriptor {
    /// Full name as spelled in the catalog (`servlet-3.1`)
    pub name: String,
    /// Version-independent identity (`servlet`)
    pub symbolic_name: String,
    /// `None` for versionless aliases and unversioned features
    pub version: Option<Version>,
    pub visibility: Visibility,
    pub singleton: bool,
    pub versionless: bool,
    /// Ordered platform memberships
    pub platforms: Vec<String>,
    /// Process types able to run this feature, empty means all
    pub process_types: Vec<ProcessType>,
    pub dependencies: Vec<Dependency>,
    pub auto_condition: Option<AutoCondition>,
}

impl FeatureDescriptor {
    /// Create a public, non-singleton descriptor from its full name
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        let (base, version) = split_feature_name(name);
        Self {
            name: name.to_string(),
            symbolic_name: base.to_string(),
            version,
            visibility: Visibility::Public,
            singleton: false,
            versionless: false,
            platforms: Vec::new(),
            process_types: Vec::new(),
            dependencies: Vec::new(),
            auto_condition: None,
        }
    }

    /// Create a versionless alias resolved through platforms
    pub fn versionless(name: &str) -> Self {
        let name = name.trim();
        Self {
            symbolic_name: name.to_string(),
            version: None,
            versionless: true,
            ..Self::new(name)
        }
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.platforms.push(platform.to_string());
        self
    }

    pub fn process_type(mut self, process_type: ProcessType) -> Self {
        if !self.process_types.contains(&process_type) {
            self.process_types.push(process_type);
        }
        self
    }

    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn auto_when(mut self, condition: AutoCondition) -> Self {
        self.auto_condition = Some(condition);
        self
    }

    pub fn is_auto_feature(&self) -> bool {
        self.auto_condition.is_some()
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Check whether this feature may run in any of the given process types
    pub fn supports_any(&self, process_types: &BTreeSet<ProcessType>) -> bool {
        self.process_types.is_empty() || self.process_types.iter().any(|p| process_types.contains(p))
    }

    /// Check platform membership (case-insensitive)
    pub fn belongs_to(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| p.eq_ignore_ascii_case(platform))
    }

    /// Check that the descriptor is internally consistent
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: &str| Error::InvalidFeature {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.name.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(invalid("name must not contain whitespace or commas"));
        }
        if self.versionless && (self.version.is_some() || split_feature_name(&self.name).1.is_some()) {
            return Err(invalid("a versionless feature must not carry a version suffix"));
        }
        if self.versionless && self.is_auto_feature() {
            return Err(invalid("a versionless feature cannot be an auto feature"));
        }
        Ok(())
    }
}

impl TryFrom<FeatureManifest> for FeatureDescriptor {
    type Error = Error;

    fn try_from(manifest: FeatureManifest) -> Result<Self, Self::Error> {
        let base = if manifest.versionless {
            FeatureDescriptor::versionless(&manifest.name)
        } else {
            FeatureDescriptor::new(&manifest.name)
        };

        let descriptor = FeatureDescriptor {
            visibility: manifest.visibility,
            singleton: manifest.singleton,
            platforms: manifest.platforms,
            process_types: manifest.process_types,
            dependencies: manifest.dependencies,
            auto_condition: manifest.auto,
            ..base
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

impl From<FeatureDescriptor> for FeatureManifest {
    fn from(descriptor: FeatureDescriptor) -> Self {
        FeatureManifest {
            name: descriptor.name,
            visibility: descriptor.visibility,
            singleton: descriptor.singleton,
            versionless: descriptor.versionless,
            platforms: descriptor.platforms,
            process_types: descriptor.process_types,
            dependencies: descriptor.dependencies,
            auto: descriptor.auto_condition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_splits_name() {
        let fd = FeatureDescriptor::new("servlet-3.1");
        assert_eq!(fd.symbolic_name, "servlet");
        assert_eq!(fd.version, Some(Version::parse("3.1").unwrap()));
        assert!(!fd.versionless);
        assert!(fd.is_public());
    }

    #[test]
    fn test_versionless() {
        let fd = FeatureDescriptor::versionless("servlet");
        assert_eq!(fd.symbolic_name, "servlet");
        assert!(fd.version.is_none());
        assert!(fd.versionless);
        assert!(fd.validate().is_ok());

        let bad = FeatureDescriptor {
            versionless: true,
            ..FeatureDescriptor::new("servlet-3.1")
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_supports_process_types() {
        let server: BTreeSet<_> = [ProcessType::Server].into_iter().collect();
        let client: BTreeSet<_> = [ProcessType::Client].into_iter().collect();

        let any = FeatureDescriptor::new("jndi-1.0");
        assert!(any.supports_any(&server));
        assert!(any.supports_any(&client));

        let server_only = FeatureDescriptor::new("webCache-1.0").process_type(ProcessType::Server);
        assert!(server_only.supports_any(&server));
        assert!(!server_only.supports_any(&client));
    }

    #[test]
    fn test_auto_condition() {
        let condition = AutoCondition::new()
            .requires_any(["servlet-3.1", "servlet-4.0"])
            .requires_any(["jsonp"]);

        let both = ["servlet-4.0", "jsonp"];
        assert!(condition.is_satisfied(|n: &str| both.contains(&n)));

        let servlet_only = ["servlet-4.0"];
        assert!(!condition.is_satisfied(|n: &str| servlet_only.contains(&n)));

        let jsonp_only = ["jsonp"];
        assert!(!condition.is_satisfied(|n: &str| jsonp_only.contains(&n)));
        assert!(!AutoCondition::new().is_satisfied(|_| true));
    }

    #[test]
    fn test_manifest_round_trip() {
        let json = r#"{
            "name": "jsp-2.3",
            "singleton": true,
            "platforms": ["javaee-7.0"],
            "dependencies": [{"feature": "servlet-3.1", "tolerates": ["4.0"]}]
        }"#;
        let fd: FeatureDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(fd.symbolic_name, "jsp");
        assert!(fd.singleton);
        assert_eq!(fd.visibility, Visibility::Public);
        assert_eq!(fd.dependencies.len(), 1);
        assert!(fd.belongs_to("JavaEE-7.0"));

        let back = serde_json::to_string(&fd).unwrap();
        let again: FeatureDescriptor = serde_json::from_str(&back).unwrap();
        assert_eq!(again, fd);
    }

    #[test]
    fn test_manifest_rejects_invalid() {
        let json = r#"{"name": "bad name-1.0"}"#;
        assert!(serde_json::from_str::<FeatureDescriptor>(json).is_err());

        let json = r#"{"name": "servlet-3.1", "versionless": true}"#;
        assert!(serde_json::from_str::<FeatureDescriptor>(json).is_err());
    }

    #[test]
    fn test_process_type_from_str() {
        assert_eq!("Server".parse::<ProcessType>().unwrap(), ProcessType::Server);
        assert_eq!("client".parse::<ProcessType>().unwrap(), ProcessType::Client);
        assert!("daemon".parse::<ProcessType>().is_err());
    }
}

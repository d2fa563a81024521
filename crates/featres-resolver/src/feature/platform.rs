use featres_version::{split_feature_name, Version};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Serialized form of a platform descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusive_with: Vec<String>,
}

/// A versioned grouping (`javaee-8.0`, `MicroProfile-6.1`) that ties
/// versionless features to one generation of concrete versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PlatformManifest", into = "PlatformManifest")]
pub struct PlatformDescriptor {
    pub name: String,
    pub family: String,
    pub version: Version,
    /// Other families that may not be combined with this one
    pub exclusive_with: Vec<String>,
}

impl PlatformDescriptor {
    /// Create a platform from a `<family>-<version>` name
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();
        let (family, version) = split_feature_name(name);
        let version = version.ok_or_else(|| Error::InvalidPlatform {
            name: name.to_string(),
            reason: "expected <family>-<version>".to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            family: family.to_string(),
            version,
            exclusive_with: Vec::new(),
        })
    }

    /// Declare a family this platform cannot be combined with
    pub fn exclusive_with(mut self, family: &str) -> Self {
        self.exclusive_with.push(family.to_string());
        self
    }

    pub fn same_family(&self, other: &PlatformDescriptor) -> bool {
        self.family.eq_ignore_ascii_case(&other.family)
    }

    /// Two platforms are mutually exclusive when they are different
    /// generations of one family, or when either excludes the other's family.
    pub fn conflicts_with(&self, other: &PlatformDescriptor) -> bool {
        if self.same_family(other) {
            return self.version != other.version;
        }
        let excludes = |a: &PlatformDescriptor, b: &PlatformDescriptor| {
            a.exclusive_with.iter().any(|f| f.eq_ignore_ascii_case(&b.family))
        };
        excludes(self, other) || excludes(other, self)
    }
}

impl TryFrom<PlatformManifest> for PlatformDescriptor {
    type Error = Error;

    fn try_from(manifest: PlatformManifest) -> Result<Self, Self::Error> {
        let mut platform = PlatformDescriptor::new(&manifest.name)?;
        platform.exclusive_with = manifest.exclusive_with;
        Ok(platform)
    }
}

impl From<PlatformDescriptor> for PlatformManifest {
    fn from(platform: PlatformDescriptor) -> Self {
        PlatformManifest {
            name: platform.name,
            exclusive_with: platform.exclusive_with,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let p = PlatformDescriptor::new("MicroProfile-6.1").unwrap();
        assert_eq!(p.family, "MicroProfile");
        assert_eq!(p.version, Version::parse("6.1").unwrap());
        assert!(PlatformDescriptor::new("javaee").is_err());
    }

    #[test]
    fn test_same_family_conflicts() {
        let ee7 = PlatformDescriptor::new("javaee-7.0").unwrap();
        let ee8 = PlatformDescriptor::new("javaee-8.0").unwrap();
        let ee7_again = PlatformDescriptor::new("JavaEE-7").unwrap();

        assert!(ee7.conflicts_with(&ee8));
        assert!(!ee7.conflicts_with(&ee7_again));
    }

    #[test]
    fn test_exclusive_families() {
        let ee8 = PlatformDescriptor::new("javaee-8.0").unwrap().exclusive_with("jakartaee");
        let jakarta9 = PlatformDescriptor::new("jakartaee-9.1").unwrap();
        let mp4 = PlatformDescriptor::new("microProfile-4.0").unwrap();

        assert!(ee8.conflicts_with(&jakarta9));
        assert!(jakarta9.conflicts_with(&ee8));
        assert!(!ee8.conflicts_with(&mp4));
    }
}

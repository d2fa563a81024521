//! Version constraints carried by dependency edges

mod bound;
mod range;

pub use bound::Bound;
pub use range::VersionRange;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Version, VersionError};

/// The version requirement of a dependency edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Exactly this version
    Exact(Version),
    /// Any version inside the interval
    Range(VersionRange),
    /// Any version at all
    Any,
}

impl VersionConstraint {
    /// Parse `*`, an interval (`[3.0,5.0)`) or an exact version (`3.1`)
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(VersionConstraint::Any);
        }
        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            return Ok(VersionConstraint::Range(VersionRange::parse(trimmed)?));
        }
        Ok(VersionConstraint::Exact(Version::parse(trimmed)?))
    }

    /// Check whether a version satisfies the constraint
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Exact(exact) => exact == version,
            VersionConstraint::Range(range) => range.contains(version),
            VersionConstraint::Any => true,
        }
    }

    /// The exact version, if this is an exact constraint
    pub fn exact(&self) -> Option<&Version> {
        match self {
            VersionConstraint::Exact(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, VersionConstraint::Exact(_))
    }
}

impl Default for VersionConstraint {
    fn default() -> Self {
        VersionConstraint::Any
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionConstraint::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Exact(v) => write!(f, "{}", v),
            VersionConstraint::Range(r) => write!(f, "{}", r),
            VersionConstraint::Any => f.write_str("*"),
        }
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionConstraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        VersionConstraint::parse(&raw).map_err(serde::de::Error::custom)
    }
}

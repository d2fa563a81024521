use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::VersionError;

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(r"^\d+(\.\d+)*$").unwrap();
}

/// A dotted numeric version such as `3.1` or `1.0.2`.
///
/// Ordering and equality ignore trailing zero components, the original
/// spelling is kept for display.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
    pretty: String,
}

impl Version {
    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if !VERSION_REGEX.is_match(trimmed) {
            return Err(VersionError::InvalidVersion(input.to_string()));
        }

        let parts = trimmed
            .split('.')
            .map(|p| p.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError::InvalidVersion(input.to_string()))?;

        Ok(Self {
            parts,
            pretty: trimmed.to_string(),
        })
    }

    /// Build a version from numeric components
    pub fn from_parts(parts: &[u64]) -> Self {
        let parts = if parts.is_empty() { vec![0] } else { parts.to_vec() };
        let pretty = parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Self { parts, pretty }
    }

    /// Numeric components as written
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// Major component
    pub fn major(&self) -> u64 {
        self.parts[0]
    }

    /// Original spelling
    pub fn as_str(&self) -> &str {
        &self.pretty
    }

    /// Components with trailing zeros removed, used for ordering and hashing
    fn significant(&self) -> &[u64] {
        let mut end = self.parts.len();
        while end > 0 && self.parts[end - 1] == 0 {
            end -= 1;
        }
        &self.parts[..end]
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.parts.len().max(other.parts.len());

        for i in 0..max_len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);

            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }

        Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pretty)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Split a feature or platform name into its base and version suffix.
///
/// The suffix after the last `-` is treated as a version only when it
/// parses as one: `servlet-3.1` gives `("servlet", Some(3.1))`, while
/// `servlet` and `jakarta-ee` have no version.
pub fn split_feature_name(name: &str) -> (&str, Option<Version>) {
    if let Some(idx) = name.rfind('-') {
        let (base, suffix) = (&name[..idx], &name[idx + 1..]);
        if !base.is_empty() {
            if let Ok(version) = Version::parse(suffix) {
                return (base, Some(version));
            }
        }
    }
    (name, None)
}

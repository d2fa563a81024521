//! Interval version ranges in OSGi notation

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use super::Bound;
use crate::{Version, VersionError};

lazy_static! {
    static ref RANGE_REGEX: Regex =
        Regex::new(r"^([\[(])\s*([0-9][0-9.]*)?\s*,\s*([0-9][0-9.]*)?\s*([\])])$").unwrap();
}

/// A version interval such as `[3.0,5.0)`.
///
/// A bare version (`3.0`) means "at least 3.0", following OSGi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Bound,
    upper: Bound,
}

impl VersionRange {
    /// Create a range from two bounds
    pub fn new(lower: Bound, upper: Bound) -> Result<Self, VersionError> {
        let empty = match (lower.version(), upper.version()) {
            (Some(lo), Some(hi)) => {
                lo > hi || (lo == hi && !(lower.is_inclusive() && upper.is_inclusive()))
            }
            _ => false,
        };

        let range = Self { lower, upper };
        if empty {
            return Err(VersionError::InvalidRange {
                range: range.to_string(),
                reason: "lower bound is above upper bound".to_string(),
            });
        }
        Ok(range)
    }

    /// Everything from `version` upwards
    pub fn at_least(version: Version) -> Self {
        Self {
            lower: Bound::new(version, true),
            upper: Bound::positive_infinity(),
        }
    }

    /// Exactly one version
    pub fn exactly(version: Version) -> Self {
        Self {
            lower: Bound::new(version.clone(), true),
            upper: Bound::new(version, true),
        }
    }

    /// Parse `[a,b)`, `(a,b]`, `[a,)` or a bare version
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();

        if let Ok(version) = Version::parse(trimmed) {
            return Ok(Self::at_least(version));
        }

        let caps = RANGE_REGEX
            .captures(trimmed)
            .ok_or_else(|| VersionError::InvalidRange {
                range: input.to_string(),
                reason: "expected [low,high) notation".to_string(),
            })?;

        let lower_inclusive = &caps[1] == "[";
        let upper_inclusive = &caps[4] == "]";

        let lower = match caps.get(2) {
            Some(m) => Bound::new(Version::parse(m.as_str())?, lower_inclusive),
            None => Bound::zero(),
        };
        let upper = match caps.get(3) {
            Some(m) => Bound::new(Version::parse(m.as_str())?, upper_inclusive),
            None => Bound::positive_infinity(),
        };

        Self::new(lower, upper).map_err(|_| VersionError::InvalidRange {
            range: input.to_string(),
            reason: "range is empty".to_string(),
        })
    }

    pub fn lower_bound(&self) -> &Bound {
        &self.lower
    }

    pub fn upper_bound(&self) -> &Bound {
        &self.upper
    }

    /// Check whether a version lies inside the range
    pub fn contains(&self, version: &Version) -> bool {
        self.lower.admits_from_below(version) && self.upper.admits_from_above(version)
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.lower.is_inclusive() { '[' } else { '(' };
        let close = if self.upper.is_inclusive() { ']' } else { ')' };
        let lower = self.lower.version().map(|v| v.to_string()).unwrap_or_default();
        let upper = self.upper.version().map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}{},{}{}", open, lower, upper, close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_half_open_range() {
        let range = VersionRange::parse("[3.0,5.0)").unwrap();
        assert!(range.contains(&v("3.0")));
        assert!(range.contains(&v("4.1")));
        assert!(!range.contains(&v("5.0")));
        assert!(!range.contains(&v("2.9")));
    }

    #[test]
    fn test_exclusive_lower() {
        let range = VersionRange::parse("(3.0,4.0]").unwrap();
        assert!(!range.contains(&v("3.0")));
        assert!(range.contains(&v("3.1")));
        assert!(range.contains(&v("4")));
    }

    #[test]
    fn test_open_upper() {
        let range = VersionRange::parse("[2.0,)").unwrap();
        assert!(range.contains(&v("2.0")));
        assert!(range.contains(&v("99")));
        assert!(range.upper_bound().is_positive_infinity());
    }

    #[test]
    fn test_bare_version_is_minimum() {
        let range = VersionRange::parse("3.1").unwrap();
        assert!(!range.contains(&v("3.0")));
        assert!(range.contains(&v("3.1")));
        assert!(range.contains(&v("6")));
    }

    #[test]
    fn test_exactly() {
        let range = VersionRange::exactly(v("2.3"));
        assert!(range.contains(&v("2.3.0")));
        assert!(!range.contains(&v("2.4")));
        assert_eq!(range.to_string(), "[2.3,2.3]");
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(VersionRange::parse("[5.0,3.0)").is_err());
        assert!(VersionRange::parse("[3.0,3.0)").is_err());
        assert!(VersionRange::parse("3.0,4.0").is_err());
        assert!(VersionRange::parse("[a,b]").is_err());
        assert!(VersionRange::parse("").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let range = VersionRange::parse("[ 1.0 , 2.0 )").unwrap();
        assert_eq!(range.to_string(), "[1.0,2.0)");
        assert_eq!(VersionRange::parse(&range.to_string()).unwrap(), range);
    }

    #[test]
    fn test_bounds() {
        let range = VersionRange::parse("[,2.0)").unwrap();
        assert!(range.lower_bound().is_zero());
        assert_eq!(range.upper_bound().version(), Some(&v("2.0")));
        assert!(!range.upper_bound().is_inclusive());
    }
}

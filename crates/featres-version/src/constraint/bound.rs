use std::cmp::Ordering;

use crate::Version;

/// One end of a version interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    version: Option<Version>,
    inclusive: bool,
}

impl Bound {
    /// A finite bound
    pub fn new(version: Version, inclusive: bool) -> Self {
        Self {
            version: Some(version),
            inclusive,
        }
    }

    /// Lowest possible bound (`0`, inclusive)
    pub fn zero() -> Self {
        Self::new(Version::from_parts(&[0]), true)
    }

    /// Unbounded upper end
    pub fn positive_infinity() -> Self {
        Self {
            version: None,
            inclusive: false,
        }
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn is_zero(&self) -> bool {
        matches!(&self.version, Some(v) if v.parts().iter().all(|p| *p == 0)) && self.inclusive
    }

    pub fn is_positive_infinity(&self) -> bool {
        self.version.is_none()
    }

    /// Check that `version` is on the permitted side of this bound when used as a lower bound
    pub(crate) fn admits_from_below(&self, version: &Version) -> bool {
        match &self.version {
            None => false,
            Some(bound) => match version.cmp(bound) {
                Ordering::Greater => true,
                Ordering::Equal => self.inclusive,
                Ordering::Less => false,
            },
        }
    }

    /// Check that `version` is on the permitted side of this bound when used as an upper bound
    pub(crate) fn admits_from_above(&self, version: &Version) -> bool {
        match &self.version {
            None => true,
            Some(bound) => match version.cmp(bound) {
                Ordering::Less => true,
                Ordering::Equal => self.inclusive,
                Ordering::Greater => false,
            },
        }
    }
}

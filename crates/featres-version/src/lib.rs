//! Version handling for feature resolution.
//!
//! Feature and platform versions are dotted numeric sequences (`3.1`,
//! `6.1`, `1.0.2`). Trailing zero components are insignificant, so `4.0`
//! and `4` compare equal.
//!
//! Dependency edges constrain versions with a [`VersionConstraint`]:
//! an exact version, an interval such as `[3.0,5.0)`, or `*` for any.

mod constraint;
mod version;

pub use constraint::{Bound, VersionConstraint, VersionRange};
pub use version::{split_feature_name, Version};

use thiserror::Error;

/// Errors raised while parsing versions and constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version \"{0}\", expected dotted numbers such as 1.0")]
    InvalidVersion(String),

    #[error("Invalid version range \"{range}\": {reason}")]
    InvalidRange { range: String, reason: String },
}

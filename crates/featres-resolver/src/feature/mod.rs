// Feature model
//
// Descriptors for installable capability versions, their dependency
// edges, auto-activation conditions and the platforms that group them.

mod dependency;
mod descriptor;
mod platform;

pub use dependency::Dependency;
pub use descriptor::{AutoCondition, FeatureDescriptor, FeatureManifest, ProcessType, Visibility};
pub use platform::{PlatformDescriptor, PlatformManifest};

/// Lowercased lookup key for feature and platform names
pub(crate) fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

//! Feature resolution engine.
//!
//! Given a set of requested features, each with declared dependencies,
//! version alternatives, platform affinities and singleton constraints,
//! compute the transitively closed, conflict-free set of concrete feature
//! versions to activate for a process type and an ordered platform
//! preference.
//!
//! # Example
//!
//! ```
//! use featres_resolver::{Catalog, FeatureDescriptor, Dependency, ResolutionRequest, Resolver};
//!
//! let catalog = Catalog::builder()
//!     .add_feature(FeatureDescriptor::new("servlet-3.1").singleton(true))
//!     .add_feature(FeatureDescriptor::new("jsp-2.3").depends_on(Dependency::on("servlet-3.1")))
//!     .build()
//!     .unwrap();
//!
//! let request = ResolutionRequest::new().root("jsp-2.3");
//! let result = Resolver::new(&catalog).resolve(&request).unwrap();
//!
//! assert!(result.resolved_features.contains("servlet-3.1"));
//! assert!(!result.has_errors());
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feature;
pub mod resolver;

pub use cache::ResolutionCache;
pub use catalog::{Catalog, CatalogBuilder, CatalogLint, CatalogView, CompositeCatalog, LintLevel};
pub use config::{ConfigLoader, ConfigSource, ResolvedConfig, ServerConfig};
pub use error::{Error, Result};
pub use feature::{
    AutoCondition, Dependency, FeatureDescriptor, PlatformDescriptor, ProcessType, Visibility,
};
pub use resolver::{
    resolve, Chain, Diagnostic, DiagnosticCode, ResolutionRequest, ResolutionResult,
    ResolutionTiming, Resolver, Severity,
};

//! Subcommands and the arguments they share.

pub mod platforms;
pub mod resolve;
pub mod validate;
pub mod why;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use featres_resolver::{
    Catalog, CompositeCatalog, ConfigLoader, ProcessType, ResolvedConfig, ServerConfig,
};

pub use platforms::PlatformsArgs;
pub use resolve::ResolveArgs;
pub use validate::ValidateArgs;
pub use why::WhyArgs;

/// Where feature descriptors come from
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// JSON feature catalog
    #[arg(short = 'c', long, env = "FEATRES_CATALOG", value_name = "PATH")]
    pub catalog: PathBuf,

    /// Additional catalog layered under the main one (repeatable)
    #[arg(long = "extension", value_name = "PATH")]
    pub extensions: Vec<PathBuf>,
}

impl CatalogArgs {
    /// Load the main catalog and every extension layer
    pub fn load(&self) -> Result<CompositeCatalog> {
        let mut composite = CompositeCatalog::new();
        for path in std::iter::once(&self.catalog).chain(&self.extensions) {
            let catalog = Catalog::load(path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?;
            composite = composite.with_layer(Arc::new(catalog));
        }
        Ok(composite)
    }
}

/// Request inputs, layered over the server descriptor and the environment
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// TOML server descriptor
    #[arg(short = 's', long, value_name = "PATH")]
    pub server: Option<PathBuf>,

    /// Root feature (repeatable, comma separated)
    #[arg(short = 'f', long = "feature", value_delimiter = ',')]
    pub features: Vec<String>,

    /// Configured platform (repeatable, comma separated)
    #[arg(short = 'p', long = "platform", value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Ordered platform preference for versionless features
    #[arg(long, value_delimiter = ',')]
    pub preferred_platforms: Vec<String>,

    /// Ordered exact feature version preference
    #[arg(long, value_delimiter = ',')]
    pub preferred_features: Vec<String>,

    /// Process type to resolve for (server, client)
    #[arg(long = "process-type", value_delimiter = ',')]
    pub process_types: Vec<ProcessType>,

    /// Allow several versions of a singleton when they tolerate each other
    #[arg(long)]
    pub allow_multiple_versions: bool,
}

impl RequestArgs {
    /// Build the request: command line over server file over environment
    pub fn load(&self) -> Result<ResolvedConfig> {
        let server = match &self.server {
            Some(path) => Some(
                ServerConfig::load(path)
                    .with_context(|| format!("Failed to load server descriptor {}", path.display()))?,
            ),
            None => None,
        };

        let resolved = ConfigLoader::new()
            .load(server.as_ref())
            .with_roots(self.features.clone())
            .with_platforms(self.platforms.clone())
            .with_preferred_platforms(self.preferred_platforms.clone())
            .with_preferred_features(self.preferred_features.clone())
            .with_process_types(self.process_types.clone())
            .with_allow_multiple_versions(self.allow_multiple_versions);

        for (field, source) in resolved.sources() {
            log::debug!("{} from {}", field, source.as_str());
        }
        Ok(resolved)
    }
}

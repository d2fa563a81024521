//! Why command - show why a feature is in the resolved set.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;

use featres_resolver::{CatalogView, Chain, ResolutionResult, Resolver};
use featres_version::split_feature_name;

use super::{CatalogArgs, RequestArgs};

#[derive(Args, Debug)]
pub struct WhyArgs {
    /// Feature to explain, concrete (`servlet-4.0`) or versionless (`servlet`)
    #[arg(value_name = "FEATURE")]
    pub feature: String,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Output as JSON
    #[arg(long)]
    pub format_json: bool,
}

/// Why one feature was resolved
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub feature: String,
    pub chain: Chain,
    /// Resolved features with a dependency edge accepting this feature
    pub required_by: Vec<String>,
}

pub fn execute(args: WhyArgs) -> Result<u8> {
    let catalog = args.catalog.load()?;
    let config = args.request.load()?;

    let result = Resolver::new(&catalog)
        .resolve(&config.request)
        .context("Resolution failed")?;

    let Some(explanation) = explain(&catalog, &result, &args.feature) else {
        eprintln!(
            "{} Feature '{}' is not in the resolved set",
            style("Error:").red().bold(),
            args.feature
        );
        return Ok(1);
    };

    if args.format_json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(0);
    }

    println!("{}", style(&explanation.feature).white().bold());
    if explanation.chain.path.is_empty() {
        println!("  requested directly");
    } else {
        println!("  via {}", explanation.chain);
    }
    if explanation.chain.candidates.len() > 1 {
        println!("  candidates: {}", explanation.chain.candidates.join(", "));
    }
    if let Some(preferred) = &explanation.chain.preferred {
        println!("  preferred: {}", preferred);
    }

    if explanation.required_by.is_empty() {
        println!("\n{} not required by any other resolved feature", style("Info:").cyan());
    } else {
        println!("\n{} is required by:", style(&explanation.feature).white().bold());
        for name in &explanation.required_by {
            println!("  {}", name);
        }
    }

    Ok(0)
}

/// Explain a resolved feature; versionless names map to their chosen version
pub fn explain(catalog: &dyn CatalogView, result: &ResolutionResult, feature: &str) -> Option<Explanation> {
    let wanted = feature.trim();
    let name = result
        .resolved_features
        .iter()
        .find(|f| f.eq_ignore_ascii_case(wanted))
        .or_else(|| {
            result
                .versionless
                .iter()
                .find(|(versionless, _)| versionless.eq_ignore_ascii_case(wanted))
                .map(|(_, selected)| selected)
        })?
        .clone();

    let chain = result.chains.get(&name).cloned().unwrap_or_default();

    let (base, version) = split_feature_name(&name);
    let required_by = result
        .resolved_features
        .iter()
        .filter(|other| **other != name)
        .filter(|other| {
            catalog.feature(other).is_some_and(|fd| {
                fd.dependencies.iter().any(|dep| {
                    dep.symbolic_name.eq_ignore_ascii_case(base) && dep.accepts(version.as_ref())
                })
            })
        })
        .cloned()
        .collect();

    Some(Explanation {
        feature: name,
        chain,
        required_by,
    })
}

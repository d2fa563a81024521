//! Platforms command - list catalog platforms with their feature versions.

use anyhow::Result;
use clap::Args;
use console::style;
use serde::Serialize;

use featres_resolver::CatalogView;

use super::CatalogArgs;

#[derive(Args, Debug)]
pub struct PlatformsArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Only show platforms of this family
    #[arg(long)]
    pub family: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub format_json: bool,
}

#[derive(Debug, Clone, Serialize)]
struct PlatformListing {
    name: String,
    family: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclusive_with: Vec<String>,
    features: Vec<String>,
}

pub fn execute(args: PlatformsArgs) -> Result<u8> {
    let catalog = args.catalog.load()?;
    let listings = list(&catalog, args.family.as_deref());

    if args.format_json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(0);
    }

    if listings.is_empty() {
        println!("{} no platforms found", style("Info:").cyan());
        return Ok(0);
    }

    for listing in &listings {
        print!("{}", style(&listing.name).white().bold());
        if !listing.exclusive_with.is_empty() {
            print!(" {}", style(format!("(excludes {})", listing.exclusive_with.join(", "))).dim());
        }
        println!();
        for feature in &listing.features {
            println!("  {}", feature);
        }
    }

    Ok(0)
}

fn list(catalog: &dyn CatalogView, family: Option<&str>) -> Vec<PlatformListing> {
    catalog
        .platforms()
        .into_iter()
        .filter(|p| family.map_or(true, |f| p.family.eq_ignore_ascii_case(f)))
        .map(|p| {
            let features = catalog
                .select(&|fd| !fd.versionless && fd.belongs_to(&p.name))
                .into_iter()
                .map(|fd| fd.name.clone())
                .collect();
            PlatformListing {
                name: p.name.clone(),
                family: p.family.clone(),
                exclusive_with: p.exclusive_with.clone(),
                features,
            }
        })
        .collect()
}

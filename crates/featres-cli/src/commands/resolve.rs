//! Resolve command - compute the feature set for a request.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use featres_resolver::{
    Diagnostic, ResolutionCache, ResolutionResult, ResolutionTiming, Resolver, Severity,
};

use super::{CatalogArgs, RequestArgs};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Reuse and persist results in this directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Report how long each stage took
    #[arg(long)]
    pub timing: bool,

    /// Output as JSON
    #[arg(long)]
    pub format_json: bool,
}

pub fn execute(args: ResolveArgs) -> Result<u8> {
    let catalog = args.catalog.load()?;
    let config = args.request.load()?;

    let (result, timing) = match &args.cache_dir {
        Some(dir) => {
            let cache = ResolutionCache::with_dir(dir);
            let result = cache
                .resolve(&catalog, &config.request)
                .context("Resolution failed")?;
            (result, None)
        }
        None => {
            let (result, timing) = Resolver::new(&catalog)
                .resolve_timed(&config.request)
                .context("Resolution failed")?;
            (result, Some(timing).filter(|_| args.timing))
        }
    };

    if args.format_json {
        let output = match &timing {
            Some(timing) => serde_json::json!({ "result": result, "timing": timing }),
            None => serde_json::to_value(&result)?,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_result(&result);
        if let Some(timing) = &timing {
            print_timing(timing);
        }
    }

    Ok(exit_code(&result))
}

/// 0 when clean, 1 when anything was missing, rejected or in conflict
pub fn exit_code(result: &ResolutionResult) -> u8 {
    if result.has_errors() {
        1
    } else {
        0
    }
}

fn print_result(result: &ResolutionResult) {
    println!(
        "{} {} feature(s)",
        style("Resolved").green().bold(),
        result.resolved_features.len()
    );
    for name in &result.resolved_features {
        match result.chains.get(name) {
            Some(chain) if !chain.path.is_empty() => {
                println!("  {} {}", style(name).white().bold(), style(format!("via {}", chain)).dim())
            }
            _ => println!("  {}", style(name).white().bold()),
        }
    }

    if !result.resolved_platforms.is_empty() {
        println!("\n{} {}", style("Platforms:").cyan(), result.resolved_platforms.join(", "));
    }
    for (versionless, selected) in &result.versionless {
        println!("  {} -> {}", versionless, selected);
    }

    let diagnostics: Vec<&Diagnostic> = result.diagnostics().collect();
    if !diagnostics.is_empty() {
        println!();
    }
    for diagnostic in diagnostics {
        print_diagnostic(diagnostic);
    }
}

pub fn print_diagnostic(diagnostic: &Diagnostic) {
    match diagnostic.severity() {
        Severity::Error => eprintln!("{} {}", style("Error:").red().bold(), diagnostic),
        Severity::Warning => eprintln!("{} {}", style("Warning:").yellow().bold(), diagnostic),
        Severity::Info => println!("{} {}", style("Info:").cyan(), diagnostic),
    }
}

fn print_timing(timing: &ResolutionTiming) {
    println!(
        "\n{} expansion {:?}, platforms {:?}, validation {:?}, total {:?}",
        style("Timing:").dim(),
        timing.expansion,
        timing.platforms,
        timing.validation,
        timing.total
    );
}

//! Validate command - check a catalog for structural problems.

use anyhow::Result;
use clap::Args;
use console::style;

use featres_resolver::{catalog, CatalogLint, LintLevel};

use super::CatalogArgs;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    /// Output as JSON
    #[arg(long)]
    pub format_json: bool,
}

pub fn execute(args: ValidateArgs) -> Result<u8> {
    let composite = args.catalog.load()?;
    let lints = catalog::lint(&composite);
    print_results(&lints, args.format_json, args.strict)
}

fn print_results(lints: &[CatalogLint], as_json: bool, strict: bool) -> Result<u8> {
    let errors: Vec<&CatalogLint> = lints.iter().filter(|l| l.level == LintLevel::Error).collect();
    let warnings: Vec<&CatalogLint> = lints.iter().filter(|l| l.level == LintLevel::Warning).collect();

    if as_json {
        let result = serde_json::json!({
            "valid": errors.is_empty() && (!strict || warnings.is_empty()),
            "errors": errors,
            "warnings": warnings
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for error in &errors {
            eprintln!("{} {}", style("Error:").red().bold(), error);
        }

        for warning in &warnings {
            println!("{} {}", style("Warning:").yellow().bold(), warning);
        }

        if lints.is_empty() {
            println!("{} catalog is valid", style("Success:").green().bold());
        } else if errors.is_empty() {
            println!(
                "{} catalog is valid with {} warning(s)",
                style("Success:").green().bold(),
                warnings.len()
            );
        }
    }

    if !errors.is_empty() || (strict && !warnings.is_empty()) {
        return Ok(1);
    }

    Ok(0)
}

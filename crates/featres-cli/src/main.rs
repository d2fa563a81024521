//! featres - resolve feature sets from the command line.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;

use commands::{PlatformsArgs, ResolveArgs, ValidateArgs, WhyArgs};

#[derive(Parser, Debug)]
#[command(name = "featres", version, about = "Feature resolution engine", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a feature set
    Resolve(ResolveArgs),

    /// Show why a feature is in the resolved set
    Why(WhyArgs),

    /// Check a catalog for structural problems
    Validate(ValidateArgs),

    /// List catalog platforms and their feature versions
    Platforms(PlatformsArgs),
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args),
        Commands::Why(args) => commands::why::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Platforms(args) => commands::platforms::execute(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::from(2)
        }
    }
}

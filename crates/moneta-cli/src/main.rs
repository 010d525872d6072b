//! Moneta CLI - Bank transaction analyzer
//!
//! Usage:
//!   moneta analyze --input data/ --output output/   Full run with exports
//!   moneta report --input data/                     Print the text summary
//!   moneta check                                    Validate categories.yaml

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            options,
        } => commands::cmd_analyze(&cli.categories, &input, &output, &options),
        Commands::Report {
            input,
            json,
            options,
        } => commands::cmd_report(&cli.categories, &input, json, &options),
        Commands::Check => commands::cmd_check(&cli.categories),
    }
}

//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Moneta - Bank transaction analysis pipeline
#[derive(Parser)]
#[command(name = "moneta")]
#[command(about = "Analyze bank CSV exports: categorize, detect, summarize", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Category rules file
    #[arg(short, long, default_value = "config/categories.yaml", global = true)]
    pub categories: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full analysis and export result tables
    Analyze {
        /// Directory of bank CSV exports (one file per account)
        #[arg(short, long, default_value = "data")]
        input: PathBuf,

        /// Directory to write CSV tables and dashboard.json into
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        #[command(flatten)]
        options: AnalysisOptions,
    },

    /// Run the analysis and print the summary without exporting
    Report {
        /// Directory of bank CSV exports (one file per account)
        #[arg(short, long, default_value = "data")]
        input: PathBuf,

        /// Print the full report as JSON instead of the text summary
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        options: AnalysisOptions,
    },

    /// Validate the category rules file
    Check,
}

/// Analysis tuning flags shared by `analyze` and `report`
#[derive(Debug, clap::Args)]
pub struct AnalysisOptions {
    /// First month to include (inclusive, YYYY-MM)
    #[arg(long)]
    pub start: Option<String>,

    /// Last month to include (inclusive, YYYY-MM)
    #[arg(long)]
    pub end: Option<String>,

    /// Balance carried into the first transaction of each account
    #[arg(long, default_value_t = 0.0)]
    pub balance: f64,

    /// Z-score threshold for anomalous category-months
    #[arg(long, default_value_t = 2.0)]
    pub std_threshold: f64,
}

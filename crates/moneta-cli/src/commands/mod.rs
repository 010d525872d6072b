//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Full run: import, pipeline, export, summary
//! - `report` - Run without exporting; text or JSON output
//! - `check` - Category rules file validation

pub mod analyze;
pub mod check;
pub mod report;

// Re-export command functions for main.rs
pub use analyze::*;
pub use check::*;
pub use report::*;

use std::path::Path;

use anyhow::{Context, Result};
use moneta_core::config::{AnalysisConfig, ConfigFile};
use moneta_core::models::YearMonth;

use crate::cli::AnalysisOptions;

/// Load categories.yaml and apply the shared tuning flags
pub fn build_config(categories: &Path, options: &AnalysisOptions) -> Result<AnalysisConfig> {
    let file = ConfigFile::load(categories)
        .with_context(|| format!("Failed to load category rules from {}", categories.display()))?;

    let mut config = AnalysisConfig::with_config_file(file);
    config.starting_balance = options.balance;
    config.std_threshold = options.std_threshold;
    config.start_month = parse_month(options.start.as_deref(), "--start")?;
    config.end_month = parse_month(options.end.as_deref(), "--end")?;
    Ok(config)
}

fn parse_month(value: Option<&str>, flag: &str) -> Result<Option<YearMonth>> {
    value
        .map(|s| {
            s.parse::<YearMonth>()
                .map_err(|e| anyhow::anyhow!("Invalid {} value: {}", flag, e))
        })
        .transpose()
}

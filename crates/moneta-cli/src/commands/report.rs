//! Report command: run the pipeline and print, nothing written to disk

use std::path::Path;

use anyhow::{Context, Result};
use moneta_core::context::build_summary;
use moneta_core::import::load_directory;
use moneta_core::pipeline::Pipeline;

use crate::cli::AnalysisOptions;

pub fn cmd_report(
    categories: &Path,
    input: &Path,
    json: bool,
    options: &AnalysisOptions,
) -> Result<()> {
    let config = super::build_config(categories, options)?;

    let (records, _) = load_directory(input)
        .with_context(|| format!("Failed to import CSVs from {}", input.display()))?;

    let report = Pipeline::new(&config).run(records)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", build_summary(&report));
    }
    Ok(())
}

//! Full analysis command: import, run the pipeline, export, print summary

use std::path::Path;

use anyhow::{Context, Result};
use moneta_core::context::build_summary;
use moneta_core::export::write_report;
use moneta_core::import::load_directory;
use moneta_core::pipeline::Pipeline;

use crate::cli::AnalysisOptions;

pub fn cmd_analyze(
    categories: &Path,
    input: &Path,
    output: &Path,
    options: &AnalysisOptions,
) -> Result<()> {
    let config = super::build_config(categories, options)?;

    let (records, import_stats) = load_directory(input)
        .with_context(|| format!("Failed to import CSVs from {}", input.display()))?;

    let report = Pipeline::new(&config).run(records)?;

    let export_stats = write_report(&report, output)
        .with_context(|| format!("Failed to export to {}", output.display()))?;

    let summary = build_summary(&report);
    std::fs::write(output.join("summary.txt"), &summary)?;
    println!("{}", summary);
    println!(
        "Wrote {} files to {} ({} import rows skipped)",
        export_stats.files_written + 1,
        output.display(),
        import_stats.skipped
    );
    Ok(())
}

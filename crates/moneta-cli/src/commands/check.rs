//! Category rules validation command

use std::path::Path;

use anyhow::{Context, Result};
use moneta_core::config::ConfigFile;

pub fn cmd_check(categories: &Path) -> Result<()> {
    let file = ConfigFile::load(categories)
        .with_context(|| format!("Failed to load category rules from {}", categories.display()))?;

    println!("{} is valid", categories.display());
    println!("Categories ({}):", file.rules.len());
    for rule in file.rules.iter() {
        println!("  {} ({} keywords)", rule.name, rule.keywords.len());
    }
    if !file.budgets.is_empty() {
        let mut budgets: Vec<_> = file.budgets.iter().collect();
        budgets.sort_by(|a, b| a.0.cmp(b.0));
        println!("Budgets ({}):", budgets.len());
        for (category, limit) in budgets {
            println!("  {}: ${:.2}/month", category, limit);
        }
    }
    Ok(())
}

//! Export functionality for analysis results
//!
//! Writes the report out as a set of flat CSV tables plus a single
//! `dashboard.json` bundle that carries every derived table for downstream
//! visualization. All files land in one output directory; an existing
//! directory is reused and its files overwritten.

use std::path::Path;

use csv::Writer;
use tracing::info;

use crate::error::Result;
use crate::report::AnalysisReport;

/// Counters for one export run
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportStats {
    pub files_written: usize,
    pub transactions_written: usize,
}

/// Write all report tables to `out_dir`
pub fn write_report(report: &AnalysisReport, out_dir: &Path) -> Result<ExportStats> {
    std::fs::create_dir_all(out_dir)?;

    let mut stats = ExportStats::default();
    stats.transactions_written = write_transactions(report, &out_dir.join("transactions_clean.csv"))?;
    stats.files_written += 1;
    write_monthly_summary(report, &out_dir.join("monthly_summary.csv"))?;
    stats.files_written += 1;
    write_crosstab(report, &out_dir.join("monthly_by_category.csv"))?;
    stats.files_written += 1;
    write_anomalies(report, &out_dir.join("anomalies.csv"))?;
    stats.files_written += 1;
    write_recurring(report, &out_dir.join("recurring.csv"))?;
    stats.files_written += 1;
    write_top_merchants(report, &out_dir.join("top_merchants.csv"))?;
    stats.files_written += 1;
    write_dashboard(report, &out_dir.join("dashboard.json"))?;
    stats.files_written += 1;

    info!(
        "Exported {} files to {} ({} transactions)",
        stats.files_written,
        out_dir.display(),
        stats.transactions_written
    );
    Ok(stats)
}

/// The enriched record set, one row per transaction with every annotation
fn write_transactions(report: &AnalysisReport, path: &Path) -> Result<usize> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record([
        "row_id",
        "date",
        "account",
        "description",
        "merchant",
        "amount",
        "category",
        "is_transfer",
        "is_duplicate",
        "is_anomaly",
        "anomaly_score",
        "is_recurring",
        "recurring_group_id",
        "running_balance",
    ])?;
    for tx in &report.transactions {
        wtr.write_record([
            tx.row_id.to_string(),
            tx.date.to_string(),
            tx.account.clone(),
            tx.description.clone(),
            tx.merchant.clone(),
            format!("{:.2}", tx.amount),
            tx.category.clone(),
            tx.is_transfer.to_string(),
            tx.is_duplicate.to_string(),
            tx.is_anomaly.to_string(),
            tx.anomaly_score
                .map(|z| format!("{:.3}", z))
                .unwrap_or_default(),
            tx.is_recurring.to_string(),
            tx.recurring_group_id.clone().unwrap_or_default(),
            tx.running_balance
                .map(|b| format!("{:.2}", b))
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(report.transactions.len())
}

fn write_monthly_summary(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["month", "income", "expenses", "net", "savings_rate"])?;
    for row in &report.monthly_summary {
        wtr.write_record([
            row.year_month.to_string(),
            format!("{:.2}", row.income),
            format!("{:.2}", row.expenses),
            format!("{:.2}", row.net),
            format!("{:.4}", row.savings_rate),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Month × category grid, one column per category
fn write_crosstab(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    let mut header = vec!["month".to_string()];
    header.extend(report.crosstab.categories.iter().cloned());
    wtr.write_record(&header)?;
    for row in &report.crosstab.rows {
        let mut record = vec![row.year_month.to_string()];
        record.extend(row.totals.iter().map(|t| format!("{:.2}", t)));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_anomalies(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["row_id", "date", "account", "merchant", "category", "amount", "z_score"])?;
    for tx in report.anomalies() {
        wtr.write_record([
            tx.row_id.to_string(),
            tx.date.to_string(),
            tx.account.clone(),
            tx.merchant.clone(),
            tx.category.clone(),
            format!("{:.2}", tx.amount),
            tx.anomaly_score
                .map(|z| format!("{:.3}", z))
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_recurring(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record([
        "group_id",
        "account",
        "merchant",
        "category",
        "typical_amount",
        "interval_days",
        "occurrences",
    ])?;
    for group in &report.recurring_groups {
        wtr.write_record([
            group.group_id.clone(),
            group.account.clone(),
            group.merchant.clone(),
            group.category.clone(),
            format!("{:.2}", group.typical_amount),
            format!("{:.1}", group.typical_interval_days),
            group.occurrences().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_top_merchants(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["merchant", "category", "total_spent", "transactions", "avg_amount"])?;
    for row in &report.top_merchants {
        wtr.write_record([
            row.merchant.clone(),
            row.category.clone(),
            format!("{:.2}", row.total_spent),
            row.transactions.to_string(),
            format!("{:.2}", row.avg_amount),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// The whole report as one JSON document
fn write_dashboard(report: &AnalysisReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

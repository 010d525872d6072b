//! Plain-text report summary
//!
//! Renders an [`AnalysisReport`] into a readable text digest: period and
//! record counts, income/expense totals, top merchants, recurring charges,
//! anomalies, and budget status. This is what the CLI prints after an
//! analysis run and what lands in `summary.txt` next to the exports.

use std::fmt::Write;

use crate::report::AnalysisReport;

const TOP_LINES: usize = 5;

/// Render a multi-section text summary of the report
pub fn build_summary(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Transaction Analysis ===");
    let _ = writeln!(
        out,
        "Records: {} analyzed ({} in, {} filtered, {} malformed skipped)",
        report.run.records_analyzed,
        report.run.records_in,
        report.run.filtered_out,
        report.run.malformed_skipped
    );
    if let (Some(first), Some(last)) = (
        report.monthly_summary.first(),
        report.monthly_summary.last(),
    ) {
        let _ = writeln!(
            out,
            "Period: {} to {} ({} months)",
            first.year_month,
            last.year_month,
            report.months_covered()
        );
    }
    let _ = writeln!(
        out,
        "Income: ${:.2}  Expenses: ${:.2}  Net: ${:.2}",
        report.total_income(),
        report.total_expenses(),
        report.total_income() - report.total_expenses()
    );
    let _ = writeln!(
        out,
        "Transfers matched: {} pairs  Duplicates flagged: {}",
        report.run.transfer_pairs, report.run.duplicates_flagged
    );

    if !report.monthly_summary.is_empty() {
        let _ = writeln!(out, "\n--- Monthly ---");
        for row in &report.monthly_summary {
            let _ = writeln!(
                out,
                "  {}: income ${:.2}, expenses ${:.2}, net ${:.2}",
                row.year_month, row.income, row.expenses, row.net
            );
        }
    }

    if !report.crosstab.categories.is_empty() {
        let _ = writeln!(out, "\n--- Category Totals ---");
        for (i, category) in report.crosstab.categories.iter().enumerate() {
            let total: f64 = report.crosstab.rows.iter().map(|r| r.totals[i]).sum();
            let _ = writeln!(out, "  {}: ${:.2}", category, total);
        }
    }

    if !report.top_merchants.is_empty() {
        let _ = writeln!(out, "\n--- Top Merchants ---");
        for row in report.top_merchants.iter().take(TOP_LINES) {
            let _ = writeln!(
                out,
                "  {} ({}): ${:.2} over {} transactions",
                row.merchant, row.category, row.total_spent, row.transactions
            );
        }
    }

    if !report.recurring_groups.is_empty() {
        let _ = writeln!(
            out,
            "\n--- Recurring Charges ({}) ---",
            report.recurring_groups.len()
        );
        for group in &report.recurring_groups {
            let _ = writeln!(
                out,
                "  {} ~${:.2} every {:.0} days ({} charges, {})",
                group.merchant,
                group.typical_amount.abs(),
                group.typical_interval_days,
                group.occurrences(),
                group.account
            );
        }
    }

    let anomalies = report.anomalies();
    if !anomalies.is_empty() {
        let _ = writeln!(out, "\n--- Anomalies ({}) ---", anomalies.len());
        for tx in anomalies.iter().take(TOP_LINES) {
            let _ = writeln!(
                out,
                "  {} {} ${:.2} [{}] z={:.2}",
                tx.date,
                tx.merchant,
                tx.amount.abs(),
                tx.category,
                tx.anomaly_score.unwrap_or(0.0)
            );
        }
    }

    if !report.budget_status.is_empty() {
        let _ = writeln!(out, "\n--- Budget Status (latest month) ---");
        for row in &report.budget_status {
            let marker = if row.pct_used > 100.0 { " OVER" } else { "" };
            let _ = writeln!(
                out,
                "  {}: ${:.2} of ${:.2} ({:.0}%){}",
                row.category, row.spent, row.budget, row.pct_used, marker
            );
        }
    }

    if let (Some(current), Some(previous)) = (
        report.month_comparison.current_month,
        report.month_comparison.previous_month,
    ) {
        let _ = writeln!(out, "\n--- {} vs {} ---", current, previous);
        for (i, category) in report
            .month_comparison
            .categories
            .iter()
            .take(TOP_LINES)
            .enumerate()
        {
            let now = report.month_comparison.current[i];
            let then = report.month_comparison.previous[i];
            let delta = now - then;
            let sign = if delta >= 0.0 { "+" } else { "-" };
            let _ = writeln!(
                out,
                "  {}: ${:.2} ({}${:.2})",
                category,
                now,
                sign,
                delta.abs()
            );
        }
    }

    out
}

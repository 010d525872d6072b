//! Report assembly
//!
//! Pure reshaping of already-computed annotations into exportable tables:
//! top merchants, the monthly-by-category cross-tab, budget status, and the
//! month-over-month comparison. No detection logic runs here, and the
//! filtered accessors ([`AnalysisReport::anomalies`],
//! [`AnalysisReport::recurring_members`]) only read flags set upstream.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::balance::BalanceTables;
use crate::config::AnalysisConfig;
use crate::models::{
    BalancePoint, BudgetStatus, CategoryMonthSummary, MonthComparison, MonthlySummary,
    RecurringGroup, TopMerchant, Transaction, YearMonth,
};
use crate::pipeline::RunSummary;

/// Number of merchants in the ranked top-merchants table
const TOP_MERCHANTS_LIMIT: usize = 12;

/// Monthly-by-category cross-tab: one row per month, one column per category
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CategoryCrosstab {
    /// Column order, by overall spend descending
    pub categories: Vec<String>,
    pub rows: Vec<CrosstabRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosstabRow {
    pub year_month: YearMonth,
    /// Totals aligned with `CategoryCrosstab::categories`
    pub totals: Vec<f64>,
}

/// The full output of one pipeline run
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Enriched record set with every annotation populated
    pub transactions: Vec<Transaction>,
    pub monthly_summary: Vec<MonthlySummary>,
    pub category_month: Vec<CategoryMonthSummary>,
    pub crosstab: CategoryCrosstab,
    pub overall_balance: Vec<BalancePoint>,
    pub top_merchants: Vec<TopMerchant>,
    pub recurring_groups: Vec<RecurringGroup>,
    pub budget_status: Vec<BudgetStatus>,
    pub month_comparison: MonthComparison,
    pub run: RunSummary,
}

impl AnalysisReport {
    /// Anomalous records, largest magnitude first
    pub fn anomalies(&self) -> Vec<&Transaction> {
        let mut rows: Vec<&Transaction> =
            self.transactions.iter().filter(|t| t.is_anomaly).collect();
        rows.sort_by(|a, b| {
            b.abs_amount()
                .partial_cmp(&a.abs_amount())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    }

    /// Members of confirmed recurring groups, in record order
    pub fn recurring_members(&self) -> Vec<&Transaction> {
        self.transactions.iter().filter(|t| t.is_recurring).collect()
    }

    pub fn total_income(&self) -> f64 {
        self.monthly_summary.iter().map(|m| m.income).sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.monthly_summary.iter().map(|m| m.expenses).sum()
    }

    pub fn months_covered(&self) -> usize {
        self.monthly_summary.len()
    }
}

/// Merge all stage outputs into the final report
pub fn assemble(
    transactions: Vec<Transaction>,
    tables: BalanceTables,
    recurring_groups: Vec<RecurringGroup>,
    config: &AnalysisConfig,
    run: RunSummary,
) -> AnalysisReport {
    let top_merchants = top_merchants(&transactions, TOP_MERCHANTS_LIMIT);
    let crosstab = crosstab(&tables.category_month);
    let budget_status = budget_status(&tables.category_month, &config.budgets);
    let month_comparison = month_comparison(&tables.category_month);

    debug!(
        "Assembled report: {} transactions, {} top merchants, {} recurring groups",
        transactions.len(),
        top_merchants.len(),
        recurring_groups.len()
    );

    AnalysisReport {
        transactions,
        monthly_summary: tables.monthly_summary,
        category_month: tables.category_month,
        crosstab,
        overall_balance: tables.overall_balance,
        top_merchants,
        recurring_groups,
        budget_status,
        month_comparison,
        run,
    }
}

/// Rank merchants by total absolute spend over real expenses
///
/// Descending by spend with a stable tie-break on merchant name.
fn top_merchants(transactions: &[Transaction], limit: usize) -> Vec<TopMerchant> {
    struct Acc {
        total: f64,
        count: usize,
        categories: Vec<(String, usize)>,
    }

    let mut merchants: HashMap<String, Acc> = HashMap::new();
    for tx in transactions {
        if !tx.is_expense() || !tx.counts_in_aggregates() || !tx.amount.is_finite() {
            continue;
        }
        let acc = merchants.entry(tx.merchant.clone()).or_insert(Acc {
            total: 0.0,
            count: 0,
            categories: Vec::new(),
        });
        acc.total += tx.abs_amount();
        acc.count += 1;
        match acc.categories.iter_mut().find(|(c, _)| *c == tx.category) {
            Some((_, n)) => *n += 1,
            None => acc.categories.push((tx.category.clone(), 1)),
        }
    }

    let mut rows: Vec<TopMerchant> = merchants
        .into_iter()
        .map(|(merchant, acc)| TopMerchant {
            merchant,
            total_spent: acc.total,
            transactions: acc.count,
            avg_amount: acc.total / acc.count as f64,
            // Most common category, ties broken by first occurrence
            category: acc
                .categories
                .into_iter()
                .enumerate()
                .max_by_key(|(i, (_, n))| (*n, std::cmp::Reverse(*i)))
                .map(|(_, (c, _))| c)
                .unwrap_or_else(|| "Other".to_string()),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_spent
            .partial_cmp(&a.total_spent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.merchant.cmp(&b.merchant))
    });
    rows.truncate(limit);
    rows
}

/// Pivot the long-form category-month table into a month × category grid
fn crosstab(category_month: &[CategoryMonthSummary]) -> CategoryCrosstab {
    let mut category_totals: Vec<(String, f64)> = Vec::new();
    for cell in category_month {
        match category_totals.iter_mut().find(|(c, _)| *c == cell.category) {
            Some((_, t)) => *t += cell.total_spent,
            None => category_totals.push((cell.category.clone(), cell.total_spent)),
        }
    }
    category_totals.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let categories: Vec<String> = category_totals.into_iter().map(|(c, _)| c).collect();

    let mut months: Vec<YearMonth> = category_month.iter().map(|c| c.year_month).collect();
    months.sort();
    months.dedup();

    let rows = months
        .into_iter()
        .map(|year_month| {
            let totals = categories
                .iter()
                .map(|cat| {
                    category_month
                        .iter()
                        .find(|c| c.year_month == year_month && &c.category == cat)
                        .map(|c| c.total_spent)
                        .unwrap_or(0.0)
                })
                .collect();
            CrosstabRow { year_month, totals }
        })
        .collect();

    CategoryCrosstab { categories, rows }
}

/// Latest-month spend against each configured budget, % used descending
fn budget_status(
    category_month: &[CategoryMonthSummary],
    budgets: &HashMap<String, f64>,
) -> Vec<BudgetStatus> {
    if budgets.is_empty() {
        return Vec::new();
    }
    let Some(latest) = category_month.iter().map(|c| c.year_month).max() else {
        return Vec::new();
    };

    let mut rows: Vec<BudgetStatus> = budgets
        .iter()
        .map(|(category, &budget)| {
            let spent = category_month
                .iter()
                .filter(|c| c.year_month == latest && &c.category == category)
                .map(|c| c.total_spent)
                .sum();
            let pct_used = if budget > 0.0 {
                spent / budget * 100.0
            } else {
                0.0
            };
            BudgetStatus {
                category: category.clone(),
                budget,
                spent,
                pct_used,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.pct_used
            .partial_cmp(&a.pct_used)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows
}

/// Compare the two most recent months of category spend
fn month_comparison(category_month: &[CategoryMonthSummary]) -> MonthComparison {
    let mut months: Vec<YearMonth> = category_month.iter().map(|c| c.year_month).collect();
    months.sort();
    months.dedup();
    if months.len() < 2 {
        return MonthComparison::default();
    }
    let current = months[months.len() - 1];
    let previous = months[months.len() - 2];

    let spend = |month: YearMonth, category: &str| -> f64 {
        category_month
            .iter()
            .filter(|c| c.year_month == month && c.category == category)
            .map(|c| c.total_spent)
            .sum()
    };

    let mut categories: Vec<String> = Vec::new();
    for cell in category_month {
        if (cell.year_month == current || cell.year_month == previous)
            && !categories.contains(&cell.category)
        {
            categories.push(cell.category.clone());
        }
    }
    categories.sort_by(|a, b| {
        spend(current, b)
            .partial_cmp(&spend(current, a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(b))
    });

    let current_totals = categories.iter().map(|c| spend(current, c)).collect();
    let previous_totals = categories.iter().map(|c| spend(previous, c)).collect();

    MonthComparison {
        current_month: Some(current),
        previous_month: Some(previous),
        categories,
        current: current_totals,
        previous: previous_totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(row_id: u64, description: &str, amount: f64, category: &str) -> Transaction {
        let mut t = Transaction::new(
            row_id,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            description,
            amount,
            "checking",
        );
        t.category = category.to_string();
        t
    }

    fn cell(year: i32, month: u32, category: &str, total: f64) -> CategoryMonthSummary {
        CategoryMonthSummary {
            year_month: YearMonth::new(year, month),
            category: category.to_string(),
            total_spent: total,
        }
    }

    #[test]
    fn test_top_merchants_ranked_desc() {
        let records = vec![
            tx(1, "KROGER", -50.0, "Groceries"),
            tx(2, "KROGER", -30.0, "Groceries"),
            tx(3, "NETFLIX.COM", -15.0, "Subscriptions"),
        ];
        let rows = top_merchants(&records, 12);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].merchant, "Kroger");
        assert!((rows[0].total_spent - 80.0).abs() < 1e-9);
        assert_eq!(rows[0].transactions, 2);
        assert!((rows[0].avg_amount - 40.0).abs() < 1e-9);
        assert_eq!(rows[1].merchant, "Netflix.com");
    }

    #[test]
    fn test_top_merchants_tie_broken_by_name() {
        let records = vec![
            tx(1, "ZEBRA MART", -10.0, "Other"),
            tx(2, "ALPHA MART", -10.0, "Other"),
        ];
        let rows = top_merchants(&records, 12);
        assert_eq!(rows[0].merchant, "Alpha Mart");
        assert_eq!(rows[1].merchant, "Zebra Mart");
    }

    #[test]
    fn test_merchant_category_tie_prefers_first_seen() {
        let records = vec![
            tx(1, "COSTCO", -30.0, "Groceries"),
            tx(2, "COSTCO", -30.0, "Shopping"),
            tx(3, "COSTCO", -20.0, "Shopping"),
            tx(4, "COSTCO", -20.0, "Groceries"),
        ];
        let rows = top_merchants(&records, 12);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Groceries");
    }

    #[test]
    fn test_top_merchants_skip_transfers_and_income() {
        let mut transfer = tx(1, "MOVE MONEY", -500.0, "Transfer");
        transfer.is_transfer = true;
        let records = vec![transfer, tx(2, "PAYROLL", 2000.0, "Income")];
        assert!(top_merchants(&records, 12).is_empty());
    }

    #[test]
    fn test_crosstab_shape() {
        let cells = vec![
            cell(2024, 1, "Groceries", 100.0),
            cell(2024, 1, "Gas", 40.0),
            cell(2024, 2, "Groceries", 120.0),
        ];
        let grid = crosstab(&cells);
        assert_eq!(grid.categories, vec!["Groceries", "Gas"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0].totals, vec![100.0, 40.0]);
        // Gas has no February cell: zero-filled
        assert_eq!(grid.rows[1].totals, vec![120.0, 0.0]);
    }

    #[test]
    fn test_budget_status_latest_month_only() {
        let cells = vec![
            cell(2024, 1, "Groceries", 500.0),
            cell(2024, 2, "Groceries", 300.0),
        ];
        let budgets = HashMap::from([("Groceries".to_string(), 400.0)]);
        let rows = budget_status(&cells, &budgets);
        assert_eq!(rows.len(), 1);
        assert!((rows[0].spent - 300.0).abs() < 1e-9);
        assert!((rows[0].pct_used - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_budget_status_unspent_category_listed() {
        let cells = vec![cell(2024, 1, "Groceries", 100.0)];
        let budgets = HashMap::from([("Travel".to_string(), 200.0)]);
        let rows = budget_status(&cells, &budgets);
        assert_eq!(rows[0].spent, 0.0);
        assert_eq!(rows[0].pct_used, 0.0);
    }

    #[test]
    fn test_month_comparison_uses_last_two_months() {
        let cells = vec![
            cell(2024, 1, "Groceries", 100.0),
            cell(2024, 2, "Groceries", 200.0),
            cell(2024, 3, "Groceries", 300.0),
            cell(2024, 3, "Gas", 50.0),
        ];
        let cmp = month_comparison(&cells);
        assert_eq!(cmp.current_month, Some(YearMonth::new(2024, 3)));
        assert_eq!(cmp.previous_month, Some(YearMonth::new(2024, 2)));
        assert_eq!(cmp.categories, vec!["Groceries", "Gas"]);
        assert_eq!(cmp.current, vec![300.0, 50.0]);
        assert_eq!(cmp.previous, vec![200.0, 0.0]);
    }

    #[test]
    fn test_month_comparison_needs_two_months() {
        let cells = vec![cell(2024, 1, "Groceries", 100.0)];
        let cmp = month_comparison(&cells);
        assert!(cmp.current_month.is_none());
        assert!(cmp.categories.is_empty());
    }

    #[test]
    fn test_report_filtered_subsets() {
        let mut a = tx(1, "BIG SPEND", -900.0, "Groceries");
        a.is_anomaly = true;
        a.anomaly_score = Some(2.5);
        let mut b = tx(2, "NETFLIX.COM", -15.0, "Subscriptions");
        b.is_recurring = true;
        b.recurring_group_id = Some("checking:netflix-com:-15".to_string());
        let report = AnalysisReport {
            transactions: vec![a, b, tx(3, "KROGER", -40.0, "Groceries")],
            ..AnalysisReport::default()
        };
        assert_eq!(report.anomalies().len(), 1);
        assert_eq!(report.anomalies()[0].row_id, 1);
        assert_eq!(report.recurring_members().len(), 1);
        assert_eq!(report.recurring_members()[0].row_id, 2);
    }
}

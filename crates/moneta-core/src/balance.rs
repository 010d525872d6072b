//! Running balances and monthly aggregation
//!
//! Sorts the record set chronologically, writes per-account running balances,
//! and derives the Monthly Summary and Category-Month Summary tables.
//! Transfers and duplicates are excluded from income/expense aggregates;
//! they still flow through the balance math because the money really moved.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::models::{BalancePoint, CategoryMonthSummary, MonthlySummary, Transaction, YearMonth};

/// Derived tables produced by the balance pass
#[derive(Debug, Default, Clone)]
pub struct BalanceTables {
    pub monthly_summary: Vec<MonthlySummary>,
    pub category_month: Vec<CategoryMonthSummary>,
    /// Cross-account balance series, one point per record in date order
    pub overall_balance: Vec<BalancePoint>,
}

pub struct BalanceAggregator {
    starting_balance: f64,
}

impl BalanceAggregator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            starting_balance: config.starting_balance,
        }
    }

    /// Sort records by `(date, row_id)`, write running balances, and build
    /// the monthly tables
    ///
    /// Each account's balance starts from the configured starting balance;
    /// the overall series applies it once at the earliest date.
    pub fn apply(&self, records: &mut Vec<Transaction>) -> BalanceTables {
        records.sort_by_key(|t| (t.date, t.row_id));

        let mut per_account: HashMap<String, f64> = HashMap::new();
        let mut overall = self.starting_balance;
        let mut overall_balance = Vec::with_capacity(records.len());

        for tx in records.iter_mut() {
            let balance = per_account
                .entry(tx.account.clone())
                .or_insert(self.starting_balance);
            *balance += tx.amount;
            tx.running_balance = Some(*balance);

            overall += tx.amount;
            overall_balance.push(BalancePoint {
                date: tx.date,
                balance: overall,
            });
        }

        let monthly_summary = monthly_summary(records);
        let category_month = category_month_summary(records);

        debug!(
            "Balance pass: {} records, {} months, {} category-month cells",
            records.len(),
            monthly_summary.len(),
            category_month.len()
        );

        BalanceTables {
            monthly_summary,
            category_month,
            overall_balance,
        }
    }
}

/// Income vs. expenses per calendar month
///
/// Income is the sum of positive amounts, expenses the absolute sum of
/// negative amounts. Savings rate is net/income with a zero-income guard.
fn monthly_summary(records: &[Transaction]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<YearMonth, (f64, f64)> = BTreeMap::new();
    for tx in records {
        if !tx.counts_in_aggregates() {
            continue;
        }
        let entry = months.entry(tx.year_month()).or_insert((0.0, 0.0));
        if tx.amount > 0.0 {
            entry.0 += tx.amount;
        } else {
            entry.1 += -tx.amount;
        }
    }

    months
        .into_iter()
        .map(|(year_month, (income, expenses))| {
            let net = income - expenses;
            let savings_rate = if income > 0.0 { net / income } else { 0.0 };
            MonthlySummary {
                year_month,
                income,
                expenses,
                net,
                savings_rate,
            }
        })
        .collect()
}

/// Expense totals per (month, category), months ascending and spend
/// descending within a month
fn category_month_summary(records: &[Transaction]) -> Vec<CategoryMonthSummary> {
    let mut cells: BTreeMap<(YearMonth, String), f64> = BTreeMap::new();
    for tx in records {
        if !tx.is_expense() || !tx.counts_in_aggregates() {
            continue;
        }
        *cells
            .entry((tx.year_month(), tx.category.clone()))
            .or_insert(0.0) += tx.abs_amount();
    }

    let mut rows: Vec<CategoryMonthSummary> = cells
        .into_iter()
        .map(|((year_month, category), total_spent)| CategoryMonthSummary {
            year_month,
            category,
            total_spent,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.year_month.cmp(&b.year_month).then_with(|| {
            b.total_spent
                .partial_cmp(&a.total_spent)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    rows
}

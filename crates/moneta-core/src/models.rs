//! Domain models for Moneta
//!
//! The central type is [`Transaction`]: the normalized record produced by CSV
//! ingestion and annotated in place by each pipeline stage. Everything else
//! in this module is a derived table row (monthly summaries, recurring
//! groups, top merchants, budget status) assembled by the report module.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar year-month, formatted as "YYYY-MM"
///
/// All monthly aggregation uses naive calendar months in the record's local
/// date; there is no timezone handling anywhere in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid year-month (expected YYYY-MM): {}", s))?;
        let year: i32 = y
            .parse()
            .map_err(|_| format!("Invalid year in year-month: {}", s))?;
        let month: u32 = m
            .parse()
            .map_err(|_| format!("Invalid month in year-month: {}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Month out of range in year-month: {}", s));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A normalized bank transaction
///
/// Core fields (`date`, `description`, `amount`, `account`, `row_id`) are
/// immutable once ingested. Annotation fields are written by the pipeline
/// stages; no stage rewrites a field another stage has already set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable ingestion-order identity, used for traceability and tie-breaks
    pub row_id: u64,
    pub date: NaiveDate,
    /// Raw description text from the bank export
    pub description: String,
    /// Negative = expense, positive = income
    pub amount: f64,
    /// Source account identifier (e.g. "checking", "savings", "cashapp")
    pub account: String,
    /// Original bank-provided category label, if any
    pub bank_category: Option<String>,
    /// Basename of the source CSV file
    pub source_file: Option<String>,
    /// Cleaned merchant display name derived from the description
    pub merchant: String,

    // Annotations, written in pipeline order
    pub category: String,
    pub is_transfer: bool,
    pub is_duplicate: bool,
    pub is_anomaly: bool,
    /// Z-score of the record's category-month when flagged anomalous
    pub anomaly_score: Option<f64>,
    pub is_recurring: bool,
    pub recurring_group_id: Option<String>,
    /// Per-account running balance, set by the balance pass
    pub running_balance: Option<f64>,
}

impl Transaction {
    /// Create a freshly ingested record with default (empty) annotations
    pub fn new(row_id: u64, date: NaiveDate, description: &str, amount: f64, account: &str) -> Self {
        Self {
            row_id,
            date,
            description: description.to_string(),
            amount,
            account: account.to_string(),
            bank_category: None,
            source_file: None,
            merchant: crate::merchant::display_name(description),
            category: "Other".to_string(),
            is_transfer: false,
            is_duplicate: false,
            is_anomaly: false,
            anomaly_score: None,
            is_recurring: false,
            recurring_group_id: None,
            running_balance: None,
        }
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }

    /// True for debits (amount < 0); zero-amount records are neither
    /// expense nor income
    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }

    pub fn abs_amount(&self) -> f64 {
        self.amount.abs()
    }

    /// Whether this record counts toward income/expense/anomaly aggregates.
    /// Transfers move money between the user's own accounts and duplicates
    /// repeat a real charge; neither is real income or spending.
    pub fn counts_in_aggregates(&self) -> bool {
        !self.is_transfer && !self.is_duplicate && self.category != "Transfer"
    }
}

/// Income vs. expenses for one calendar month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year_month: YearMonth,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    /// `net / income`, reported as 0 when income is 0
    pub savings_rate: f64,
}

/// Total spend for one (month, category) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMonthSummary {
    pub year_month: YearMonth,
    pub category: String,
    /// Absolute value of expense totals, always positive
    pub total_spent: f64,
}

/// One point of the overall (cross-account) balance series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: f64,
}

/// A confirmed recurring-charge cluster (subscription or bill)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringGroup {
    pub group_id: String,
    pub account: String,
    /// Normalized merchant key the group was clustered on
    pub merchant_key: String,
    /// Cleaned display name of the first member's merchant
    pub merchant: String,
    pub category: String,
    /// Median member amount
    pub typical_amount: f64,
    /// Mean gap between consecutive charges, in days
    pub typical_interval_days: f64,
    /// Member row ids in date order
    pub member_row_ids: Vec<u64>,
}

impl RecurringGroup {
    pub fn occurrences(&self) -> usize {
        self.member_row_ids.len()
    }
}

/// One row of the ranked top-merchants table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopMerchant {
    pub merchant: String,
    pub total_spent: f64,
    pub transactions: usize,
    pub avg_amount: f64,
    /// Most common category among the merchant's records
    pub category: String,
}

/// Latest-month spend measured against a configured budget limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub category: String,
    pub budget: f64,
    pub spent: f64,
    pub pct_used: f64,
}

/// Month-over-month category comparison (the two most recent months)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthComparison {
    pub current_month: Option<YearMonth>,
    pub previous_month: Option<YearMonth>,
    /// Categories ordered by current-month spend descending
    pub categories: Vec<String>,
    pub current: Vec<f64>,
    pub previous: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: f64) -> Transaction {
        Transaction::new(
            1,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            "NETFLIX.COM",
            amount,
            "checking",
        )
    }

    #[test]
    fn test_year_month_display_and_parse() {
        let ym = YearMonth::new(2024, 3);
        assert_eq!(ym.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<YearMonth>().unwrap(), ym);
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("202403".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_year_month_ordering() {
        let a = YearMonth::new(2023, 12);
        let b = YearMonth::new(2024, 1);
        assert!(a < b);
    }

    #[test]
    fn test_transaction_expense_flags() {
        assert!(tx(-15.99).is_expense());
        assert!(!tx(15.99).is_expense());
        // Zero-amount records are valid but neither income nor expense
        assert!(!tx(0.0).is_expense());
        assert_eq!(tx(-15.99).abs_amount(), 15.99);
    }

    #[test]
    fn test_counts_in_aggregates() {
        let mut t = tx(-15.99);
        assert!(t.counts_in_aggregates());
        t.is_duplicate = true;
        assert!(!t.counts_in_aggregates());
        t.is_duplicate = false;
        t.category = "Transfer".to_string();
        assert!(!t.counts_in_aggregates());
    }
}

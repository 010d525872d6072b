//! Moneta Core Library
//!
//! Shared functionality for the Moneta transaction analysis tool:
//! - CSV import parsers for various banks and payment apps
//! - Keyword-rule categorization with YAML-configured categories
//! - Transfer and duplicate detection across accounts
//! - Running balances and monthly summaries
//! - Statistical anomaly detection on category-month totals
//! - Recurring-charge identification
//! - Report assembly, CSV/JSON export, and plain-text summaries

pub mod anomaly;
pub mod balance;
pub mod categorize;
pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod export;
pub mod import;
pub mod merchant;
pub mod models;
pub mod pipeline;
pub mod recurring;
pub mod report;

pub use anomaly::{AnomalyDetector, AnomalyResults};
pub use balance::{BalanceAggregator, BalanceTables};
pub use categorize::{Categorizer, FALLBACK_CATEGORY, TRANSFER_CATEGORY};
pub use config::{AnalysisConfig, CategoryRule, CategoryRules, ConfigFile};
pub use detect::{DetectionResults, Detector};
pub use error::{Error, Result};
pub use export::ExportStats;
pub use import::{ImportStats, SourceFormat};
pub use models::{
    BalancePoint, BudgetStatus, CategoryMonthSummary, MonthComparison, MonthlySummary,
    RecurringGroup, TopMerchant, Transaction, YearMonth,
};
pub use pipeline::{Pipeline, RunSummary};
pub use report::{AnalysisReport, CategoryCrosstab, CrosstabRow};

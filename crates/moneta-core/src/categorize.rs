//! Keyword-based transaction categorization
//!
//! Priority-ordered pattern dispatch: categories are evaluated in the order
//! they are declared in categories.yaml, keywords in declared order within a
//! category, and the first substring match wins. An unmatched description is
//! a normal outcome ("Other"), not an error.

use tracing::debug;

use crate::config::CategoryRules;
use crate::models::Transaction;

/// Category assigned when no rule matches
pub const FALLBACK_CATEGORY: &str = "Other";

/// Category forced for inter-account movements surfaced by the bank export
/// itself (Cash App cash-out/add-cash rows)
pub const TRANSFER_CATEGORY: &str = "Transfer";

/// Bank-provided transaction types that always denote inter-account movement
const FORCED_TRANSFER_TYPES: [&str; 2] = ["withdrawal", "deposits"];

pub struct Categorizer<'a> {
    rules: &'a CategoryRules,
}

impl<'a> Categorizer<'a> {
    pub fn new(rules: &'a CategoryRules) -> Self {
        Self { rules }
    }

    /// Match a single description against the rule set
    ///
    /// Pure and deterministic: lower-cases the description and returns the
    /// first category whose keyword list contains a substring match, or
    /// [`FALLBACK_CATEGORY`] when nothing matches.
    pub fn categorize(&self, description: &str) -> &str {
        let desc_lower = description.to_lowercase();
        for rule in self.rules.iter() {
            for keyword in &rule.keywords {
                if desc_lower.contains(keyword.as_str()) {
                    return &rule.name;
                }
            }
        }
        FALLBACK_CATEGORY
    }

    /// Assign a category to every record in place
    ///
    /// Records whose `bank_category` marks a Cash App withdrawal/deposit are
    /// forced to Transfer regardless of keywords: they are inter-account
    /// movements that also appear in the linked bank account.
    pub fn apply(&self, records: &mut [Transaction]) {
        let mut forced = 0usize;
        for tx in records.iter_mut() {
            let bank_type = tx
                .bank_category
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default();
            if FORCED_TRANSFER_TYPES.contains(&bank_type.as_str()) {
                tx.category = TRANSFER_CATEGORY.to_string();
                forced += 1;
            } else {
                tx.category = self.categorize(&tx.description).to_string();
            }
        }
        debug!(
            "Categorized {} records ({} forced to Transfer)",
            records.len(),
            forced
        );
    }
}

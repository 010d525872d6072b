//! Analysis configuration
//!
//! Two layers live here:
//! - [`CategoryRules`]: the ordered category → keyword mapping loaded from
//!   categories.yaml. Declared order is matching priority, so the rules are
//!   kept in a `Vec` — never an unordered map that could silently reorder.
//! - [`AnalysisConfig`]: the immutable configuration object passed into the
//!   pipeline (thresholds, windows, budgets, date filter). There is no
//!   process-wide mutable state; runs with different configs never interfere.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::YearMonth;

/// One category with its ordered keyword list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    /// Lowercase substrings, matched in declared order
    pub keywords: Vec<String>,
}

/// Ordered category rule set (first match wins)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl CategoryRules {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Build a rule set from (category, keywords) pairs, lower-casing keywords
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(name, keywords)| CategoryRule {
                name: name.into(),
                keywords: keywords
                    .into_iter()
                    .map(|k| k.into().to_lowercase())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All configured category names in declared order
    pub fn category_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Parsed categories.yaml: ordered rules plus optional budget limits
///
/// Expected shape:
/// ```yaml
/// categories:
///   Groceries: [kroger, aldi, trader joe]
///   Subscriptions: [netflix, spotify]
/// budgets:
///   Groceries: 400
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub rules: CategoryRules,
    pub budgets: HashMap<String, f64>,
}

impl ConfigFile {
    /// Load and validate a categories.yaml file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read categories file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse categories.yaml content, preserving declared category order
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(text)?;
        let root = doc
            .as_mapping()
            .ok_or_else(|| Error::Config("categories.yaml must be a mapping".to_string()))?;

        let categories = root
            .get(Value::from("categories"))
            .and_then(Value::as_mapping)
            .ok_or_else(|| {
                Error::Config("categories.yaml is missing a 'categories' mapping".to_string())
            })?;

        let mut rules = Vec::new();
        for (key, value) in categories {
            let name = key
                .as_str()
                .ok_or_else(|| Error::Config("Category names must be strings".to_string()))?
                .to_string();
            let list = value.as_sequence().ok_or_else(|| {
                Error::Config(format!("Category '{}' must map to a keyword list", name))
            })?;

            let mut keywords = Vec::with_capacity(list.len());
            for kw in list {
                let kw = kw.as_str().ok_or_else(|| {
                    Error::Config(format!("Category '{}' has a non-string keyword", name))
                })?;
                let kw = kw.trim().to_lowercase();
                if kw.is_empty() {
                    return Err(Error::Config(format!(
                        "Category '{}' has an empty keyword",
                        name
                    )));
                }
                keywords.push(kw);
            }
            rules.push(CategoryRule { name, keywords });
        }

        if rules.is_empty() {
            return Err(Error::Config(
                "categories.yaml defines no categories".to_string(),
            ));
        }

        let mut budgets = HashMap::new();
        if let Some(map) = root.get(Value::from("budgets")).and_then(Value::as_mapping) {
            for (key, value) in map {
                let name = key
                    .as_str()
                    .ok_or_else(|| Error::Config("Budget keys must be strings".to_string()))?;
                let limit = value.as_f64().ok_or_else(|| {
                    Error::Config(format!("Budget for '{}' must be a number", name))
                })?;
                if limit < 0.0 {
                    return Err(Error::Config(format!(
                        "Budget for '{}' must be non-negative",
                        name
                    )));
                }
                budgets.insert(name.to_string(), limit);
            }
        }

        debug!(
            "Loaded {} category rules, {} budget limits",
            rules.len(),
            budgets.len()
        );

        Ok(Self {
            rules: CategoryRules::new(rules),
            budgets,
        })
    }
}

/// Immutable configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Ordered category keyword rules
    pub rules: CategoryRules,
    /// Monthly budget limits by category (missing = unbounded)
    pub budgets: HashMap<String, f64>,
    /// Z-score threshold for flagging anomalous category-months
    pub std_threshold: f64,
    /// Balance before the first transaction
    pub starting_balance: f64,
    /// Max day distance for cross-account transfer pairing
    pub transfer_window_days: i64,
    /// Max day distance for same-account repeated-charge duplicates
    pub duplicate_window_days: i64,
    /// Months of history a category needs before anomaly scoring
    pub min_history_months: usize,
    /// Max coefficient of variation of recurring-charge intervals
    pub interval_cv_tolerance: f64,
    /// Inclusive lower bound of the analysis date range
    pub start_month: Option<YearMonth>,
    /// Inclusive upper bound of the analysis date range
    pub end_month: Option<YearMonth>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rules: CategoryRules::default(),
            budgets: HashMap::new(),
            std_threshold: 2.0,
            starting_balance: 0.0,
            transfer_window_days: 2,
            duplicate_window_days: 1,
            min_history_months: 3,
            interval_cv_tolerance: 0.25,
            start_month: None,
            end_month: None,
        }
    }
}

impl AnalysisConfig {
    /// Build a config from a loaded categories file, keeping scalar defaults
    pub fn with_config_file(file: ConfigFile) -> Self {
        Self {
            rules: file.rules,
            budgets: file.budgets,
            ..Self::default()
        }
    }

    /// Fail-fast structural validation, run before any pipeline stage
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(Error::Config(
                "Category rule set is empty; downstream results would be meaningless".to_string(),
            ));
        }
        if !self.std_threshold.is_finite() || self.std_threshold <= 0.0 {
            return Err(Error::Config(format!(
                "std_threshold must be positive, got {}",
                self.std_threshold
            )));
        }
        if self.transfer_window_days < 0 || self.duplicate_window_days < 0 {
            return Err(Error::Config(
                "Matching windows must be non-negative".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_month, self.end_month) {
            if start > end {
                return Err(Error::Config(format!(
                    "Date filter start {} is after end {}",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

//! Statistical anomaly detection
//!
//! For each category, the monthly expense totals form a series; months whose
//! z-score against that series clears the configured threshold are anomalous.
//! The month-level flag then cascades to the transactions that actually drove
//! the deviation: largest-magnitude first, until the flagged records cover at
//! least half of the month's category total.
//!
//! Degenerate statistics never raise: a zero-variance series yields z = 0 for
//! every month, and categories with too little history are skipped and
//! counted, not errored.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::categorize::TRANSFER_CATEGORY;
use crate::config::AnalysisConfig;
use crate::models::{Transaction, YearMonth};

/// Share of a month's category total the flagged records must cover
const CASCADE_COVERAGE: f64 = 0.5;

/// Results of one anomaly pass
#[derive(Debug, Default, Clone, Copy)]
pub struct AnomalyResults {
    pub records_flagged: usize,
    pub months_flagged: usize,
    /// Categories skipped for insufficient history
    pub categories_skipped: usize,
}

pub struct AnomalyDetector {
    std_threshold: f64,
    min_history_months: usize,
}

impl AnomalyDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            std_threshold: config.std_threshold,
            min_history_months: config.min_history_months,
        }
    }

    /// Score category-month totals and cascade flags onto records in place
    pub fn run(&self, records: &mut [Transaction]) -> AnomalyResults {
        // Category -> month -> (total, member indices). BTreeMaps keep the
        // scan order deterministic.
        let mut series: BTreeMap<String, BTreeMap<YearMonth, (f64, Vec<usize>)>> = BTreeMap::new();
        for (idx, tx) in records.iter().enumerate() {
            if !tx.is_expense() || !tx.counts_in_aggregates() || !tx.amount.is_finite() {
                continue;
            }
            if tx.category == TRANSFER_CATEGORY {
                continue;
            }
            let cell = series
                .entry(tx.category.clone())
                .or_default()
                .entry(tx.year_month())
                .or_insert((0.0, Vec::new()));
            cell.0 += tx.abs_amount();
            cell.1.push(idx);
        }

        let mut results = AnomalyResults::default();

        for (category, months) in &series {
            if months.len() < self.min_history_months {
                debug!(
                    "Skipping anomaly scoring for '{}': only {} months of history",
                    category,
                    months.len()
                );
                results.categories_skipped += 1;
                continue;
            }

            let totals: Vec<f64> = months.values().map(|(total, _)| *total).collect();
            let mean = totals.iter().sum::<f64>() / totals.len() as f64;
            let variance =
                totals.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / totals.len() as f64;
            let std_dev = variance.sqrt();

            for (year_month, (total, member_idxs)) in months {
                // Zero-variance series: z = 0 by definition, never a divide
                let z = if std_dev > 0.0 {
                    (total - mean) / std_dev
                } else {
                    0.0
                };
                if z.abs() < self.std_threshold {
                    continue;
                }

                results.months_flagged += 1;
                debug!(
                    "Anomalous month {} in '{}': total {:.2}, z = {:.2}",
                    year_month, category, total, z
                );

                results.records_flagged += cascade_flags(records, member_idxs, *total, z);
            }
        }

        info!(
            "Anomaly pass: {} months flagged, {} records flagged, {} categories skipped",
            results.months_flagged, results.records_flagged, results.categories_skipped
        );
        results
    }
}

/// Flag the largest-magnitude members until they cover [`CASCADE_COVERAGE`]
/// of the month's total, recording the month's z-score on each
fn cascade_flags(records: &mut [Transaction], member_idxs: &[usize], total: f64, z: f64) -> usize {
    let mut ordered: Vec<usize> = member_idxs.to_vec();
    ordered.sort_by(|&a, &b| {
        records[b]
            .abs_amount()
            .partial_cmp(&records[a].abs_amount())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| records[a].row_id.cmp(&records[b].row_id))
    });

    let target = total * CASCADE_COVERAGE;
    let mut covered = 0.0;
    let mut flagged = 0usize;
    for idx in ordered {
        if covered >= target {
            break;
        }
        records[idx].is_anomaly = true;
        records[idx].anomaly_score = Some(z);
        covered += records[idx].abs_amount();
        flagged += 1;
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryRules;
    use chrono::NaiveDate;

    fn config(std_threshold: f64) -> AnalysisConfig {
        AnalysisConfig {
            rules: CategoryRules::from_pairs([("Other", vec!["x"])]),
            std_threshold,
            ..AnalysisConfig::default()
        }
    }

    fn tx(row_id: u64, month: u32, amount: f64, category: &str) -> Transaction {
        let mut t = Transaction::new(
            row_id,
            NaiveDate::from_ymd_opt(2024, month, 15).unwrap(),
            "SOMETHING",
            amount,
            "checking",
        );
        t.category = category.to_string();
        t
    }

    /// One record per month so the month total equals the record amount
    fn monthly_series(amounts: &[f64], category: &str) -> Vec<Transaction> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| tx(i as u64 + 1, i as u32 + 1, -amount, category))
            .collect()
    }

    #[test]
    fn test_outlier_month_flagged() {
        // Nine quiet months and one spike: mean 130, population std 90,
        // z(400) = 3.0
        let mut records = monthly_series(
            &[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 400.0],
            "Groceries",
        );
        let results = AnomalyDetector::new(&config(2.0)).run(&mut records);
        assert_eq!(results.months_flagged, 1);
        let spike = records.iter().find(|t| t.amount == -400.0).unwrap();
        assert!(spike.is_anomaly);
        assert!((spike.anomaly_score.unwrap() - 3.0).abs() < 1e-9);
        assert!(records.iter().filter(|t| t.is_anomaly).count() == 1);
    }

    #[test]
    fn test_short_series_needs_lower_threshold() {
        // For [100, 100, 100, 400] the maximum attainable |z| under a
        // population std is sqrt(3) ~= 1.732, so 2.0 cannot flag it but
        // 1.5 does
        let mut strict = monthly_series(&[100.0, 100.0, 100.0, 400.0], "Groceries");
        let results = AnomalyDetector::new(&config(2.0)).run(&mut strict);
        assert_eq!(results.months_flagged, 0);

        let mut relaxed = monthly_series(&[100.0, 100.0, 100.0, 400.0], "Groceries");
        let results = AnomalyDetector::new(&config(1.5)).run(&mut relaxed);
        assert_eq!(results.months_flagged, 1);
        let spike = relaxed.iter().find(|t| t.amount == -400.0).unwrap();
        assert!(spike.is_anomaly);
        let z = spike.anomaly_score.unwrap();
        assert!((z - 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let amounts = [80.0, 120.0, 100.0, 90.0, 300.0, 110.0];
        let mut strict = monthly_series(&amounts, "Groceries");
        let mut relaxed = monthly_series(&amounts, "Groceries");
        let strict_count = AnomalyDetector::new(&config(2.0)).run(&mut strict).records_flagged;
        let relaxed_count = AnomalyDetector::new(&config(1.5))
            .run(&mut relaxed)
            .records_flagged;
        assert!(relaxed_count >= strict_count);
    }

    #[test]
    fn test_insufficient_history_skipped() {
        let mut records = monthly_series(&[100.0, 400.0], "Groceries");
        let results = AnomalyDetector::new(&config(1.0)).run(&mut records);
        assert_eq!(results.categories_skipped, 1);
        assert_eq!(results.months_flagged, 0);
        assert!(records.iter().all(|t| !t.is_anomaly));
    }

    #[test]
    fn test_zero_variance_never_divides() {
        let mut records = monthly_series(&[100.0, 100.0, 100.0, 100.0], "Groceries");
        let results = AnomalyDetector::new(&config(0.5)).run(&mut records);
        assert_eq!(results.months_flagged, 0);
        assert!(records.iter().all(|t| t.anomaly_score.is_none()));
    }

    #[test]
    fn test_cascade_flags_largest_drivers_only() {
        // One anomalous month with mixed record sizes: the 350 record alone
        // covers >= 50% of the 500 total, the small ones stay unflagged
        let mut records = monthly_series(&[100.0, 100.0, 100.0], "Groceries");
        records.push(tx(10, 4, -350.0, "Groceries"));
        records.push(tx(11, 4, -100.0, "Groceries"));
        records.push(tx(12, 4, -50.0, "Groceries"));
        let results = AnomalyDetector::new(&config(1.5)).run(&mut records);
        assert_eq!(results.months_flagged, 1);
        assert_eq!(results.records_flagged, 1);
        assert!(records.iter().find(|t| t.amount == -350.0).unwrap().is_anomaly);
        assert!(!records.iter().find(|t| t.amount == -50.0).unwrap().is_anomaly);
    }

    #[test]
    fn test_transfer_category_ignored() {
        let mut records = monthly_series(&[100.0, 100.0, 100.0, 900.0], "Transfer");
        let results = AnomalyDetector::new(&config(1.0)).run(&mut records);
        assert_eq!(results.months_flagged, 0);
    }

    #[test]
    fn test_duplicates_excluded_from_series() {
        let mut records = monthly_series(&[100.0, 100.0, 100.0, 400.0], "Groceries");
        records[3].is_duplicate = true;
        // With the spike excluded, only 3 quiet months remain: zero variance
        let results = AnomalyDetector::new(&config(1.5)).run(&mut records);
        assert_eq!(results.months_flagged, 0);
    }
}

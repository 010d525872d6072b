//! Recurring-charge identification
//!
//! Cluster-by-key-then-validate: records are grouped by
//! (account, merchant key, rounded amount) into immutable candidate clusters,
//! then each cluster is accepted or rejected as a pure function of its member
//! dates. A cluster is recurring when it has at least [`MIN_OCCURRENCES`]
//! members, its inter-charge intervals are stable (low coefficient of
//! variation), and the mean interval sits near a known billing cadence.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::merchant;
use crate::models::{RecurringGroup, Transaction};

/// Minimum cluster size before periodicity validation
pub const MIN_OCCURRENCES: usize = 3;

/// Known billing cadences in days (weekly, bi-weekly, monthly, yearly)
const CADENCES: [f64; 4] = [7.0, 14.0, 30.0, 365.0];

/// Relative tolerance around a cadence for the mean interval
const CADENCE_TOLERANCE: f64 = 0.20;

pub struct RecurringIdentifier {
    interval_cv_tolerance: f64,
}

impl RecurringIdentifier {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            interval_cv_tolerance: config.interval_cv_tolerance,
        }
    }

    /// Find recurring groups and flag their members in place
    pub fn run(&self, records: &mut [Transaction]) -> Vec<RecurringGroup> {
        // BTreeMap keys keep group ids and output order deterministic
        let mut clusters: BTreeMap<(String, String, i64), Vec<usize>> = BTreeMap::new();
        for (idx, tx) in records.iter().enumerate() {
            // Duplicates would inject zero-day intervals and distort the
            // periodicity check
            if tx.is_duplicate || !tx.amount.is_finite() {
                continue;
            }
            let key = (
                tx.account.clone(),
                merchant::merchant_key(&tx.description),
                tx.amount.round() as i64,
            );
            clusters.entry(key).or_default().push(idx);
        }

        let mut groups = Vec::new();
        for ((account, merchant_key, bucket), mut member_idxs) in clusters {
            if member_idxs.len() < MIN_OCCURRENCES {
                continue;
            }
            member_idxs.sort_by_key(|&i| (records[i].date, records[i].row_id));

            let dates: Vec<_> = member_idxs.iter().map(|&i| records[i].date).collect();
            let Some(mean_interval) = validate_periodicity(&dates, self.interval_cv_tolerance)
            else {
                continue;
            };

            let group_id = format!("{}:{}:{}", account, merchant_key.replace(' ', "-"), bucket);
            debug!(
                "Recurring group {}: {} members every ~{:.1} days",
                group_id,
                member_idxs.len(),
                mean_interval
            );

            let amounts: Vec<f64> = member_idxs.iter().map(|&i| records[i].amount).collect();
            let category = mode_category(records, &member_idxs);
            let merchant_name = records[member_idxs[0]].merchant.clone();

            for &i in &member_idxs {
                records[i].is_recurring = true;
                records[i].recurring_group_id = Some(group_id.clone());
            }

            groups.push(RecurringGroup {
                group_id,
                account,
                merchant_key,
                merchant: merchant_name,
                category,
                typical_amount: median(&amounts),
                typical_interval_days: mean_interval,
                member_row_ids: member_idxs.iter().map(|&i| records[i].row_id).collect(),
            });
        }

        info!("Recurring pass: {} groups confirmed", groups.len());
        groups
    }
}

/// Validate a date sequence as periodic, returning the mean interval
///
/// Requires a stable interval (population stddev / mean below the tolerance)
/// whose mean is within ±20% of a known cadence.
fn validate_periodicity(dates: &[chrono::NaiveDate], cv_tolerance: f64) -> Option<f64> {
    let deltas: Vec<f64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();
    if deltas.is_empty() {
        return None;
    }

    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    if mean <= 0.0 {
        return None;
    }

    let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / deltas.len() as f64;
    let cv = variance.sqrt() / mean;
    if cv >= cv_tolerance {
        return None;
    }

    let near_cadence = CADENCES
        .iter()
        .any(|&cadence| (mean - cadence).abs() <= cadence * CADENCE_TOLERANCE);
    near_cadence.then_some(mean)
}

/// Median of a non-empty amount list
fn median(amounts: &[f64]) -> f64 {
    let mut sorted = amounts.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most common category among members, ties broken by first occurrence
fn mode_category(records: &[Transaction], member_idxs: &[usize]) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for &i in member_idxs {
        let category = &records[i].category;
        match counts.iter_mut().find(|(c, _)| c == category) {
            Some((_, n)) => *n += 1,
            None => counts.push((category.clone(), 1)),
        }
    }
    counts
        .into_iter()
        .enumerate()
        .max_by_key(|(i, (_, n))| (*n, std::cmp::Reverse(*i)))
        .map(|(_, (c, _))| c)
        .unwrap_or_else(|| "Other".to_string())
}

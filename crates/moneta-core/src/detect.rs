//! Transfer and duplicate detection
//!
//! Two independent sub-policies over the full record set:
//! - Cross-account transfer matching: opposite-signed, equal-magnitude pairs
//!   across different accounts within a small date window, assigned greedily
//!   by date proximity with an explicit consumed set so every record joins at
//!   most one pair.
//! - Repeated-charge duplicates: same-account records with identical
//!   normalized description and amount inside a one-day window; only the
//!   later occurrence is flagged, keeping one canonical record per cluster.
//!
//! Amounts are compared in integer cents so float representation noise can
//! never break the equal-magnitude requirement.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::models::Transaction;

/// Results of one detection pass
#[derive(Debug, Default, Clone, Copy)]
pub struct DetectionResults {
    pub transfer_pairs: usize,
    pub duplicates_flagged: usize,
    /// Records excluded from matching (non-finite amount)
    pub skipped_malformed: usize,
}

/// A transfer candidate before greedy assignment
struct Candidate {
    /// Day distance between the two records
    distance: i64,
    debit_idx: usize,
    credit_idx: usize,
    /// Tie-break key: (debit account, credit account, debit row, credit row)
    key: (String, String, u64, u64),
}

pub struct Detector {
    transfer_window_days: i64,
    duplicate_window_days: i64,
}

impl Detector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            transfer_window_days: config.transfer_window_days,
            duplicate_window_days: config.duplicate_window_days,
        }
    }

    /// Run both detection policies, annotating records in place
    pub fn run(&self, records: &mut [Transaction]) -> DetectionResults {
        let skipped_malformed = records.iter().filter(|t| !t.amount.is_finite()).count();
        if skipped_malformed > 0 {
            warn!(
                "{} records with non-finite amounts excluded from matching",
                skipped_malformed
            );
        }

        let transfer_pairs = self.detect_transfers(records);
        let duplicates_flagged = self.detect_duplicates(records);

        info!(
            "Detection complete: {} transfer pairs, {} duplicates, {} skipped",
            transfer_pairs, duplicates_flagged, skipped_malformed
        );

        DetectionResults {
            transfer_pairs,
            duplicates_flagged,
            skipped_malformed,
        }
    }

    /// Greedy cross-account transfer matching
    ///
    /// Candidate generation is windowed by amount magnitude and date so the
    /// pass never enumerates a full cross-product. Candidates are sorted by
    /// date distance ascending (deterministic tie-break on accounts and row
    /// ids) and confirmed only when neither side was consumed by a closer
    /// match.
    fn detect_transfers(&self, records: &mut [Transaction]) -> usize {
        // Bucket debits and credits by magnitude in cents
        let mut debits: HashMap<i64, Vec<usize>> = HashMap::new();
        let mut credits: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, tx) in records.iter().enumerate() {
            if !tx.amount.is_finite() || tx.amount == 0.0 {
                continue;
            }
            let magnitude = to_cents(tx.amount.abs());
            if tx.amount < 0.0 {
                debits.entry(magnitude).or_default().push(idx);
            } else {
                credits.entry(magnitude).or_default().push(idx);
            }
        }

        let mut candidates = Vec::new();
        for (magnitude, debit_idxs) in &debits {
            let Some(credit_idxs) = credits.get_mut(magnitude) else {
                continue;
            };
            // Sort the credit side by date so the window scan can stop early
            credit_idxs.sort_by_key(|&c| (records[c].date, records[c].row_id));

            for &d in debit_idxs {
                let debit = &records[d];
                let low = debit.date - chrono::Duration::days(self.transfer_window_days);
                let start = credit_idxs.partition_point(|&c| records[c].date < low);
                for &c in &credit_idxs[start..] {
                    let credit = &records[c];
                    let distance = (credit.date - debit.date).num_days();
                    if distance > self.transfer_window_days {
                        break;
                    }
                    if credit.account == debit.account {
                        continue;
                    }
                    candidates.push(Candidate {
                        distance: distance.abs(),
                        debit_idx: d,
                        credit_idx: c,
                        key: (
                            debit.account.clone(),
                            credit.account.clone(),
                            debit.row_id,
                            credit.row_id,
                        ),
                    });
                }
            }
        }

        candidates.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.key.cmp(&b.key)));

        let mut consumed: HashSet<usize> = HashSet::new();
        let mut pairs = 0usize;
        for cand in candidates {
            if consumed.contains(&cand.debit_idx) || consumed.contains(&cand.credit_idx) {
                continue;
            }
            consumed.insert(cand.debit_idx);
            consumed.insert(cand.credit_idx);
            records[cand.debit_idx].is_transfer = true;
            records[cand.credit_idx].is_transfer = true;
            pairs += 1;
        }

        debug!("Confirmed {} transfer pairs", pairs);
        pairs
    }

    /// Same-account repeated-charge detection
    ///
    /// Within each (account, normalized description, amount) cluster sorted
    /// by (date, row_id), the earliest record is the canonical occurrence;
    /// later records within the window of the current canonical are flagged.
    /// A record outside the window becomes the new canonical.
    fn detect_duplicates(&self, records: &mut [Transaction]) -> usize {
        let mut clusters: HashMap<(String, String, i64), Vec<usize>> = HashMap::new();
        for (idx, tx) in records.iter().enumerate() {
            if !tx.amount.is_finite() {
                continue;
            }
            let key = (
                tx.account.clone(),
                normalize_description(&tx.description),
                to_cents(tx.amount),
            );
            clusters.entry(key).or_default().push(idx);
        }

        let mut flagged = 0usize;
        for idxs in clusters.values_mut() {
            if idxs.len() < 2 {
                continue;
            }
            idxs.sort_by_key(|&i| (records[i].date, records[i].row_id));

            let mut canonical = idxs[0];
            for &i in &idxs[1..] {
                let gap = (records[i].date - records[canonical].date).num_days();
                if gap <= self.duplicate_window_days {
                    records[i].is_duplicate = true;
                    flagged += 1;
                } else {
                    canonical = i;
                }
            }
        }

        debug!("Flagged {} duplicate records", flagged);
        flagged
    }
}

/// Round a dollar amount to integer cents for exact comparison
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Case-insensitive, whitespace-normalized description key
fn normalize_description(description: &str) -> String {
    description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

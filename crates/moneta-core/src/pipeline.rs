//! The analysis pipeline
//!
//! A single forward pass over the in-memory record set:
//! categorize → detect transfers/duplicates → sort & compute balances →
//! detect anomalies → detect recurring groups → assemble the report.
//! Each stage only adds annotations; none rewrites a field an earlier stage
//! produced. A run is a pure function of (records, config) and recomputes
//! every derived entity from scratch.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::anomaly::AnomalyDetector;
use crate::balance::BalanceAggregator;
use crate::categorize::Categorizer;
use crate::config::AnalysisConfig;
use crate::detect::Detector;
use crate::error::Result;
use crate::models::Transaction;
use crate::recurring::RecurringIdentifier;
use crate::report::{self, AnalysisReport};

/// Per-run counters: every skipped record and every detection is accounted
/// for, so no stage can drop data silently
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct RunSummary {
    pub records_in: usize,
    /// Records remaining after the date filter
    pub records_analyzed: usize,
    pub filtered_out: usize,
    /// Records excluded from matching stages (non-finite amounts)
    pub malformed_skipped: usize,
    pub transfer_pairs: usize,
    pub duplicates_flagged: usize,
    pub anomalous_months: usize,
    pub anomalies_flagged: usize,
    /// Categories skipped by anomaly scoring for insufficient history
    pub categories_skipped: usize,
    pub recurring_groups: usize,
}

pub struct Pipeline<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline over an ingested record set
    ///
    /// Fails fast on configuration errors before any stage runs; data-quality
    /// issues are absorbed and counted in the returned [`RunSummary`].
    pub fn run(&self, records: Vec<Transaction>) -> Result<AnalysisReport> {
        self.config.validate()?;

        let records_in = records.len();
        let mut records = self.filter_by_date(records);
        let records_analyzed = records.len();
        info!(
            "Pipeline start: {} records ({} filtered out by date range)",
            records_analyzed,
            records_in - records_analyzed
        );

        Categorizer::new(&self.config.rules).apply(&mut records);
        let detection = Detector::new(self.config).run(&mut records);
        let tables = BalanceAggregator::new(self.config).apply(&mut records);
        let anomalies = AnomalyDetector::new(self.config).run(&mut records);
        let recurring_groups = RecurringIdentifier::new(self.config).run(&mut records);

        let run = RunSummary {
            records_in,
            records_analyzed,
            filtered_out: records_in - records_analyzed,
            malformed_skipped: detection.skipped_malformed,
            transfer_pairs: detection.transfer_pairs,
            duplicates_flagged: detection.duplicates_flagged,
            anomalous_months: anomalies.months_flagged,
            anomalies_flagged: anomalies.records_flagged,
            categories_skipped: anomalies.categories_skipped,
            recurring_groups: recurring_groups.len(),
        };

        Ok(report::assemble(
            records,
            tables,
            recurring_groups,
            self.config,
            run,
        ))
    }

    /// Apply the inclusive `[start_month, end_month]` filter before analysis
    fn filter_by_date(&self, records: Vec<Transaction>) -> Vec<Transaction> {
        if self.config.start_month.is_none() && self.config.end_month.is_none() {
            return records;
        }
        records
            .into_iter()
            .filter(|tx| {
                let ym = tx.year_month();
                if let Some(start) = self.config.start_month {
                    if ym < start {
                        return false;
                    }
                }
                if let Some(end) = self.config.end_month {
                    if ym > end {
                        return false;
                    }
                }
                true
            })
            .collect()
    }
}

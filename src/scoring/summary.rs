use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{RiskCategory, ScoredRecord};
use crate::error::{RiskError, RiskResult};

/// Cohort-level statistics for one scored batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub total_count: usize,
    pub risky_count: usize,
    pub risk_rate_percent: f64,
    pub mean_risk_probability_percent: f64,
    /// Always holds all three categories.
    pub category_distribution: BTreeMap<RiskCategory, usize>,
}

impl CohortSummary {
    pub fn from_scored(records: &[ScoredRecord]) -> RiskResult<Self> {
        if records.is_empty() {
            return Err(RiskError::EmptyBatch);
        }

        let total_count = records.len();
        let risky_count = records.iter().filter(|r| r.label == 1).count();
        let probability_sum: f64 = records.iter().map(|r| r.probability_percent()).sum();

        let mut category_distribution: BTreeMap<RiskCategory, usize> =
            RiskCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for record in records {
            *category_distribution.entry(record.category).or_insert(0) += 1;
        }

        Ok(Self {
            total_count,
            risky_count,
            risk_rate_percent: risky_count as f64 / total_count as f64 * 100.0,
            mean_risk_probability_percent: probability_sum / total_count as f64,
            category_distribution,
        })
    }

    #[must_use]
    pub fn count(&self, category: RiskCategory) -> usize {
        self.category_distribution.get(&category).copied().unwrap_or(0)
    }

    /// Share of the cohort in a category, in percent.
    #[must_use]
    pub fn share_percent(&self, category: RiskCategory) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.count(category) as f64 / self.total_count as f64 * 100.0
        }
    }

    /// The four headline lines shown in reports, 2 decimals each.
    #[must_use]
    pub fn summary_lines(&self) -> [String; 4] {
        [
            format!("Total patients: {}", self.total_count),
            format!("Patients at risk: {}", self.risky_count),
            format!("Mean risk probability: {:.2}%", self.mean_risk_probability_percent),
            format!("At-risk rate: {:.2}%", self.risk_rate_percent),
        ]
    }

    /// One legend line per category, in display order.
    #[must_use]
    pub fn distribution_lines(&self) -> Vec<String> {
        RiskCategory::ALL
            .iter()
            .map(|c| format!("{} risk: {} ({:.1}%)", c, self.count(*c), self.share_percent(*c)))
            .collect()
    }
}

/// Aggregate a scored batch.
pub fn summarize(records: &[ScoredRecord]) -> RiskResult<CohortSummary> {
    CohortSummary::from_scored(records)
}

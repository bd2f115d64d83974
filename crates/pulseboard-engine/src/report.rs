//! In-memory run reporting: per-item outcomes, per-batch timing, and the
//! run-level rollup. Discarded after logging and run persistence.

use serde::{Deserialize, Serialize};

use pulseboard_core::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Error,
    Skipped,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Success => "success",
            ItemStatus::Error => "error",
            ItemStatus::Skipped => "skipped",
        }
    }
}

/// The outcome of syncing one company.
///
/// An item is `success` if at least one mapped platform synced; platform
/// failures inside a partially successful item live on the bundle, not
/// here. `skipped` means the company had no provider mappings at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub company_id: i64,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms_synced: Vec<Platform>,
    pub duration_ms: u64,
}

impl ItemOutcome {
    #[must_use]
    pub fn skipped(company_id: i64, duration_ms: u64) -> Self {
        Self {
            company_id,
            status: ItemStatus::Skipped,
            error: None,
            platforms_synced: Vec::new(),
            duration_ms,
        }
    }

    #[must_use]
    pub fn errored(company_id: i64, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            company_id,
            status: ItemStatus::Error,
            error: Some(error.into()),
            platforms_synced: Vec::new(),
            duration_ms,
        }
    }
}

/// Wall-clock timing of one batch within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTiming {
    pub index: usize,
    pub items: usize,
    pub duration_ms: u64,
}

/// Rollup of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub batches: Vec<BatchTiming>,
    pub duration_ms: u64,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunReport {
    /// Build the rollup from collected outcomes and batch timings.
    #[must_use]
    pub fn build(outcomes: Vec<ItemOutcome>, batches: Vec<BatchTiming>, duration_ms: u64) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for outcome in &outcomes {
            match outcome.status {
                ItemStatus::Success => succeeded += 1,
                ItemStatus::Error => failed += 1,
                ItemStatus::Skipped => skipped += 1,
            }
        }
        Self {
            total: outcomes.len(),
            succeeded,
            failed,
            skipped,
            batches,
            duration_ms,
            outcomes,
        }
    }

    /// `true` when every non-skipped item failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }

    /// Total records synced across all successful items.
    #[must_use]
    pub fn platforms_synced(&self) -> usize {
        self.outcomes.iter().map(|o| o.platforms_synced.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_counts_statuses() {
        let outcomes = vec![
            ItemOutcome {
                company_id: 1,
                status: ItemStatus::Success,
                error: None,
                platforms_synced: vec![Platform::Ga, Platform::Yt],
                duration_ms: 120,
            },
            ItemOutcome::errored(2, "all platforms failed", 80),
            ItemOutcome::skipped(3, 1),
        ];
        let report = RunReport::build(outcomes, Vec::new(), 500);

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.platforms_synced(), 2);
        assert!(!report.all_failed());
    }

    #[test]
    fn all_failed_requires_at_least_one_failure() {
        let report = RunReport::build(vec![ItemOutcome::skipped(1, 0)], Vec::new(), 10);
        assert!(!report.all_failed());

        let report = RunReport::build(
            vec![ItemOutcome::errored(1, "boom", 5)],
            Vec::new(),
            10,
        );
        assert!(report.all_failed());
    }
}

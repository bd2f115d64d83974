//! Fire-and-forget background refresh queue.
//!
//! The resolver enqueues a task when it serves stale data; the worker
//! drains the queue through the orchestrator's single-company code path.
//! Enqueueing never blocks and failures are logged, not surfaced to the
//! request that triggered them.

use std::sync::Arc;

use tokio::sync::mpsc;

use pulseboard_core::DateRange;

use crate::orchestrator::SyncOrchestrator;
use crate::report::ItemStatus;

#[derive(Debug, Clone)]
pub struct RefreshTask {
    pub company_id: i64,
    pub range: DateRange,
}

/// Sender half of the refresh queue, held by the resolver.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<RefreshTask>,
}

impl RefreshHandle {
    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::UnboundedSender<RefreshTask>) -> Self {
        Self { tx }
    }

    /// Queue a refresh for one company and range. Returns immediately.
    pub fn enqueue(&self, company_id: i64, range: DateRange) {
        let task = RefreshTask { company_id, range };
        if self.tx.send(task).is_err() {
            tracing::warn!(company_id, "refresh queue is closed; dropping refresh task");
        }
    }
}

/// Spawn the queue consumer and return the handle producers use.
///
/// Tasks are processed one at a time, in arrival order, which naturally
/// serializes background load from many concurrent foreground requests.
#[must_use]
pub fn spawn_refresh_worker(orchestrator: Arc<SyncOrchestrator>) -> RefreshHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<RefreshTask>();

    tokio::spawn(async move {
        while let Some(task) = rx.recv().await {
            tracing::info!(
                company_id = task.company_id,
                range = %task.range,
                "refresh: syncing stale company"
            );
            let outcome = orchestrator.sync_company(task.company_id, task.range).await;
            match outcome.status {
                ItemStatus::Error => {
                    tracing::warn!(
                        company_id = task.company_id,
                        error = outcome.error.as_deref().unwrap_or("unknown"),
                        "refresh: background sync failed"
                    );
                }
                _ => {
                    tracing::debug!(
                        company_id = task.company_id,
                        platforms = outcome.platforms_synced.len(),
                        duration_ms = outcome.duration_ms,
                        "refresh: background sync finished"
                    );
                }
            }
        }
    });

    RefreshHandle { tx }
}

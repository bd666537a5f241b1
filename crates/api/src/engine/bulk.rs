//! Bulk operation coordinator.
//!
//! Applies one [`BulkOperationKind`] to every page of a batch, independently
//! and in input order. A failing page is recorded and the run moves on; the
//! result always holds exactly one outcome per input entry. Large batches run
//! on a background task and report through the `bulk_operations` table.

use std::time::Duration;

use chrono::Utc;
use pagetree_core::bulk::{batch_entries, BatchEntry, BulkFailureReason, BulkOperationKind, BulkResult};
use pagetree_core::error::CoreError;
use pagetree_core::types::DbId;
use pagetree_db::repositories::{BulkOperationRepo, PageRepo, PageTreeRepo};
use pagetree_db::{DbError, DbPool};
use tokio_util::task::TaskTracker;

/// Tracks background bulk runs so shutdown can wait for them to finish.
#[derive(Clone, Default)]
pub struct BulkTracker {
    tasks: TaskTracker,
}

impl BulkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runs still executing.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting new runs and wait up to `timeout` for the rest.
    ///
    /// Returns `false` if runs were still executing when the timeout elapsed.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tasks.close();
        tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok()
    }

    /// Execute a recorded run on a background task.
    ///
    /// Once [`drain`](Self::drain) has started the run is not spawned; it is
    /// marked failed instead and `false` is returned.
    pub async fn spawn_run(
        &self,
        pool: DbPool,
        run_id: DbId,
        page_ids: Vec<DbId>,
        operation: BulkOperationKind,
        actor: DbId,
    ) -> bool {
        if self.tasks.is_closed() {
            tracing::warn!(run_id, "Bulk run refused during shutdown");
            record_failure(&pool, run_id, "Server is shutting down").await;
            return false;
        }
        self.tasks
            .spawn(run_in_background(pool, run_id, page_ids, operation, actor));
        true
    }
}

/// Apply `operation` to every page in `page_ids`.
///
/// A repeated id is processed once; later occurrences are reported as
/// `duplicate_entry` failures.
pub async fn apply_bulk(
    pool: &DbPool,
    page_ids: &[DbId],
    operation: &BulkOperationKind,
    actor: DbId,
) -> BulkResult {
    let mut result = BulkResult::with_capacity(page_ids.len());

    for entry in batch_entries(page_ids) {
        match entry {
            BatchEntry::Repeat(page_id) => {
                result.record_failure(page_id, BulkFailureReason::DuplicateEntry);
            }
            BatchEntry::First(page_id) => {
                let outcome = apply_one(pool, page_id, operation, actor).await;
                if let Err(err) = &outcome {
                    tracing::warn!(
                        page_id,
                        actor_id = actor,
                        operation = operation.as_str(),
                        error = %err,
                        "Bulk item failed"
                    );
                }
                result.record(page_id, &outcome);
            }
        }
    }

    tracing::info!(
        actor_id = actor,
        operation = operation.as_str(),
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Bulk operation finished"
    );
    result
}

/// Apply the operation to one page in its own transaction.
async fn apply_one(
    pool: &DbPool,
    page_id: DbId,
    operation: &BulkOperationKind,
    actor: DbId,
) -> Result<(), CoreError> {
    let now = Utc::now();
    let outcome: Result<(), DbError> = match operation {
        BulkOperationKind::SetStatus { status } => {
            PageRepo::set_status(pool, page_id, *status, actor, now)
                .await
                .map(|_| ())
        }
        BulkOperationKind::Duplicate => PageTreeRepo::duplicate(pool, page_id, actor, now)
            .await
            .map(|_| ()),
        BulkOperationKind::ApplyTemplate { template_id } => {
            PageTreeRepo::apply_template(pool, page_id, *template_id, actor, now)
                .await
                .map(|_| ())
        }
        BulkOperationKind::Delete => PageRepo::soft_delete(pool, page_id, actor, now).await,
    };
    outcome.map_err(DbError::into_core)
}

/// Body of a background run: mark running, execute, store the result.
async fn run_in_background(
    pool: DbPool,
    run_id: DbId,
    page_ids: Vec<DbId>,
    operation: BulkOperationKind,
    actor: DbId,
) {
    if let Err(e) = BulkOperationRepo::mark_running(&pool, run_id, Utc::now()).await {
        tracing::error!(run_id, error = %e, "Failed to mark bulk run as running");
        record_failure(&pool, run_id, "Failed to start bulk run").await;
        return;
    }

    let result = apply_bulk(&pool, &page_ids, &operation, actor).await;

    if let Err(e) = BulkOperationRepo::complete(&pool, run_id, &result, Utc::now()).await {
        tracing::error!(run_id, error = %e, "Failed to store bulk run result");
        record_failure(&pool, run_id, "Failed to store bulk run result").await;
        return;
    }

    tracing::info!(
        run_id,
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Background bulk run completed"
    );
}

async fn record_failure(pool: &DbPool, run_id: DbId, message: &str) {
    if let Err(e) = BulkOperationRepo::fail(pool, run_id, message, Utc::now()).await {
        tracing::error!(run_id, error = %e, "Failed to mark bulk run as failed");
    }
}

//! Repository for the `bulk_operations` table.

use pagetree_core::bulk::{BulkOperationKind, BulkResult, BulkRunStatus};
use pagetree_core::error::CoreError;
use pagetree_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::bulk_operation::BulkOperation;
use crate::DbError;

/// Column list shared across queries.
const COLUMNS: &str = "id, operation, page_ids, status, total_count, result, error_message, \
                       requested_by, started_at, completed_at, created_at, updated_at";

/// Records background bulk runs so they can be polled.
pub struct BulkOperationRepo;

impl BulkOperationRepo {
    /// Insert a pending run.
    pub async fn create(
        pool: &PgPool,
        operation: &BulkOperationKind,
        page_ids: &[DbId],
        requested_by: DbId,
    ) -> Result<BulkOperation, DbError> {
        let operation = serde_json::to_value(operation)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize operation: {e}")))?;
        let query = format!(
            "INSERT INTO bulk_operations (operation, page_ids, status, total_count, requested_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let run = sqlx::query_as::<_, BulkOperation>(&query)
            .bind(&operation)
            .bind(page_ids)
            .bind(BulkRunStatus::Pending.as_str())
            .bind(page_ids.len() as i32)
            .bind(requested_by)
            .fetch_one(pool)
            .await?;
        Ok(run)
    }

    /// Find a run by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BulkOperation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_operations WHERE id = $1");
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a pending run to `running`.
    pub async fn mark_running(pool: &PgPool, id: DbId, now: Timestamp) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bulk_operations SET status = $2, started_at = $3 WHERE id = $1")
            .bind(id)
            .bind(BulkRunStatus::Running.as_str())
            .bind(now)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Store the per-item result of a finished run.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result: &BulkResult,
        now: Timestamp,
    ) -> Result<(), DbError> {
        let result = serde_json::to_value(result)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize bulk result: {e}")))?;
        sqlx::query(
            "UPDATE bulk_operations SET status = $2, result = $3, completed_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(BulkRunStatus::Completed.as_str())
        .bind(&result)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a run as failed as a whole (the coordinator itself broke down).
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        message: &str,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE bulk_operations SET status = $2, error_message = $3, completed_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(BulkRunStatus::Failed.as_str())
        .bind(message)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }
}

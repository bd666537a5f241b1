//! Bulk operation run records.
//!
//! Synchronous runs return their result directly; background runs are
//! recorded here so callers can poll for the outcome.

use pagetree_core::bulk::{BulkOperationKind, BulkResult, BulkRunStatus};
use pagetree_core::error::CoreError;
use pagetree_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `bulk_operations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BulkOperation {
    pub id: DbId,
    pub operation: serde_json::Value,
    pub page_ids: Vec<DbId>,
    pub status: String,
    pub total_count: i32,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub requested_by: DbId,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BulkOperation {
    pub fn run_status(&self) -> Result<BulkRunStatus, CoreError> {
        BulkRunStatus::from_str_value(&self.status)
    }

    /// Decode the stored result, present once the run has completed.
    pub fn decoded_result(&self) -> Result<Option<BulkResult>, CoreError> {
        self.result
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| CoreError::Internal(format!("Corrupt bulk result for run {}: {e}", self.id)))
    }
}

/// Body of `POST /pages/bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest {
    pub page_ids: Vec<DbId>,
    pub operation: BulkOperationKind,
    /// Force a background run regardless of batch size.
    #[serde(default, rename = "async")]
    pub run_async: bool,
}

/// Response body of a synchronous bulk run.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResponse {
    pub operation: &'static str,
    #[serde(flatten)]
    pub result: BulkResult,
}

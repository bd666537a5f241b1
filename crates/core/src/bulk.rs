//! Bulk page operations: operation kinds, batch validation, run statuses and
//! the per-item result ledger.
//!
//! A bulk run is best-effort. Every input entry ends up in exactly one of
//! `succeeded` or `failed`; one item's failure never stops the rest.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::content_tree::PageStatus;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum number of page ids in one bulk request.
pub const MAX_BULK_SIZE: usize = 500;

/// Batches larger than this run in the background unless configured otherwise.
pub const DEFAULT_ASYNC_THRESHOLD: usize = 50;

// ---------------------------------------------------------------------------
// Operation kinds
// ---------------------------------------------------------------------------

/// The mutation applied to every page in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BulkOperationKind {
    SetStatus { status: PageStatus },
    Duplicate,
    ApplyTemplate { template_id: DbId },
    Delete,
}

impl BulkOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetStatus { .. } => "set_status",
            Self::Duplicate => "duplicate",
            Self::ApplyTemplate { .. } => "apply_template",
            Self::Delete => "delete",
        }
    }
}

/// Validate the id list of a bulk request.
pub fn validate_batch(page_ids: &[DbId]) -> Result<(), CoreError> {
    if page_ids.is_empty() {
        return Err(CoreError::Validation(
            "page_ids must contain at least one id".into(),
        ));
    }
    if page_ids.len() > MAX_BULK_SIZE {
        return Err(CoreError::Validation(format!(
            "page_ids has {} entries, maximum is {MAX_BULK_SIZE}",
            page_ids.len()
        )));
    }
    Ok(())
}

/// Decide whether a batch should run in the background.
pub fn should_run_async(batch_len: usize, threshold: usize, requested: bool) -> bool {
    requested || batch_len > threshold
}

/// One input entry, tagged with whether its id was already seen earlier in
/// the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEntry {
    First(DbId),
    Repeat(DbId),
}

/// Walk the input ids in order, flagging repeats so they can be reported
/// instead of processed twice.
pub fn batch_entries(page_ids: &[DbId]) -> Vec<BatchEntry> {
    let mut seen = HashSet::with_capacity(page_ids.len());
    page_ids
        .iter()
        .map(|&id| {
            if seen.insert(id) {
                BatchEntry::First(id)
            } else {
                BatchEntry::Repeat(id)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why a single item failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum BulkFailureReason {
    LockConflict {
        holder_id: DbId,
        acquired_at: Timestamp,
    },
    NotFound,
    Validation {
        message: String,
    },
    DuplicateEntry,
    Internal {
        message: String,
    },
}

impl From<&CoreError> for BulkFailureReason {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::LockConflict {
                holder_id,
                acquired_at,
                ..
            } => Self::LockConflict {
                holder_id: *holder_id,
                acquired_at: *acquired_at,
            },
            CoreError::NotFound { .. } | CoreError::VersionNotFound { .. } => Self::NotFound,
            CoreError::Validation(_)
            | CoreError::Conflict(_)
            | CoreError::InvalidReorder(_)
            | CoreError::SlugTaken { .. }
            | CoreError::KeywordConflict { .. }
            | CoreError::Unauthorized(_)
            | CoreError::Forbidden(_) => Self::Validation {
                message: err.to_string(),
            },
            CoreError::Internal(msg) => Self::Internal {
                message: msg.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub page_id: DbId,
    pub reason: BulkFailureReason,
}

/// Outcome of a bulk run: one entry per input id, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub succeeded: Vec<DbId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            succeeded: Vec::with_capacity(n),
            failed: Vec::new(),
        }
    }

    pub fn record_success(&mut self, page_id: DbId) {
        self.succeeded.push(page_id);
    }

    pub fn record_failure(&mut self, page_id: DbId, reason: BulkFailureReason) {
        self.failed.push(BulkFailure { page_id, reason });
    }

    /// Record the outcome of one item.
    pub fn record<T>(&mut self, page_id: DbId, outcome: &Result<T, CoreError>) {
        match outcome {
            Ok(_) => self.record_success(page_id),
            Err(err) => self.record_failure(page_id, BulkFailureReason::from(err)),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when the result accounts for every entry of `page_ids`.
    pub fn covers(&self, page_ids: &[DbId]) -> bool {
        if self.total() != page_ids.len() {
            return false;
        }
        let mut remaining: Vec<DbId> = page_ids.to_vec();
        for id in self
            .succeeded
            .iter()
            .chain(self.failed.iter().map(|f| &f.page_id))
        {
            match remaining.iter().position(|r| r == id) {
                Some(pos) => {
                    remaining.swap_remove(pos);
                }
                None => return false,
            }
        }
        remaining.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Background run statuses
// ---------------------------------------------------------------------------

pub const RUN_PENDING: &str = "pending";
pub const RUN_RUNNING: &str = "running";
pub const RUN_COMPLETED: &str = "completed";
pub const RUN_FAILED: &str = "failed";

/// Lifecycle of a recorded bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkRunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl BulkRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => RUN_PENDING,
            Self::Running => RUN_RUNNING,
            Self::Completed => RUN_COMPLETED,
            Self::Failed => RUN_FAILED,
        }
    }

    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            RUN_PENDING => Ok(Self::Pending),
            RUN_RUNNING => Ok(Self::Running),
            RUN_COMPLETED => Ok(Self::Completed),
            RUN_FAILED => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!("Invalid bulk run status '{s}'"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn operation_kind_wire_format() {
        let op: BulkOperationKind =
            serde_json::from_value(json!({ "type": "set_status", "status": "published" }))
                .unwrap();
        assert_eq!(
            op,
            BulkOperationKind::SetStatus {
                status: PageStatus::Published
            }
        );
        assert_eq!(op.as_str(), "set_status");

        let op: BulkOperationKind =
            serde_json::from_value(json!({ "type": "apply_template", "template_id": 4 })).unwrap();
        assert_eq!(op, BulkOperationKind::ApplyTemplate { template_id: 4 });
    }

    #[test]
    fn unknown_operation_rejected() {
        let parsed: Result<BulkOperationKind, _> =
            serde_json::from_value(json!({ "type": "generate" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn batch_size_limits() {
        assert!(validate_batch(&[1]).is_ok());
        assert!(validate_batch(&[]).is_err());
        let too_many: Vec<DbId> = (1..=(MAX_BULK_SIZE as i64 + 1)).collect();
        assert!(validate_batch(&too_many).is_err());
    }

    #[test]
    fn async_decision() {
        assert!(!should_run_async(3, 50, false));
        assert!(should_run_async(3, 50, true));
        assert!(should_run_async(51, 50, false));
    }

    #[test]
    fn repeats_are_flagged_in_order() {
        assert_eq!(
            batch_entries(&[1, 2, 1, 3, 2]),
            vec![
                BatchEntry::First(1),
                BatchEntry::First(2),
                BatchEntry::Repeat(1),
                BatchEntry::First(3),
                BatchEntry::Repeat(2),
            ]
        );
    }

    #[test]
    fn lock_conflict_maps_to_typed_reason() {
        let now = Utc::now();
        let err = CoreError::LockConflict {
            resource_type: "page".into(),
            resource_id: 2,
            holder_id: 9,
            acquired_at: now,
            expires_at: now,
        };
        assert_eq!(
            BulkFailureReason::from(&err),
            BulkFailureReason::LockConflict {
                holder_id: 9,
                acquired_at: now
            }
        );
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let err = CoreError::NotFound {
            entity: "Page",
            id: 1,
        };
        assert_eq!(BulkFailureReason::from(&err), BulkFailureReason::NotFound);
    }

    #[test]
    fn result_records_every_outcome() {
        let mut result = BulkResult::with_capacity(3);
        result.record(1, &Ok::<(), CoreError>(()));
        result.record::<()>(
            2,
            &Err(CoreError::NotFound {
                entity: "Page",
                id: 2,
            }),
        );
        result.record(3, &Ok::<(), CoreError>(()));

        assert_eq!(result.succeeded, vec![1, 3]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].page_id, 2);
        assert!(result.covers(&[1, 2, 3]));
        assert!(!result.covers(&[1, 2, 3, 4]));
        assert!(!result.covers(&[1, 2, 5]));
    }

    #[test]
    fn covers_counts_repeated_ids() {
        let mut result = BulkResult::default();
        result.record_success(1);
        result.record_failure(1, BulkFailureReason::DuplicateEntry);
        assert!(result.covers(&[1, 1]));
        assert!(!result.covers(&[1]));
    }

    #[test]
    fn failure_reason_wire_format() {
        let value = serde_json::to_value(BulkFailureReason::DuplicateEntry).unwrap();
        assert_eq!(value, json!({ "code": "duplicate_entry" }));
    }

    #[test]
    fn run_status_round_trip() {
        for status in [
            BulkRunStatus::Pending,
            BulkRunStatus::Running,
            BulkRunStatus::Completed,
            BulkRunStatus::Failed,
        ] {
            assert_eq!(BulkRunStatus::from_str_value(status.as_str()).unwrap(), status);
        }
        assert!(BulkRunStatus::Completed.is_terminal());
        assert!(!BulkRunStatus::Running.is_terminal());
    }
}

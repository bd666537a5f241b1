//! Page version snapshots. Versions are immutable once written.

use pagetree_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `page_versions` table, including the snapshot payload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PageVersion {
    pub id: DbId,
    pub page_id: DbId,
    pub version_number: i32,
    pub snapshot: serde_json::Value,
    pub summary: Option<String>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// Version metadata without the snapshot, for history listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PageVersionInfo {
    pub id: DbId,
    pub page_id: DbId,
    pub version_number: i32,
    pub summary: Option<String>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// Body of `POST /pages/{id}/versions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSnapshot {
    pub summary: Option<String>,
}

//! Resource lock model and DTOs.

use pagetree_core::locking::{LockHolder, LockTransition};
use pagetree_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `resource_locks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResourceLock {
    pub id: DbId,
    pub resource_type: String,
    pub resource_id: DbId,
    pub holder_id: DbId,
    pub acquired_at: Timestamp,
    pub expires_at: Timestamp,
    pub released_at: Option<Timestamp>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ResourceLock {
    pub fn holder(&self) -> LockHolder {
        LockHolder {
            holder_id: self.holder_id,
            acquired_at: self.acquired_at,
            expires_at: self.expires_at,
        }
    }
}

/// DTO naming a lockable resource (toggle and extend).
#[derive(Debug, Clone, Deserialize)]
pub struct LockRequest {
    pub resource_type: String,
    pub resource_id: DbId,
}

/// What a toggle did, and the lock that is now in place (if any).
#[derive(Debug, Clone, Serialize)]
pub struct LockToggle {
    pub transition: LockTransition,
    pub lock: Option<ResourceLock>,
}

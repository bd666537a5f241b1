//! Cooperative resource locks: TTL constants, resource types, and the pure
//! decision logic behind toggle, renew and the writability check.
//!
//! Locks are advisory. Nothing here blocks: a caller that cannot take a lock
//! gets a [`CoreError::LockConflict`] immediately and may retry later. An
//! expired lock is treated exactly like a missing one.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Lock duration constants
// ---------------------------------------------------------------------------

/// Default lock TTL in minutes (30 minutes).
pub const DEFAULT_LOCK_TTL_MINS: i64 = 30;

/// Maximum allowed lock TTL in minutes (4 hours).
pub const MAX_LOCK_TTL_MINS: i64 = 240;

/// Minimum lock TTL in minutes (1 minute).
pub const MIN_LOCK_TTL_MINS: i64 = 1;

// ---------------------------------------------------------------------------
// Resource types
// ---------------------------------------------------------------------------

/// Known lockable resource types.
pub mod resource_types {
    pub const PAGE: &str = "page";
    pub const TEMPLATE: &str = "template";
    pub const CATEGORY: &str = "category";
    pub const TAG: &str = "tag";
}

/// The set of all valid resource types.
pub const VALID_RESOURCE_TYPES: &[&str] = &[
    resource_types::PAGE,
    resource_types::TEMPLATE,
    resource_types::CATEGORY,
    resource_types::TAG,
];

/// Returns `true` if the given resource type can be locked.
pub fn is_valid_resource_type(resource_type: &str) -> bool {
    VALID_RESOURCE_TYPES.contains(&resource_type)
}

/// Validate that both resource_type and resource_id are acceptable.
pub fn validate_resource_ref(resource_type: &str, resource_id: DbId) -> Result<(), CoreError> {
    if !is_valid_resource_type(resource_type) {
        return Err(CoreError::Validation(format!(
            "Invalid resource_type '{resource_type}'. Must be one of: {}",
            VALID_RESOURCE_TYPES.join(", ")
        )));
    }
    if resource_id <= 0 {
        return Err(CoreError::Validation(format!(
            "resource_id must be positive, got {resource_id}"
        )));
    }
    Ok(())
}

/// Validate a lock TTL in minutes.
pub fn validate_lock_ttl(minutes: i64) -> Result<(), CoreError> {
    if minutes < MIN_LOCK_TTL_MINS {
        return Err(CoreError::Validation(format!(
            "Lock TTL must be at least {MIN_LOCK_TTL_MINS} minute(s), got {minutes}"
        )));
    }
    if minutes > MAX_LOCK_TTL_MINS {
        return Err(CoreError::Validation(format!(
            "Lock TTL must be at most {MAX_LOCK_TTL_MINS} minutes, got {minutes}"
        )));
    }
    Ok(())
}

/// Expiry timestamp for a lock taken or renewed at `now`.
pub fn lock_expiry(now: Timestamp, ttl_mins: i64) -> Timestamp {
    now + Duration::minutes(ttl_mins)
}

// ---------------------------------------------------------------------------
// Lock holder and decisions
// ---------------------------------------------------------------------------

/// The parts of an active lock row the decisions need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub holder_id: DbId,
    pub acquired_at: Timestamp,
    pub expires_at: Timestamp,
}

impl LockHolder {
    /// A lock whose `expires_at` is at or before `now` no longer counts.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Build the conflict error reported to anyone but the holder.
    pub fn conflict(&self, resource_type: &str, resource_id: DbId) -> CoreError {
        CoreError::LockConflict {
            resource_type: resource_type.to_string(),
            resource_id,
            holder_id: self.holder_id,
            acquired_at: self.acquired_at,
            expires_at: self.expires_at,
        }
    }
}

/// Drop an expired holder so callers only ever see live locks.
pub fn live_holder(existing: Option<LockHolder>, now: Timestamp) -> Option<LockHolder> {
    existing.filter(|h| !h.is_expired(now))
}

/// What a toggle request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
    /// Take a fresh lock. `clear_expired` is set when a stale row must be
    /// deactivated first.
    Acquire { clear_expired: bool },
    /// The caller holds the lock; release it.
    Release,
    /// Someone else holds a live lock.
    Conflict(LockHolder),
}

/// Resolve a toggle request by `actor` against the current active row.
pub fn decide_toggle(existing: Option<LockHolder>, actor: DbId, now: Timestamp) -> ToggleDecision {
    match existing {
        None => ToggleDecision::Acquire {
            clear_expired: false,
        },
        Some(holder) if holder.is_expired(now) => ToggleDecision::Acquire {
            clear_expired: true,
        },
        Some(holder) if holder.holder_id == actor => ToggleDecision::Release,
        Some(holder) => ToggleDecision::Conflict(holder),
    }
}

/// Whether `actor` may renew the current lock.
pub fn check_renewable(
    resource_type: &str,
    resource_id: DbId,
    existing: Option<LockHolder>,
    actor: DbId,
    now: Timestamp,
) -> Result<(), CoreError> {
    match live_holder(existing, now) {
        None => Err(CoreError::NotFound {
            entity: "ResourceLock",
            id: resource_id,
        }),
        Some(holder) if holder.holder_id == actor => Ok(()),
        Some(holder) => Err(holder.conflict(resource_type, resource_id)),
    }
}

/// Gate for structural mutations: fails only when another actor holds a live
/// lock. An unlocked resource is writable by anyone.
pub fn check_writable(
    resource_type: &str,
    resource_id: DbId,
    existing: Option<LockHolder>,
    actor: DbId,
    now: Timestamp,
) -> Result<(), CoreError> {
    match live_holder(existing, now) {
        Some(holder) if holder.holder_id != actor => {
            Err(holder.conflict(resource_type, resource_id))
        }
        _ => Ok(()),
    }
}

/// Result of a toggle, as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockTransition {
    Acquired,
    Released,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Repository for the `resource_locks` table.

use pagetree_core::error::CoreError;
use pagetree_core::locking::{
    check_renewable, check_writable, decide_toggle, lock_expiry, validate_resource_ref,
    LockTransition, ToggleDecision,
};
use pagetree_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::resource_lock::{LockToggle, ResourceLock};
use crate::DbError;

/// Column list for `resource_locks` queries.
const COLUMNS: &str = "id, resource_type, resource_id, holder_id, acquired_at, expires_at, \
                       released_at, is_active, created_at, updated_at";

/// Cooperative, TTL-bounded locks over any lockable resource.
pub struct ResourceLockRepo;

impl ResourceLockRepo {
    /// The active lock row for a resource, expired or not.
    pub async fn get_active(
        pool: &PgPool,
        resource_type: &str,
        resource_id: DbId,
    ) -> Result<Option<ResourceLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM resource_locks \
             WHERE resource_type = $1 AND resource_id = $2 AND is_active = true"
        );
        sqlx::query_as::<_, ResourceLock>(&query)
            .bind(resource_type)
            .bind(resource_id)
            .fetch_optional(pool)
            .await
    }

    /// The live lock on a resource. Expired locks read as `None`.
    pub async fn inspect(
        pool: &PgPool,
        resource_type: &str,
        resource_id: DbId,
        now: Timestamp,
    ) -> Result<Option<ResourceLock>, DbError> {
        validate_resource_ref(resource_type, resource_id)?;
        let lock = Self::get_active(pool, resource_type, resource_id).await?;
        Ok(lock.filter(|l| !l.holder().is_expired(now)))
    }

    /// Live locks for a set of resources of one type (listing annotation).
    pub async fn list_live_for(
        pool: &PgPool,
        resource_type: &str,
        resource_ids: &[DbId],
        now: Timestamp,
    ) -> Result<Vec<ResourceLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM resource_locks \
             WHERE resource_type = $1 AND resource_id = ANY($2) \
               AND is_active = true AND expires_at > $3"
        );
        sqlx::query_as::<_, ResourceLock>(&query)
            .bind(resource_type)
            .bind(resource_ids)
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Acquire the lock if it is free (or expired), release it if `actor`
    /// holds it, otherwise fail with `LockConflict`.
    ///
    /// Two actors racing for a free resource both reach the insert; the
    /// partial unique index on active rows lets exactly one through.
    pub async fn toggle(
        pool: &PgPool,
        resource_type: &str,
        resource_id: DbId,
        actor: DbId,
        ttl_mins: i64,
        now: Timestamp,
    ) -> Result<LockToggle, DbError> {
        validate_resource_ref(resource_type, resource_id)?;
        let mut tx = pool.begin().await?;

        let existing =
            Self::active_for_update_inner(&mut tx, resource_type, resource_id).await?;
        let decision = decide_toggle(existing.as_ref().map(ResourceLock::holder), actor, now);

        let outcome = match decision {
            ToggleDecision::Conflict(holder) => {
                return Err(holder.conflict(resource_type, resource_id).into());
            }
            ToggleDecision::Release => {
                if let Some(lock) = &existing {
                    Self::deactivate_inner(&mut tx, lock.id, now).await?;
                }
                LockToggle {
                    transition: LockTransition::Released,
                    lock: None,
                }
            }
            ToggleDecision::Acquire { clear_expired } => {
                if clear_expired {
                    if let Some(lock) = &existing {
                        Self::deactivate_inner(&mut tx, lock.id, now).await?;
                    }
                }
                let inserted = Self::insert_inner(
                    &mut tx,
                    resource_type,
                    resource_id,
                    actor,
                    now,
                    lock_expiry(now, ttl_mins),
                )
                .await?;
                match inserted {
                    Some(lock) => LockToggle {
                        transition: LockTransition::Acquired,
                        lock: Some(lock),
                    },
                    None => {
                        // Lost the race to a concurrent acquisition.
                        let winner =
                            Self::active_for_update_inner(&mut tx, resource_type, resource_id)
                                .await?;
                        match winner {
                            Some(lock) if lock.holder_id == actor => LockToggle {
                                transition: LockTransition::Acquired,
                                lock: Some(lock),
                            },
                            Some(lock) => {
                                return Err(lock
                                    .holder()
                                    .conflict(resource_type, resource_id)
                                    .into());
                            }
                            None => {
                                return Err(CoreError::Conflict(
                                    "Lock changed concurrently, retry".into(),
                                )
                                .into());
                            }
                        }
                    }
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Push the expiry of a lock held by `actor` out to `now + ttl`.
    pub async fn extend(
        pool: &PgPool,
        resource_type: &str,
        resource_id: DbId,
        actor: DbId,
        ttl_mins: i64,
        now: Timestamp,
    ) -> Result<ResourceLock, DbError> {
        validate_resource_ref(resource_type, resource_id)?;
        let mut tx = pool.begin().await?;

        let existing =
            Self::active_for_update_inner(&mut tx, resource_type, resource_id).await?;
        check_renewable(
            resource_type,
            resource_id,
            existing.as_ref().map(ResourceLock::holder),
            actor,
            now,
        )?;
        let Some(lock) = existing else {
            return Err(CoreError::NotFound {
                entity: "ResourceLock",
                id: resource_id,
            }
            .into());
        };

        let query = format!(
            "UPDATE resource_locks SET expires_at = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let renewed = sqlx::query_as::<_, ResourceLock>(&query)
            .bind(lock.id)
            .bind(lock_expiry(now, ttl_mins))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(renewed)
    }

    /// Fail with `LockConflict` if someone other than `actor` holds a live
    /// lock on the resource.
    ///
    /// The lock row (if any) is share-locked until the caller's transaction
    /// ends, so it cannot be released or handed over mid-mutation.
    pub async fn check_writable_inner(
        conn: &mut PgConnection,
        resource_type: &str,
        resource_id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<(), DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM resource_locks \
             WHERE resource_type = $1 AND resource_id = $2 AND is_active = true \
             FOR SHARE"
        );
        let existing = sqlx::query_as::<_, ResourceLock>(&query)
            .bind(resource_type)
            .bind(resource_id)
            .fetch_optional(&mut *conn)
            .await?;
        check_writable(
            resource_type,
            resource_id,
            existing.as_ref().map(ResourceLock::holder),
            actor,
            now,
        )?;
        Ok(())
    }

    /// Deactivate every expired lock. Returns how many were cleared.
    pub async fn cleanup_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE resource_locks SET is_active = false, released_at = $1 \
             WHERE is_active = true AND expires_at <= $1",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -- helpers --------------------------------------------------------------

    async fn active_for_update_inner(
        conn: &mut PgConnection,
        resource_type: &str,
        resource_id: DbId,
    ) -> Result<Option<ResourceLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM resource_locks \
             WHERE resource_type = $1 AND resource_id = $2 AND is_active = true \
             FOR UPDATE"
        );
        sqlx::query_as::<_, ResourceLock>(&query)
            .bind(resource_type)
            .bind(resource_id)
            .fetch_optional(&mut *conn)
            .await
    }

    async fn deactivate_inner(
        conn: &mut PgConnection,
        lock_id: DbId,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE resource_locks SET is_active = false, released_at = $2 WHERE id = $1",
        )
        .bind(lock_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Insert an active lock unless one already exists. `None` means another
    /// transaction holds the active slot.
    async fn insert_inner(
        conn: &mut PgConnection,
        resource_type: &str,
        resource_id: DbId,
        holder_id: DbId,
        acquired_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<Option<ResourceLock>, sqlx::Error> {
        let query = format!(
            "INSERT INTO resource_locks \
                (resource_type, resource_id, holder_id, acquired_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (resource_type, resource_id) WHERE is_active = true \
             DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ResourceLock>(&query)
            .bind(resource_type)
            .bind(resource_id)
            .bind(holder_id)
            .bind(acquired_at)
            .bind(expires_at)
            .fetch_optional(&mut *conn)
            .await
    }
}

//! Integration tests for the lock manager: toggle, expiry, renewal and the
//! race between two acquirers.

mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{now, ALICE, BOB};
use pagetree_core::error::CoreError;
use pagetree_core::locking::{LockTransition, DEFAULT_LOCK_TTL_MINS};
use pagetree_db::repositories::ResourceLockRepo;
use pagetree_db::DbError;
use sqlx::PgPool;

const TTL: i64 = DEFAULT_LOCK_TTL_MINS;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_toggle_twice_locks_then_unlocks(pool: PgPool) {
    let first = ResourceLockRepo::toggle(&pool, "page", 10, ALICE, TTL, now())
        .await
        .unwrap();
    assert_eq!(first.transition, LockTransition::Acquired);
    let lock = first.lock.unwrap();
    assert_eq!(lock.holder_id, ALICE);
    assert_eq!(lock.expires_at - lock.acquired_at, Duration::minutes(TTL));

    let second = ResourceLockRepo::toggle(&pool, "page", 10, ALICE, TTL, now())
        .await
        .unwrap();
    assert_eq!(second.transition, LockTransition::Released);
    assert!(second.lock.is_none());

    let live = ResourceLockRepo::inspect(&pool, "page", 10, now()).await.unwrap();
    assert!(live.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_toggle_by_other_actor_conflicts(pool: PgPool) {
    let held = ResourceLockRepo::toggle(&pool, "page", 10, ALICE, TTL, now())
        .await
        .unwrap()
        .lock
        .unwrap();

    let err = ResourceLockRepo::toggle(&pool, "page", 10, BOB, TTL, now())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        DbError::Core(CoreError::LockConflict { holder_id, acquired_at, .. })
            if holder_id == ALICE && acquired_at == held.acquired_at
    );

    // Alice still holds it.
    let live = ResourceLockRepo::inspect(&pool, "page", 10, now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.holder_id, ALICE);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_lock_reads_as_absent_and_can_be_taken(pool: PgPool) {
    let past = now() - Duration::minutes(TTL + 5);
    ResourceLockRepo::toggle(&pool, "page", 10, ALICE, TTL, past)
        .await
        .unwrap();

    assert!(ResourceLockRepo::inspect(&pool, "page", 10, now())
        .await
        .unwrap()
        .is_none());

    let taken = ResourceLockRepo::toggle(&pool, "page", 10, BOB, TTL, now())
        .await
        .unwrap();
    assert_eq!(taken.transition, LockTransition::Acquired);
    assert_eq!(taken.lock.unwrap().holder_id, BOB);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_acquisitions_have_one_winner(pool: PgPool) {
    let (a, b) = tokio::join!(
        ResourceLockRepo::toggle(&pool, "page", 77, ALICE, TTL, now()),
        ResourceLockRepo::toggle(&pool, "page", 77, BOB, TTL, now()),
    );

    let outcomes = [a, b];
    let winners = outcomes
        .iter()
        .filter(|r| matches!(r, Ok(t) if t.transition == LockTransition::Acquired))
        .count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(DbError::Core(CoreError::LockConflict { .. }))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 1);

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM resource_locks WHERE resource_id = 77 AND is_active = true",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(active, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_extend_by_holder_only(pool: PgPool) {
    let start = now();
    let lock = ResourceLockRepo::toggle(&pool, "template", 3, ALICE, TTL, start)
        .await
        .unwrap()
        .lock
        .unwrap();

    let later = start + Duration::minutes(10);
    let renewed = ResourceLockRepo::extend(&pool, "template", 3, ALICE, TTL, later)
        .await
        .unwrap();
    assert_eq!(renewed.id, lock.id);
    assert!(renewed.expires_at > lock.expires_at);

    assert_matches!(
        ResourceLockRepo::extend(&pool, "template", 3, BOB, TTL, later).await,
        Err(DbError::Core(CoreError::LockConflict { .. }))
    );
    assert_matches!(
        ResourceLockRepo::extend(&pool, "template", 4, ALICE, TTL, later).await,
        Err(DbError::Core(CoreError::NotFound { .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_resource_type_rejected(pool: PgPool) {
    assert_matches!(
        ResourceLockRepo::toggle(&pool, "widget", 1, ALICE, TTL, now()).await,
        Err(DbError::Core(CoreError::Validation(_)))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cleanup_expired(pool: PgPool) {
    let past = now() - Duration::hours(10);
    ResourceLockRepo::toggle(&pool, "page", 1, ALICE, TTL, past)
        .await
        .unwrap();
    ResourceLockRepo::toggle(&pool, "page", 2, ALICE, TTL, now())
        .await
        .unwrap();

    let cleared = ResourceLockRepo::cleanup_expired(&pool, now()).await.unwrap();
    assert_eq!(cleared, 1);
    assert!(ResourceLockRepo::get_active(&pool, "page", 1)
        .await
        .unwrap()
        .is_none());
    assert!(ResourceLockRepo::get_active(&pool, "page", 2)
        .await
        .unwrap()
        .is_some());
}

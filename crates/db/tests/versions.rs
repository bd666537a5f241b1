//! Integration tests for the version store: numbering, explicit snapshots,
//! restore and history reads.

mod common;

use std::collections::HashSet;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{block, create_page, keys, now, section, ALICE};
use pagetree_core::error::CoreError;
use pagetree_core::versioning::TreeSnapshot;
use pagetree_db::repositories::{PageRepo, PageTreeRepo, PageVersionRepo};
use pagetree_db::DbError;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_then_snapshot_matches_restored_version(pool: PgPool) {
    let tree = create_page(&pool, "Services", "services").await;
    let page_id = tree.page.id;
    let v1 = PageVersionRepo::list_by_page(&pool, page_id).await.unwrap()[0].clone();

    PageTreeRepo::replace_tree(
        &pool,
        page_id,
        &[section("faq", vec![block("faq", "Q")])],
        ALICE,
        now(),
    )
    .await
    .unwrap();

    let restored = PageVersionRepo::restore(&pool, page_id, v1.id, ALICE, now())
        .await
        .unwrap();
    assert_eq!(keys(&restored), vec!["hero", "body"]);
    // Fresh rows, same content.
    assert_ne!(restored.sections[0].section.id, tree.sections[0].section.id);

    let latest = PageVersionRepo::snapshot(&pool, page_id, Some("after restore"), ALICE, now())
        .await
        .unwrap();
    let original = PageVersionRepo::find_for_page(&pool, page_id, v1.id)
        .await
        .unwrap();

    let a = TreeSnapshot::from_value(latest.snapshot).unwrap();
    let b = TreeSnapshot::from_value(original.snapshot).unwrap();
    assert!(a.same_content(&b));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_does_not_record_a_version(pool: PgPool) {
    let tree = create_page(&pool, "Services", "services").await;
    let page_id = tree.page.id;
    let v1 = PageVersionRepo::list_by_page(&pool, page_id).await.unwrap()[0].id;

    PageTreeRepo::replace_tree(&pool, page_id, &[], ALICE, now())
        .await
        .unwrap();
    PageVersionRepo::restore(&pool, page_id, v1, ALICE, now())
        .await
        .unwrap();

    let versions = PageVersionRepo::list_by_page(&pool, page_id).await.unwrap();
    assert_eq!(versions.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_bumps_updated_at(pool: PgPool) {
    let tree = create_page(&pool, "Services", "services").await;
    let page_id = tree.page.id;
    let v1 = PageVersionRepo::list_by_page(&pool, page_id).await.unwrap()[0].id;

    let edited_at = now();
    let edited = PageTreeRepo::replace_tree(&pool, page_id, &[], ALICE, edited_at)
        .await
        .unwrap();

    // The row trigger stamps updated_at from the transaction clock.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let restored = PageVersionRepo::restore(&pool, page_id, v1, ALICE, edited_at + Duration::seconds(5))
        .await
        .unwrap();
    assert!(restored.page.updated_at > edited.page.updated_at);

    let reread = PageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(reread.updated_at, restored.page.updated_at);
    assert_eq!(reread.version_counter, edited.page.version_counter);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_foreign_version_is_not_found(pool: PgPool) {
    let a = create_page(&pool, "A", "a").await.page.id;
    let b = create_page(&pool, "B", "b").await.page.id;
    let b_v1 = PageVersionRepo::list_by_page(&pool, b).await.unwrap()[0].id;

    assert_matches!(
        PageVersionRepo::restore(&pool, a, b_v1, ALICE, now()).await,
        Err(DbError::Core(CoreError::VersionNotFound { .. }))
    );
    assert_matches!(
        PageVersionRepo::find_for_page(&pool, a, b_v1).await,
        Err(DbError::Core(CoreError::VersionNotFound { .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_is_newest_first(pool: PgPool) {
    let page_id = create_page(&pool, "Services", "services").await.page.id;
    for _ in 0..3 {
        PageVersionRepo::snapshot(&pool, page_id, None, ALICE, now())
            .await
            .unwrap();
    }

    let numbers: Vec<i32> = PageVersionRepo::list_by_page(&pool, page_id)
        .await
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![4, 3, 2, 1]);

    assert_matches!(
        PageVersionRepo::list_by_page(&pool, 999_999).await,
        Err(DbError::Core(CoreError::NotFound { .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_snapshots_get_distinct_numbers(pool: PgPool) {
    let page_id = create_page(&pool, "Services", "services").await.page.id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            PageVersionRepo::snapshot(&pool, page_id, None, ALICE, now())
                .await
                .unwrap()
                .version_number
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        assert!(numbers.insert(handle.await.unwrap()));
    }
    assert_eq!(numbers, (2..=9).collect::<HashSet<i32>>());
}

//! Integration tests for the content tree: replace, insert, remove, reorder,
//! lock enforcement and duplication.

mod common;

use assert_matches::assert_matches;
use common::{assert_dense, block, create_page, keys, now, section, ALICE, BOB};
use pagetree_core::error::CoreError;
use pagetree_core::locking::DEFAULT_LOCK_TTL_MINS;
use pagetree_db::repositories::{PageRepo, PageTreeRepo, PageVersionRepo, ResourceLockRepo};
use pagetree_db::DbError;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_page_records_first_version(pool: PgPool) {
    let tree = create_page(&pool, "Emergency Plumbing", "emergency-plumbing").await;
    assert_eq!(keys(&tree), vec!["hero", "body"]);
    assert_eq!(tree.page.version_counter, 1);
    assert_eq!(tree.page.status, "draft");
    assert_dense(&tree);

    let versions = PageVersionRepo::list_by_page(&pool, tree.page.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version_number, 1);
    assert_eq!(versions[0].summary.as_deref(), Some("page created"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_replace_tree_renumbers_everything(pool: PgPool) {
    let page = create_page(&pool, "Services", "services").await.page;

    let tree = PageTreeRepo::replace_tree(
        &pool,
        page.id,
        &[
            section("faq", vec![block("faq", "Q1")]),
            section("cta", vec![]),
            section(
                "features",
                vec![block("features", "A"), block("text", "B"), block("cta", "C")],
            ),
        ],
        ALICE,
        now(),
    )
    .await
    .unwrap();

    assert_eq!(keys(&tree), vec!["faq", "cta", "features"]);
    assert_dense(&tree);
    assert_eq!(tree.sections[2].blocks[1].content["text"], "B");
    assert_eq!(tree.page.version_counter, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_replace_tree_rejects_duplicate_keys(pool: PgPool) {
    let page = create_page(&pool, "Services", "services").await.page;
    let err = PageTreeRepo::replace_tree(
        &pool,
        page.id,
        &[section("hero", vec![]), section("hero", vec![])],
        ALICE,
        now(),
    )
    .await
    .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));

    // Nothing was written.
    let tree = PageTreeRepo::get_tree(&pool, page.id).await.unwrap().unwrap();
    assert_eq!(keys(&tree), vec!["hero", "body"]);
    assert_eq!(tree.page.version_counter, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_locked_page_rejects_other_actor(pool: PgPool) {
    let page = create_page(&pool, "Services", "services").await.page;
    ResourceLockRepo::toggle(&pool, "page", page.id, ALICE, DEFAULT_LOCK_TTL_MINS, now())
        .await
        .unwrap();

    let bob = PageTreeRepo::replace_tree(&pool, page.id, &[section("faq", vec![])], BOB, now())
        .await
        .unwrap_err();
    assert_matches!(
        bob,
        DbError::Core(CoreError::LockConflict { holder_id, .. }) if holder_id == ALICE
    );

    let before = PageVersionRepo::list_by_page(&pool, page.id).await.unwrap();
    let previous_max = before[0].version_number;

    let alice =
        PageTreeRepo::replace_tree(&pool, page.id, &[section("faq", vec![])], ALICE, now())
            .await
            .unwrap();
    assert_eq!(keys(&alice), vec!["faq"]);

    let after = PageVersionRepo::list_by_page(&pool, page.id).await.unwrap();
    assert_eq!(after[0].version_number, previous_max + 1);
    assert_eq!(after.len(), before.len() + 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_section_at_index(pool: PgPool) {
    let page = create_page(&pool, "Services", "services").await.page;

    let tree = PageTreeRepo::insert_section(
        &pool,
        page.id,
        &section("pricing", vec![block("pricing", "£")]),
        Some(1),
        ALICE,
        now(),
    )
    .await
    .unwrap();
    assert_eq!(keys(&tree), vec!["hero", "pricing", "body"]);
    assert_dense(&tree);

    // Past the end appends.
    let tree = PageTreeRepo::insert_section(
        &pool,
        page.id,
        &section("faq", vec![]),
        Some(99),
        ALICE,
        now(),
    )
    .await
    .unwrap();
    assert_eq!(keys(&tree), vec!["hero", "pricing", "body", "faq"]);
    assert_dense(&tree);

    // Keys stay unique within a page.
    assert_matches!(
        PageTreeRepo::insert_section(&pool, page.id, &section("faq", vec![]), None, ALICE, now())
            .await,
        Err(DbError::Core(CoreError::Validation(_)))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_remove_section_closes_gap(pool: PgPool) {
    let tree = create_page(&pool, "Services", "services").await;
    let hero_id = tree.sections[0].section.id;

    let tree = PageTreeRepo::remove_section(&pool, tree.page.id, hero_id, ALICE, now())
        .await
        .unwrap();
    assert_eq!(keys(&tree), vec!["body"]);
    assert_dense(&tree);

    assert_matches!(
        PageTreeRepo::remove_section(&pool, tree.page.id, hero_id, ALICE, now()).await,
        Err(DbError::Core(CoreError::NotFound { entity: "Section", .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reorder_sections_requires_permutation(pool: PgPool) {
    let tree = create_page(&pool, "Services", "services").await;
    let page_id = tree.page.id;
    let hero = tree.sections[0].section.id;
    let body = tree.sections[1].section.id;

    let tree = PageTreeRepo::reorder_sections(&pool, page_id, &[body, hero], ALICE, now())
        .await
        .unwrap();
    assert_eq!(keys(&tree), vec!["body", "hero"]);
    assert_dense(&tree);

    for bad in [vec![body], vec![body, hero, hero], vec![body, hero, 999_999]] {
        assert_matches!(
            PageTreeRepo::reorder_sections(&pool, page_id, &bad, ALICE, now()).await,
            Err(DbError::Core(CoreError::InvalidReorder(_)))
        );
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_block_operations_keep_orders_dense(pool: PgPool) {
    let tree = create_page(&pool, "Services", "services").await;
    let body_id = tree.sections[1].section.id;

    let tree = PageTreeRepo::insert_block(&pool, body_id, &block("cta", "Call"), Some(0), ALICE, now())
        .await
        .unwrap();
    let texts: Vec<&str> = tree.sections[1]
        .blocks
        .iter()
        .map(|b| b.content["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Call", "One", "Two"]);
    assert_dense(&tree);

    let ids: Vec<i64> = tree.sections[1].blocks.iter().map(|b| b.id).collect();
    let tree = PageTreeRepo::reorder_blocks(&pool, body_id, &[ids[2], ids[0], ids[1]], ALICE, now())
        .await
        .unwrap();
    assert_eq!(tree.sections[1].blocks[0].id, ids[2]);
    assert_dense(&tree);

    let tree = PageTreeRepo::remove_block(&pool, body_id, ids[0], ALICE, now())
        .await
        .unwrap();
    assert_eq!(tree.sections[1].blocks.len(), 2);
    assert_dense(&tree);

    assert_matches!(
        PageTreeRepo::insert_block(&pool, body_id, &block("marquee", "x"), None, ALICE, now()).await,
        Err(DbError::Core(CoreError::Validation(_)))
    );
    assert_matches!(
        PageTreeRepo::insert_block(&pool, 999_999, &block("text", "x"), None, ALICE, now()).await,
        Err(DbError::Core(CoreError::NotFound { entity: "Section", .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_block_mutation_honours_page_lock(pool: PgPool) {
    let tree = create_page(&pool, "Services", "services").await;
    ResourceLockRepo::toggle(&pool, "page", tree.page.id, ALICE, DEFAULT_LOCK_TTL_MINS, now())
        .await
        .unwrap();

    let body_id = tree.sections[1].section.id;
    assert_matches!(
        PageTreeRepo::insert_block(&pool, body_id, &block("text", "x"), None, BOB, now()).await,
        Err(DbError::Core(CoreError::LockConflict { .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_page(pool: PgPool) {
    let source = create_page(&pool, "About Us", "about-us").await;

    let copy = PageTreeRepo::duplicate(&pool, source.page.id, BOB, now())
        .await
        .unwrap();
    assert_ne!(copy.page.id, source.page.id);
    assert_eq!(copy.page.slug, "about-us-2");
    assert_eq!(copy.page.title, "About Us (Copy)");
    assert_eq!(copy.page.status, "draft");
    assert!(copy.page.target_keyword.is_none());
    assert_eq!(keys(&copy), keys(&source));
    assert_eq!(copy.to_drafts(), source.to_drafts());
    assert_ne!(copy.sections[0].section.id, source.sections[0].section.id);

    // A second copy of the source skips the taken suffix.
    let again = PageTreeRepo::duplicate(&pool, source.page.id, BOB, now())
        .await
        .unwrap();
    assert_eq!(again.page.slug, "about-us-3");

    // A copy of a copy appends to the copy's slug.
    let nested = PageTreeRepo::duplicate(&pool, copy.page.id, BOB, now())
        .await
        .unwrap();
    assert_eq!(nested.page.slug, "about-us-2-2");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_keeps_trailing_number_in_slug(pool: PgPool) {
    let source = create_page(&pool, "iPhone 15 Repair", "iphone-15").await;

    let copy = PageTreeRepo::duplicate(&pool, source.page.id, ALICE, now())
        .await
        .unwrap();
    assert_eq!(copy.page.slug, "iphone-15-2");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_hides_page_and_frees_slug(pool: PgPool) {
    let page = create_page(&pool, "Old", "old").await.page;
    PageRepo::soft_delete(&pool, page.id, ALICE, now()).await.unwrap();

    assert!(PageRepo::find_by_id(&pool, page.id).await.unwrap().is_none());
    assert!(PageRepo::slug_available(&pool, "old", None).await.unwrap());
    // History survives the delete.
    assert_eq!(
        PageVersionRepo::list_by_page(&pool, page.id).await.unwrap().len(),
        1
    );
}

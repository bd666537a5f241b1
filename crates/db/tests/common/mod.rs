//! Shared fixtures for repository integration tests.

#![allow(dead_code)]

use chrono::Utc;
use pagetree_core::content_tree::{BlockDraft, SectionDraft};
use pagetree_core::types::{DbId, Timestamp};
use pagetree_db::models::page::{CreatePage, PageTree};
use pagetree_db::repositories::PageRepo;
use serde_json::json;
use sqlx::PgPool;

pub const ALICE: DbId = 1;
pub const BOB: DbId = 2;

pub fn now() -> Timestamp {
    Utc::now()
}

pub fn block(block_type: &str, text: &str) -> BlockDraft {
    BlockDraft {
        block_type: block_type.to_string(),
        content: json!({ "text": text }),
    }
}

pub fn section(key: &str, blocks: Vec<BlockDraft>) -> SectionDraft {
    SectionDraft {
        section_key: key.to_string(),
        blocks,
    }
}

pub fn new_page(title: &str, slug: &str) -> CreatePage {
    CreatePage {
        title: title.to_string(),
        slug: Some(slug.to_string()),
        page_type: "service".to_string(),
        target_keyword: None,
        sections: vec![
            section("hero", vec![block("hero", "Welcome")]),
            section("body", vec![block("text", "One"), block("text", "Two")]),
        ],
        allow_keyword_conflict: false,
    }
}

pub async fn create_page(pool: &PgPool, title: &str, slug: &str) -> PageTree {
    PageRepo::create(pool, &new_page(title, slug), ALICE, now())
        .await
        .unwrap()
}

/// Section keys of a tree, in order.
pub fn keys(tree: &PageTree) -> Vec<String> {
    tree.sections
        .iter()
        .map(|s| s.section.section_key.clone())
        .collect()
}

/// Assert every sibling group of the tree is numbered `0..n-1` in order.
pub fn assert_dense(tree: &PageTree) {
    for (i, s) in tree.sections.iter().enumerate() {
        assert_eq!(s.section.sort_order, i as i32, "section order");
        for (j, b) in s.blocks.iter().enumerate() {
            assert_eq!(b.sort_order, j as i32, "block order");
        }
    }
}

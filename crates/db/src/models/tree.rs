//! Section and block rows, plus the request DTOs for fine-grained tree edits.

use pagetree_core::content_tree::{BlockDraft, SectionDraft};
use pagetree_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `page_sections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Section {
    pub id: DbId,
    pub page_id: DbId,
    pub section_key: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `section_blocks` table. `content` is opaque.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Block {
    pub id: DbId,
    pub section_id: DbId,
    pub block_type: String,
    pub sort_order: i32,
    pub content: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A section with its blocks in order.
#[derive(Debug, Clone, Serialize)]
pub struct SectionWithBlocks {
    #[serde(flatten)]
    pub section: Section,
    pub blocks: Vec<Block>,
}

impl SectionWithBlocks {
    pub fn to_draft(&self) -> SectionDraft {
        SectionDraft {
            section_key: self.section.section_key.clone(),
            blocks: self
                .blocks
                .iter()
                .map(|b| BlockDraft {
                    block_type: b.block_type.clone(),
                    content: b.content.clone(),
                })
                .collect(),
        }
    }
}

/// Body of `POST /pages/{id}/sections`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertSection {
    #[serde(flatten)]
    pub section: SectionDraft,
    /// Target position; omitted or past the end appends.
    pub at_index: Option<usize>,
}

/// Body of `POST /sections/{id}/blocks`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertBlock {
    #[serde(flatten)]
    pub block: BlockDraft,
    pub at_index: Option<usize>,
}

/// Body of the `.../order` endpoints: every sibling id, in the new order.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<DbId>,
}

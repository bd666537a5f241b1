//! Page model and DTOs.

use pagetree_core::content_tree::{PageStatus, SectionDraft};
use pagetree_core::error::CoreError;
use pagetree_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::resource_lock::ResourceLock;
use super::tree::SectionWithBlocks;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Page {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub page_type: String,
    pub status: String,
    pub target_keyword: Option<String>,
    pub version_counter: i32,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Page {
    pub fn status(&self) -> Result<PageStatus, CoreError> {
        PageStatus::from_str_value(&self.status)
    }
}

/// A page together with its full ordered tree.
#[derive(Debug, Clone, Serialize)]
pub struct PageTree {
    #[serde(flatten)]
    pub page: Page,
    pub sections: Vec<SectionWithBlocks>,
}

impl PageTree {
    /// The tree as drafts, in display order.
    pub fn to_drafts(&self) -> Vec<SectionDraft> {
        self.sections.iter().map(SectionWithBlocks::to_draft).collect()
    }
}

/// A page as shown in listings, annotated with its live lock (if any).
#[derive(Debug, Clone, Serialize)]
pub struct PageListItem {
    #[serde(flatten)]
    pub page: Page,
    pub lock: Option<ResourceLock>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for creating a page. The slug is generated from the title when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePage {
    pub title: String,
    pub slug: Option<String>,
    pub page_type: String,
    pub target_keyword: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionDraft>,
    /// Accept a target keyword that other pages already use.
    #[serde(default)]
    pub allow_keyword_conflict: bool,
}

/// DTO for updating page metadata. `None` fields are left unchanged; an
/// empty `target_keyword` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePage {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub page_type: Option<String>,
    pub status: Option<PageStatus>,
    pub target_keyword: Option<String>,
    #[serde(default)]
    pub allow_keyword_conflict: bool,
}

/// Body of `PUT /pages/{id}/tree`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceTree {
    pub sections: Vec<SectionDraft>,
}

/// Listing filters (`?page_type=&status=&limit=&offset=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageFilter {
    pub page_type: Option<String>,
    pub status: Option<PageStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

//! Page / section / block tree model: statuses, type registries, tree drafts
//! and the ordering primitives every structural mutation goes through.
//!
//! Sibling groups (the sections of a page, the blocks of a section) carry a
//! `sort_order` that must always be exactly `0..n-1`. The helpers here compute
//! the new orders; the repository layer only persists them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum number of sections on a single page.
pub const MAX_SECTIONS_PER_PAGE: usize = 100;

/// Maximum number of blocks inside a single section.
pub const MAX_BLOCKS_PER_SECTION: usize = 100;

/// Maximum length of a section key.
pub const MAX_SECTION_KEY_LEN: usize = 64;

/// Maximum length of a page title.
pub const MAX_TITLE_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Page status
// ---------------------------------------------------------------------------

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";

/// All valid page status strings.
pub const VALID_STATUSES: &[&str] = &[STATUS_DRAFT, STATUS_PUBLISHED];

/// Publication status of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Draft,
    Published,
}

impl PageStatus {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_DRAFT => Ok(Self::Draft),
            STATUS_PUBLISHED => Ok(Self::Published),
            _ => Err(CoreError::Validation(format!(
                "Invalid status '{s}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => STATUS_DRAFT,
            Self::Published => STATUS_PUBLISHED,
        }
    }
}

// ---------------------------------------------------------------------------
// Page types
// ---------------------------------------------------------------------------

/// Known page type discriminators.
pub mod page_types {
    pub const SERVICE: &str = "service";
    pub const BLOG: &str = "blog";
    pub const LANDING: &str = "landing";
    pub const LOCATION: &str = "location";
    pub const LEGAL: &str = "legal";
    pub const GENERIC: &str = "generic";
}

/// The set of all valid page types.
pub const VALID_PAGE_TYPES: &[&str] = &[
    page_types::SERVICE,
    page_types::BLOG,
    page_types::LANDING,
    page_types::LOCATION,
    page_types::LEGAL,
    page_types::GENERIC,
];

pub fn validate_page_type(page_type: &str) -> Result<(), CoreError> {
    if !VALID_PAGE_TYPES.contains(&page_type) {
        return Err(CoreError::Validation(format!(
            "Invalid page_type '{page_type}'. Must be one of: {}",
            VALID_PAGE_TYPES.join(", ")
        )));
    }
    Ok(())
}

/// Validate a page title (non-empty, at most [`MAX_TITLE_LEN`] chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Block types
// ---------------------------------------------------------------------------

/// Registered block types. The set is open (new types get added here) but
/// every stored block must use one of them.
pub const VALID_BLOCK_TYPES: &[&str] = &[
    "hero",
    "features",
    "text",
    "pricing",
    "faq",
    "cta",
    "testimonials",
    "gallery",
    "contact_form",
    "stats",
    "steps",
    "comparison",
    "video",
    "custom",
];

pub fn is_valid_block_type(block_type: &str) -> bool {
    VALID_BLOCK_TYPES.contains(&block_type)
}

pub fn validate_block_type(block_type: &str) -> Result<(), CoreError> {
    if !is_valid_block_type(block_type) {
        return Err(CoreError::Validation(format!(
            "Invalid block_type '{block_type}'. Must be one of: {}",
            VALID_BLOCK_TYPES.join(", ")
        )));
    }
    Ok(())
}

/// Validate a section key: lowercase ascii alphanumerics, `-` and `_`.
pub fn validate_section_key(key: &str) -> Result<(), CoreError> {
    if key.is_empty() {
        return Err(CoreError::Validation("section_key must not be empty".into()));
    }
    if key.len() > MAX_SECTION_KEY_LEN {
        return Err(CoreError::Validation(format!(
            "section_key must be at most {MAX_SECTION_KEY_LEN} characters"
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "section_key '{key}' may only contain lowercase letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tree drafts
// ---------------------------------------------------------------------------

/// A block as submitted by a caller (or read back out of a snapshot).
///
/// `content` is opaque: it is stored, copied and moved but never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDraft {
    pub block_type: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// A section with its blocks, in display order. Order is positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDraft {
    pub section_key: String,
    #[serde(default)]
    pub blocks: Vec<BlockDraft>,
}

pub fn validate_block(block: &BlockDraft) -> Result<(), CoreError> {
    validate_block_type(&block.block_type)
}

/// Validate a single section draft and all of its blocks.
pub fn validate_section(section: &SectionDraft) -> Result<(), CoreError> {
    validate_section_key(&section.section_key)?;
    if section.blocks.len() > MAX_BLOCKS_PER_SECTION {
        return Err(CoreError::Validation(format!(
            "Section '{}' has {} blocks, maximum is {MAX_BLOCKS_PER_SECTION}",
            section.section_key,
            section.blocks.len()
        )));
    }
    section.blocks.iter().try_for_each(validate_block)
}

/// Validate a full replacement tree: section count, unique keys, and every
/// section's blocks.
pub fn validate_tree(sections: &[SectionDraft]) -> Result<(), CoreError> {
    if sections.len() > MAX_SECTIONS_PER_PAGE {
        return Err(CoreError::Validation(format!(
            "Page has {} sections, maximum is {MAX_SECTIONS_PER_PAGE}",
            sections.len()
        )));
    }
    let mut seen = HashSet::with_capacity(sections.len());
    for section in sections {
        validate_section(section)?;
        if !seen.insert(section.section_key.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate section_key '{}'",
                section.section_key
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ordering primitives
// ---------------------------------------------------------------------------

/// Anything that lives in an ordered sibling group.
pub trait Ordered {
    fn id(&self) -> DbId;
    fn sort_order(&self) -> i32;
    fn set_sort_order(&mut self, order: i32);
}

/// Lightweight `(id, sort_order)` pair, as loaded for reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sibling {
    pub id: DbId,
    pub sort_order: i32,
}

impl Ordered for Sibling {
    fn id(&self) -> DbId {
        self.id
    }

    fn sort_order(&self) -> i32 {
        self.sort_order
    }

    fn set_sort_order(&mut self, order: i32) {
        self.sort_order = order;
    }
}

/// Rewrite `sort_order` to match slice position (`0..n-1`).
pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_sort_order(index as i32);
    }
}

/// Returns `true` if the orders are exactly `0..n-1` in some arrangement.
pub fn is_dense<I>(orders: I) -> bool
where
    I: IntoIterator<Item = i32>,
{
    let mut orders: Vec<i32> = orders.into_iter().collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(i, &o)| o == i as i32)
}

/// Check that `requested` is a permutation of `current`.
pub fn validate_permutation(current: &[DbId], requested: &[DbId]) -> Result<(), CoreError> {
    let mut seen = HashSet::with_capacity(requested.len());
    if let Some(dup) = requested.iter().find(|id| !seen.insert(**id)) {
        return Err(CoreError::InvalidReorder(format!(
            "id {dup} appears more than once"
        )));
    }

    let current_set: HashSet<DbId> = current.iter().copied().collect();
    let unknown: Vec<DbId> = requested
        .iter()
        .copied()
        .filter(|id| !current_set.contains(id))
        .collect();
    if !unknown.is_empty() {
        return Err(CoreError::InvalidReorder(format!(
            "ids {unknown:?} are not members of this group"
        )));
    }

    let missing: Vec<DbId> = current
        .iter()
        .copied()
        .filter(|id| !seen.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::InvalidReorder(format!(
            "ids {missing:?} are missing from the new order"
        )));
    }
    Ok(())
}

/// Reorder `items` to follow `new_order`, then renumber.
///
/// Fails with [`CoreError::InvalidReorder`] unless `new_order` is a
/// permutation of the ids in `items`.
pub fn reorder<T: Ordered>(items: Vec<T>, new_order: &[DbId]) -> Result<Vec<T>, CoreError> {
    let current: Vec<DbId> = items.iter().map(Ordered::id).collect();
    validate_permutation(&current, new_order)?;

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut result = Vec::with_capacity(slots.len());
    for id in new_order {
        let pos = current
            .iter()
            .position(|c| c == id)
            .ok_or_else(|| CoreError::InvalidReorder(format!("id {id} not found")))?;
        if let Some(item) = slots[pos].take() {
            result.push(item);
        }
    }
    renumber(&mut result);
    Ok(result)
}

/// Insert `item` at `at_index` (clamped to the end), then renumber.
///
/// Returns the index the item actually landed at.
pub fn insert_at<T: Ordered>(items: &mut Vec<T>, item: T, at_index: usize) -> usize {
    let index = at_index.min(items.len());
    items.insert(index, item);
    renumber(items);
    index
}

/// Remove the item with `id` and close the gap.
pub fn remove_by_id<T: Ordered>(items: &mut Vec<T>, id: DbId) -> Option<T> {
    let pos = items.iter().position(|item| item.id() == id)?;
    let removed = items.remove(pos);
    renumber(items);
    Some(removed)
}

/// `(id, new_order)` pairs for every item whose order differs from `before`.
///
/// The repository layer writes only these rows.
pub fn changed_orders<T: Ordered>(before: &[Sibling], after: &[T]) -> Vec<(DbId, i32)> {
    after
        .iter()
        .filter(|item| {
            before
                .iter()
                .find(|b| b.id == item.id())
                .map_or(true, |b| b.sort_order != item.sort_order())
        })
        .map(|item| (item.id(), item.sort_order()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

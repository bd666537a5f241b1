//! Page version snapshots.
//!
//! A snapshot captures the whole section/block tree of a page at one point in
//! time. Order is positional and ids are deliberately left out: restoring a
//! snapshot creates fresh rows, so two snapshots of equal content compare
//! equal regardless of the row ids they were taken from.

use serde::{Deserialize, Serialize};

use crate::content_tree::{validate_tree, SectionDraft};
use crate::error::CoreError;

/// Current snapshot payload format.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Version numbers start at 1 for every page.
pub const FIRST_VERSION_NUMBER: i32 = 1;

/// Maximum length of a version summary.
pub const MAX_SUMMARY_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Summaries recorded with automatic snapshots
// ---------------------------------------------------------------------------

pub mod summaries {
    pub const PAGE_CREATED: &str = "page created";
    pub const TREE_REPLACED: &str = "tree updated";
    pub const SECTION_INSERTED: &str = "section inserted";
    pub const SECTION_REMOVED: &str = "section removed";
    pub const SECTIONS_REORDERED: &str = "sections reordered";
    pub const BLOCK_INSERTED: &str = "block inserted";
    pub const BLOCK_REMOVED: &str = "block removed";
    pub const BLOCKS_REORDERED: &str = "blocks reordered";
    pub const DUPLICATED: &str = "duplicated from another page";
    pub const MANUAL: &str = "manual snapshot";
}

/// Summary for a snapshot taken after a template was applied.
pub fn template_applied_summary(template_slug: &str) -> String {
    format!("template applied: {template_slug}")
}

/// Validate a caller-supplied summary for an explicit snapshot.
pub fn validate_summary(summary: &str) -> Result<(), CoreError> {
    if summary.chars().count() > MAX_SUMMARY_LEN {
        return Err(CoreError::Validation(format!(
            "Summary must be at most {MAX_SUMMARY_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshot payload
// ---------------------------------------------------------------------------

/// Serialized form of a page tree, stored in `page_versions.snapshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub format: u32,
    pub sections: Vec<SectionDraft>,
}

impl TreeSnapshot {
    pub fn new(sections: Vec<SectionDraft>) -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            sections,
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }

    /// Content equality: same sections, same blocks, same order, same payloads.
    pub fn same_content(&self, other: &TreeSnapshot) -> bool {
        self.sections == other.sections
    }

    pub fn to_value(&self) -> Result<serde_json::Value, CoreError> {
        serde_json::to_value(self)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize snapshot: {e}")))
    }

    /// Decode a stored snapshot. The tree must still satisfy the current
    /// validation rules before it can be restored.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        let snapshot: TreeSnapshot = serde_json::from_value(value)
            .map_err(|e| CoreError::Internal(format!("Corrupt snapshot payload: {e}")))?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(CoreError::Internal(format!(
                "Unsupported snapshot format {}",
                snapshot.format
            )));
        }
        Ok(snapshot)
    }

    /// Sections to install when restoring this snapshot.
    pub fn into_restorable(self) -> Result<Vec<SectionDraft>, CoreError> {
        validate_tree(&self.sections)?;
        Ok(self.sections)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_tree::BlockDraft;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn tree() -> Vec<SectionDraft> {
        vec![
            SectionDraft {
                section_key: "hero".into(),
                blocks: vec![BlockDraft {
                    block_type: "hero".into(),
                    content: json!({ "heading": "Plumbing in Leeds" }),
                }],
            },
            SectionDraft {
                section_key: "body".into(),
                blocks: vec![
                    BlockDraft {
                        block_type: "text".into(),
                        content: json!({ "html": "<p>Hi</p>" }),
                    },
                    BlockDraft {
                        block_type: "cta".into(),
                        content: json!(null),
                    },
                ],
            },
        ]
    }

    #[test]
    fn counts() {
        let snap = TreeSnapshot::new(tree());
        assert_eq!(snap.section_count(), 2);
        assert_eq!(snap.block_count(), 3);
    }

    #[test]
    fn stored_value_decodes_to_equal_content() {
        let snap = TreeSnapshot::new(tree());
        let decoded = TreeSnapshot::from_value(snap.to_value().unwrap()).unwrap();
        assert!(decoded.same_content(&snap));
    }

    #[test]
    fn block_order_matters_for_equality() {
        let a = TreeSnapshot::new(tree());
        let mut swapped = tree();
        swapped[1].blocks.reverse();
        assert!(!a.same_content(&TreeSnapshot::new(swapped)));
    }

    #[test]
    fn unknown_format_rejected() {
        let value = json!({ "format": 99, "sections": [] });
        assert_matches!(TreeSnapshot::from_value(value), Err(CoreError::Internal(_)));
    }

    #[test]
    fn garbage_payload_rejected() {
        assert!(TreeSnapshot::from_value(json!("not a tree")).is_err());
    }

    #[test]
    fn restorable_tree_is_revalidated() {
        let mut bad = tree();
        bad[0].blocks[0].block_type = "retired_type".into();
        let snap = TreeSnapshot::new(bad);
        assert_matches!(snap.into_restorable(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn summary_length() {
        assert!(validate_summary("before launch").is_ok());
        assert!(validate_summary(&"s".repeat(MAX_SUMMARY_LEN + 1)).is_err());
    }

    #[test]
    fn template_summary_names_template() {
        assert_eq!(template_applied_summary("service"), "template applied: service");
    }
}

//! Page template skeletons and the merge plan used when a template is
//! applied to an existing page.
//!
//! Applying a template never overwrites live content: sections the page
//! already has keep their blocks, and only block types they lack are added.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::content_tree::{
    validate_block_type, validate_section_key, BlockDraft, SectionDraft, MAX_SECTIONS_PER_PAGE,
};
use crate::error::CoreError;

/// Maximum number of entries in one template skeleton.
pub const MAX_SKELETON_ENTRIES: usize = 200;

/// One `(section_key, block_type, default_content)` tuple of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub section_key: String,
    pub block_type: String,
    #[serde(default)]
    pub default_content: serde_json::Value,
}

/// Validate a skeleton before it is stored.
pub fn validate_skeleton(entries: &[TemplateEntry]) -> Result<(), CoreError> {
    if entries.is_empty() {
        return Err(CoreError::Validation(
            "Template skeleton must contain at least one entry".into(),
        ));
    }
    if entries.len() > MAX_SKELETON_ENTRIES {
        return Err(CoreError::Validation(format!(
            "Template skeleton has {} entries, maximum is {MAX_SKELETON_ENTRIES}",
            entries.len()
        )));
    }
    for entry in entries {
        validate_section_key(&entry.section_key)?;
        validate_block_type(&entry.block_type)?;
    }
    if group_entries(entries).len() > MAX_SECTIONS_PER_PAGE {
        return Err(CoreError::Validation(format!(
            "Template defines more than {MAX_SECTIONS_PER_PAGE} sections"
        )));
    }
    Ok(())
}

/// Group skeleton entries into sections, keeping the order in which each
/// section key first appears and the entry order within it.
pub fn group_entries(entries: &[TemplateEntry]) -> Vec<SectionDraft> {
    let mut sections: Vec<SectionDraft> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        let block = BlockDraft {
            block_type: entry.block_type.clone(),
            content: entry.default_content.clone(),
        };
        match index.get(entry.section_key.as_str()) {
            Some(&i) => sections[i].blocks.push(block),
            None => {
                index.insert(&entry.section_key, sections.len());
                sections.push(SectionDraft {
                    section_key: entry.section_key.clone(),
                    blocks: vec![block],
                });
            }
        }
    }
    sections
}

/// A section already on the page, reduced to what the merge needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingSection {
    pub section_key: String,
    pub block_types: Vec<String>,
}

/// Blocks to append to a section the page already has.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAdditions {
    pub section_key: String,
    pub blocks: Vec<BlockDraft>,
}

/// Everything applying a template will create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateMergePlan {
    /// Whole sections to append after the page's current sections.
    pub new_sections: Vec<SectionDraft>,
    /// Blocks to append to existing sections.
    pub additions: Vec<BlockAdditions>,
}

impl TemplateMergePlan {
    pub fn is_noop(&self) -> bool {
        self.new_sections.is_empty() && self.additions.is_empty()
    }

    pub fn added_block_count(&self) -> usize {
        self.new_sections.iter().map(|s| s.blocks.len()).sum::<usize>()
            + self.additions.iter().map(|a| a.blocks.len()).sum::<usize>()
    }
}

/// Work out what a template adds to a page.
///
/// Block matching is by type presence: a page section that already holds any
/// `text` block gains no `text` blocks, however many the template lists.
pub fn plan_merge(existing: &[ExistingSection], entries: &[TemplateEntry]) -> TemplateMergePlan {
    let mut plan = TemplateMergePlan::default();

    for wanted in group_entries(entries) {
        let Some(current) = existing
            .iter()
            .find(|s| s.section_key == wanted.section_key)
        else {
            plan.new_sections.push(wanted);
            continue;
        };

        let present: HashSet<&str> = current.block_types.iter().map(String::as_str).collect();
        let missing: Vec<BlockDraft> = wanted
            .blocks
            .into_iter()
            .filter(|block| !present.contains(block.block_type.as_str()))
            .collect();

        if !missing.is_empty() {
            plan.additions.push(BlockAdditions {
                section_key: wanted.section_key,
                blocks: missing,
            });
        }
    }

    plan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, block_type: &str) -> TemplateEntry {
        TemplateEntry {
            section_key: key.into(),
            block_type: block_type.into(),
            default_content: json!({ "placeholder": format!("{key}/{block_type}") }),
        }
    }

    fn existing(key: &str, types: &[&str]) -> ExistingSection {
        ExistingSection {
            section_key: key.into(),
            block_types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn skeleton_validation() {
        assert!(validate_skeleton(&[entry("hero", "hero")]).is_ok());
        assert!(validate_skeleton(&[]).is_err());
        assert!(validate_skeleton(&[entry("Hero", "hero")]).is_err());
        assert!(validate_skeleton(&[entry("hero", "marquee")]).is_err());
    }

    #[test]
    fn grouping_keeps_first_appearance_order() {
        let sections = group_entries(&[
            entry("hero", "hero"),
            entry("body", "text"),
            entry("hero", "cta"),
        ]);
        let keys: Vec<&str> = sections.iter().map(|s| s.section_key.as_str()).collect();
        assert_eq!(keys, vec!["hero", "body"]);
        let hero_types: Vec<&str> = sections[0]
            .blocks
            .iter()
            .map(|b| b.block_type.as_str())
            .collect();
        assert_eq!(hero_types, vec!["hero", "cta"]);
    }

    #[test]
    fn empty_page_gets_every_section() {
        let plan = plan_merge(&[], &[entry("hero", "hero"), entry("features", "features")]);
        assert_eq!(plan.new_sections.len(), 2);
        assert!(plan.additions.is_empty());
        assert_eq!(plan.added_block_count(), 2);
    }

    #[test]
    fn existing_section_is_left_alone() {
        let plan = plan_merge(
            &[existing("hero", &["hero"])],
            &[entry("hero", "hero"), entry("features", "features")],
        );
        assert!(plan.additions.is_empty());
        assert_eq!(plan.new_sections.len(), 1);
        assert_eq!(plan.new_sections[0].section_key, "features");
    }

    #[test]
    fn existing_section_gets_only_missing_types() {
        let plan = plan_merge(
            &[existing("hero", &["hero"])],
            &[entry("hero", "hero"), entry("hero", "cta")],
        );
        assert!(plan.new_sections.is_empty());
        assert_eq!(plan.additions.len(), 1);
        assert_eq!(plan.additions[0].blocks.len(), 1);
        assert_eq!(plan.additions[0].blocks[0].block_type, "cta");
    }

    #[test]
    fn present_type_is_not_repeated() {
        let plan = plan_merge(
            &[existing("body", &["text"])],
            &[entry("body", "text"), entry("body", "text")],
        );
        assert!(plan.is_noop());
    }

    #[test]
    fn absent_type_is_added_as_often_as_listed() {
        let plan = plan_merge(
            &[existing("body", &["cta"])],
            &[entry("body", "text"), entry("body", "text"), entry("body", "cta")],
        );
        let added: Vec<&str> = plan.additions[0]
            .blocks
            .iter()
            .map(|b| b.block_type.as_str())
            .collect();
        assert_eq!(added, vec!["text", "text"]);
    }

    #[test]
    fn fully_covered_page_is_noop() {
        let plan = plan_merge(
            &[existing("hero", &["hero", "cta"]), existing("faq", &["faq"])],
            &[entry("hero", "hero"), entry("faq", "faq")],
        );
        assert!(plan.is_noop());
    }

    #[test]
    fn default_content_travels_with_new_blocks() {
        let plan = plan_merge(&[], &[entry("pricing", "pricing")]);
        assert_eq!(
            plan.new_sections[0].blocks[0].content,
            json!({ "placeholder": "pricing/pricing" })
        );
    }
}

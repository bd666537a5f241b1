//! Slug and target-keyword normalisation, slug generation, and the conflict
//! record reported when a keyword is already targeted by another page.
//!
//! The lookups themselves run in the repository layer; everything that decides
//! whether two values collide lives here so both sides agree.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of a page slug.
pub const MAX_SLUG_LEN: usize = 200;

/// Maximum length of a target keyword.
pub const MAX_KEYWORD_LEN: usize = 200;

/// How many numeric suffixes to try before giving up on a unique slug.
pub const MAX_SLUG_SUFFIX_ATTEMPTS: u32 = 1000;

/// A page that already targets the candidate keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordConflict {
    pub page_id: DbId,
    pub title: String,
    pub slug: String,
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Canonical comparison form of a slug.
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}

/// Generate a URL-safe slug from a page title.
///
/// Converts to lowercase, replaces anything that is not ascii alphanumeric
/// with hyphens, collapses runs of hyphens and trims them from both ends.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut prev_hyphen = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }
    result.trim_matches('-').to_string()
}

/// Validate a normalised slug (non-empty, lowercase alphanumerics and hyphens).
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation("Slug must not be empty".into()));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(CoreError::Validation(format!(
            "Slug must be at most {MAX_SLUG_LEN} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::Validation(
            "Slug may only contain lowercase letters, digits and hyphens".into(),
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(CoreError::Validation(
            "Slug must not start or end with a hyphen".into(),
        ));
    }
    Ok(())
}

/// The `n`-th candidate when deriving a unique slug from `base`.
///
/// Attempt 1 is the base itself; later attempts append `-2`, `-3`, ...
pub fn suffixed_slug(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}

// ---------------------------------------------------------------------------
// Target keywords
// ---------------------------------------------------------------------------

/// Canonical comparison form of a target keyword: trimmed, lowercased, inner
/// whitespace collapsed to single spaces. Empty keywords normalise to `None`.
pub fn normalize_keyword(keyword: &str) -> Option<String> {
    let normalized = keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

pub fn validate_keyword(keyword: &str) -> Result<(), CoreError> {
    if keyword.chars().count() > MAX_KEYWORD_LEN {
        return Err(CoreError::Validation(format!(
            "Target keyword must be at most {MAX_KEYWORD_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

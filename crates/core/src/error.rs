use crate::conflict::KeywordConflict;
use crate::types::{DbId, Timestamp};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The resource is locked by another actor whose lock has not expired.
    #[error("{resource_type}:{resource_id} is locked by user {holder_id} since {acquired_at}")]
    LockConflict {
        resource_type: String,
        resource_id: DbId,
        holder_id: DbId,
        acquired_at: Timestamp,
        expires_at: Timestamp,
    },

    #[error("Version {version_id} not found for page {page_id}")]
    VersionNotFound { page_id: DbId, version_id: DbId },

    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),

    #[error("Slug '{slug}' is already in use")]
    SlugTaken { slug: String },

    #[error("Target keyword '{keyword}' is already used by {} page(s)", conflicts.len())]
    KeywordConflict {
        keyword: String,
        conflicts: Vec<KeywordConflict>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

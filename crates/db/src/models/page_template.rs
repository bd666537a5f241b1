//! Page template model and DTOs.

use pagetree_core::error::CoreError;
use pagetree_core::template::TemplateEntry;
use pagetree_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `page_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PageTemplate {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    pub skeleton: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PageTemplate {
    /// Decode the stored skeleton.
    pub fn entries(&self) -> Result<Vec<TemplateEntry>, CoreError> {
        serde_json::from_value(self.skeleton.clone()).map_err(|e| {
            CoreError::Internal(format!("Template {} has a corrupt skeleton: {e}", self.id))
        })
    }
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePageTemplate {
    pub slug: String,
    pub name: String,
    pub skeleton: Vec<TemplateEntry>,
}

/// Body of `POST /pages/{id}/apply-template`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyTemplate {
    pub template_id: DbId,
}

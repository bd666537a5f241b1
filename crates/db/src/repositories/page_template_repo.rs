//! Repository for the `page_templates` table.

use pagetree_core::conflict::{normalize_slug, validate_slug};
use pagetree_core::error::CoreError;
use pagetree_core::template::validate_skeleton;
use pagetree_core::types::DbId;
use sqlx::PgPool;

use crate::models::page_template::{CreatePageTemplate, PageTemplate};
use crate::DbError;

/// Column list for `page_templates` queries.
const COLUMNS: &str = "id, slug, name, skeleton, created_at, updated_at";

/// Provides CRUD operations for page templates.
pub struct PageTemplateRepo;

impl PageTemplateRepo {
    /// Validate and insert a template, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePageTemplate,
    ) -> Result<PageTemplate, DbError> {
        validate_skeleton(&input.skeleton)?;
        if input.name.trim().is_empty() {
            return Err(CoreError::Validation("Template name must not be empty".into()).into());
        }
        let slug = normalize_slug(&input.slug);
        validate_slug(&slug)?;
        let skeleton = serde_json::to_value(&input.skeleton)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize skeleton: {e}")))?;

        let query = format!(
            "INSERT INTO page_templates (slug, name, skeleton) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, PageTemplate>(&query)
            .bind(&slug)
            .bind(input.name.trim())
            .bind(&skeleton)
            .fetch_one(pool)
            .await?;
        Ok(template)
    }

    /// Find a template by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PageTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM page_templates WHERE id = $1");
        sqlx::query_as::<_, PageTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all templates ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<PageTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM page_templates ORDER BY name, id");
        sqlx::query_as::<_, PageTemplate>(&query)
            .fetch_all(pool)
            .await
    }
}

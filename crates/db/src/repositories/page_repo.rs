//! Repository for the `pages` table: metadata, listing, soft delete, and the
//! slug / target-keyword conflict lookups.

use std::collections::HashMap;

use pagetree_core::conflict::{
    generate_slug, normalize_keyword, normalize_slug, suffixed_slug, validate_keyword,
    validate_slug, KeywordConflict, MAX_SLUG_SUFFIX_ATTEMPTS,
};
use pagetree_core::content_tree::{
    validate_page_type, validate_title, validate_tree, PageStatus, STATUS_DRAFT,
};
use pagetree_core::error::CoreError;
use pagetree_core::locking::resource_types;
use pagetree_core::types::{DbId, Timestamp};
use pagetree_core::versioning::summaries;
use sqlx::{PgConnection, PgPool};

use crate::models::page::{CreatePage, Page, PageFilter, PageListItem, PageTree, UpdatePage};
use crate::repositories::{PageTreeRepo, ResourceLockRepo};
use crate::DbError;

/// Column list for `pages` queries.
pub(crate) const COLUMNS: &str = "id, title, slug, page_type, status, target_keyword, \
                                  version_counter, deleted_at, created_at, updated_at";

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Fallback base when a title produces an empty slug.
const FALLBACK_SLUG: &str = "page";

/// Provides page metadata operations and conflict lookups.
pub struct PageRepo;

impl PageRepo {
    // -- reads ----------------------------------------------------------------

    /// Find a live (not soft-deleted) page by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::find_live_inner(&mut conn, id).await
    }

    pub(crate) async fn find_live_inner(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Row-lock a live page for the rest of the transaction.
    ///
    /// Every tree mutation goes through here first, which serialises
    /// concurrent writers of the same page.
    pub(crate) async fn find_for_update_inner(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Page, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(DbError::Core(CoreError::NotFound { entity: "Page", id }))
    }

    /// Row-lock a live page and fail unless `actor` may write it.
    pub(crate) async fn find_writable_inner(
        conn: &mut PgConnection,
        id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<Page, DbError> {
        let page = Self::find_for_update_inner(conn, id).await?;
        ResourceLockRepo::check_writable_inner(conn, resource_types::PAGE, id, actor, now).await?;
        Ok(page)
    }

    /// List live pages, newest first.
    pub async fn list(pool: &PgPool, filter: &PageFilter) -> Result<Vec<Page>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM pages \
             WHERE deleted_at IS NULL \
               AND ($1::TEXT IS NULL OR page_type = $1) \
               AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(filter.page_type.as_deref())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List live pages, each annotated with its live lock.
    pub async fn list_with_locks(
        pool: &PgPool,
        filter: &PageFilter,
        now: Timestamp,
    ) -> Result<Vec<PageListItem>, sqlx::Error> {
        let pages = Self::list(pool, filter).await?;
        let ids: Vec<DbId> = pages.iter().map(|p| p.id).collect();
        let mut locks: HashMap<DbId, _> =
            ResourceLockRepo::list_live_for(pool, resource_types::PAGE, &ids, now)
                .await?
                .into_iter()
                .map(|lock| (lock.resource_id, lock))
                .collect();

        Ok(pages
            .into_iter()
            .map(|page| {
                let lock = locks.remove(&page.id);
                PageListItem { page, lock }
            })
            .collect())
    }

    // -- conflict lookups -----------------------------------------------------

    /// `true` when no live page other than `excluding` uses `slug`
    /// (case-insensitive).
    pub async fn slug_available(
        pool: &PgPool,
        slug: &str,
        excluding: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::slug_available_inner(&mut conn, slug, excluding).await
    }

    pub(crate) async fn slug_available_inner(
        conn: &mut PgConnection,
        slug: &str,
        excluding: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (\
                SELECT 1 FROM pages \
                WHERE lower(slug) = $1 AND deleted_at IS NULL \
                  AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(normalize_slug(slug))
        .bind(excluding)
        .fetch_one(&mut *conn)
        .await?;
        Ok(!taken)
    }

    /// Live pages other than `excluding` whose normalised target keyword
    /// equals the normalised `keyword`.
    pub async fn keyword_conflicts(
        pool: &PgPool,
        keyword: &str,
        excluding: Option<DbId>,
    ) -> Result<Vec<KeywordConflict>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::keyword_conflicts_inner(&mut conn, keyword, excluding).await
    }

    pub(crate) async fn keyword_conflicts_inner(
        conn: &mut PgConnection,
        keyword: &str,
        excluding: Option<DbId>,
    ) -> Result<Vec<KeywordConflict>, sqlx::Error> {
        let Some(normalized) = normalize_keyword(keyword) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query_as::<_, (DbId, String, String)>(
            "SELECT id, title, slug FROM pages \
             WHERE target_keyword_norm = $1 AND deleted_at IS NULL \
               AND ($2::BIGINT IS NULL OR id <> $2) \
             ORDER BY id",
        )
        .bind(normalized)
        .bind(excluding)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(page_id, title, slug)| KeywordConflict {
                page_id,
                title,
                slug,
            })
            .collect())
    }

    /// First free slug among `base`, `base-2`, `base-3`, ... starting at
    /// `first_attempt`.
    pub(crate) async fn unique_slug_inner(
        conn: &mut PgConnection,
        base: &str,
        first_attempt: u32,
    ) -> Result<String, DbError> {
        for attempt in first_attempt..=MAX_SLUG_SUFFIX_ATTEMPTS {
            let candidate = suffixed_slug(base, attempt);
            if Self::slug_available_inner(conn, &candidate, None).await? {
                return Ok(candidate);
            }
        }
        Err(CoreError::Conflict(format!("No free slug found for '{base}'")).into())
    }

    /// Fail with `KeywordConflict` if another page already targets `keyword`.
    async fn ensure_keyword_free_inner(
        conn: &mut PgConnection,
        keyword: &str,
        excluding: Option<DbId>,
    ) -> Result<(), DbError> {
        let conflicts = Self::keyword_conflicts_inner(conn, keyword, excluding).await?;
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(CoreError::KeywordConflict {
                keyword: keyword.to_string(),
                conflicts,
            }
            .into())
        }
    }

    // -- writes ---------------------------------------------------------------

    /// Create a page with an optional initial tree and record version 1.
    ///
    /// An explicit slug must be free; a slug derived from the title gets a
    /// numeric suffix when the plain form is taken.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePage,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        validate_title(&input.title)?;
        validate_page_type(&input.page_type)?;
        validate_tree(&input.sections)?;
        let keyword = match input.target_keyword.as_deref() {
            Some(k) => {
                validate_keyword(k)?;
                normalize_keyword(k).map(|_| k.trim().to_string())
            }
            None => None,
        };

        let mut tx = pool.begin().await?;

        let slug = match input.slug.as_deref() {
            Some(requested) => {
                let slug = normalize_slug(requested);
                validate_slug(&slug)?;
                if !Self::slug_available_inner(&mut tx, &slug, None).await? {
                    return Err(CoreError::SlugTaken { slug }.into());
                }
                slug
            }
            None => {
                let generated = generate_slug(&input.title);
                let base = if generated.is_empty() {
                    FALLBACK_SLUG.to_string()
                } else {
                    generated
                };
                Self::unique_slug_inner(&mut tx, &base, 1).await?
            }
        };

        if let Some(k) = &keyword {
            if !input.allow_keyword_conflict {
                Self::ensure_keyword_free_inner(&mut tx, k, None).await?;
            }
        }

        let page = Self::insert_inner(
            &mut tx,
            &input.title,
            &slug,
            &input.page_type,
            STATUS_DRAFT,
            keyword.as_deref(),
            now,
        )
        .await?;

        PageTreeRepo::install_sections_inner(&mut tx, page.id, &input.sections, 0, now).await?;
        let tree = PageTreeRepo::finish_mutation_inner(
            &mut tx,
            page.id,
            summaries::PAGE_CREATED,
            actor,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(tree)
    }

    pub(crate) async fn insert_inner(
        conn: &mut PgConnection,
        title: &str,
        slug: &str,
        page_type: &str,
        status: &str,
        target_keyword: Option<&str>,
        now: Timestamp,
    ) -> Result<Page, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages \
                (title, slug, page_type, status, target_keyword, target_keyword_norm, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(title)
            .bind(slug)
            .bind(page_type)
            .bind(status)
            .bind(target_keyword)
            .bind(target_keyword.and_then(normalize_keyword))
            .bind(now)
            .fetch_one(&mut *conn)
            .await
    }

    /// Update page metadata. Fields left `None` are unchanged; an empty
    /// `target_keyword` clears it.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePage,
        actor: DbId,
        now: Timestamp,
    ) -> Result<Page, DbError> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        if let Some(page_type) = &input.page_type {
            validate_page_type(page_type)?;
        }
        if let Some(keyword) = &input.target_keyword {
            validate_keyword(keyword)?;
        }

        let mut tx = pool.begin().await?;
        let current = Self::find_writable_inner(&mut tx, id, actor, now).await?;

        let slug = match input.slug.as_deref() {
            Some(requested) => {
                let slug = normalize_slug(requested);
                validate_slug(&slug)?;
                if !Self::slug_available_inner(&mut tx, &slug, Some(id)).await? {
                    return Err(CoreError::SlugTaken { slug }.into());
                }
                slug
            }
            None => current.slug.clone(),
        };

        let keyword = match input.target_keyword.as_deref() {
            Some(k) => normalize_keyword(k).map(|_| k.trim().to_string()),
            None => current.target_keyword.clone(),
        };
        let keyword_changed = keyword.as_deref().and_then(normalize_keyword)
            != current.target_keyword.as_deref().and_then(normalize_keyword);
        if let Some(k) = &keyword {
            if keyword_changed && !input.allow_keyword_conflict {
                Self::ensure_keyword_free_inner(&mut tx, k, Some(id)).await?;
            }
        }

        let status = input
            .status
            .map_or(current.status.clone(), |s| s.as_str().to_string());

        let query = format!(
            "UPDATE pages SET \
                title = $2, slug = $3, page_type = $4, status = $5, \
                target_keyword = $6, target_keyword_norm = $7, updated_at = $8 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let page = sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(input.title.as_deref().unwrap_or(&current.title))
            .bind(&slug)
            .bind(input.page_type.as_deref().unwrap_or(&current.page_type))
            .bind(status)
            .bind(keyword.as_deref())
            .bind(keyword.as_deref().and_then(normalize_keyword))
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(page)
    }

    /// Bump `updated_at` on a page whose tree changed without a new version.
    pub(crate) async fn touch_inner(
        conn: &mut PgConnection,
        id: DbId,
        now: Timestamp,
    ) -> Result<Page, DbError> {
        let query = format!("UPDATE pages SET updated_at = $2 WHERE id = $1 RETURNING {COLUMNS}");
        let page = sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
        Ok(page)
    }

    /// Set the publication status of one page, honouring its lock.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: PageStatus,
        actor: DbId,
        now: Timestamp,
    ) -> Result<Page, DbError> {
        let mut tx = pool.begin().await?;
        Self::find_writable_inner(&mut tx, id, actor, now).await?;

        let query = format!(
            "UPDATE pages SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let page = sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(page)
    }

    /// Soft-delete a page, freeing its slug. Versions are kept.
    pub async fn soft_delete(
        pool: &PgPool,
        id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<(), DbError> {
        let mut tx = pool.begin().await?;
        Self::find_writable_inner(&mut tx, id, actor, now).await?;

        sqlx::query("UPDATE pages SET deleted_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Whether a page row exists at all, deleted or not. Version history
    /// stays readable after a soft delete.
    pub(crate) async fn exists_inner(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pages WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await
    }
}

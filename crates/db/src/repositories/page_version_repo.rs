//! Repository for the append-only `page_versions` table.

use pagetree_core::content_tree::SectionDraft;
use pagetree_core::error::CoreError;
use pagetree_core::types::{DbId, Timestamp};
use pagetree_core::versioning::{summaries, validate_summary, TreeSnapshot};
use sqlx::{PgConnection, PgPool};

use crate::models::page::PageTree;
use crate::models::page_version::{PageVersion, PageVersionInfo};
use crate::models::tree::SectionWithBlocks;
use crate::repositories::{PageRepo, PageTreeRepo};
use crate::DbError;

/// Column list including the snapshot payload.
const COLUMNS: &str = "id, page_id, version_number, snapshot, summary, created_by, created_at";

/// Column list for history listings.
const INFO_COLUMNS: &str = "id, page_id, version_number, summary, created_by, created_at";

/// Provides snapshot, history and restore operations.
pub struct PageVersionRepo;

impl PageVersionRepo {
    /// Reserve the next version number of a page.
    ///
    /// A single atomic increment on the page row: concurrent callers are
    /// serialised by the row lock and always receive distinct numbers.
    pub(crate) async fn next_number_inner(
        conn: &mut PgConnection,
        page_id: DbId,
    ) -> Result<i32, DbError> {
        sqlx::query_scalar(
            "UPDATE pages SET version_counter = version_counter + 1 \
             WHERE id = $1 RETURNING version_counter",
        )
        .bind(page_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::Core(CoreError::NotFound {
            entity: "Page",
            id: page_id,
        }))
    }

    /// Record `sections` as the page's next version.
    pub(crate) async fn snapshot_inner(
        conn: &mut PgConnection,
        page_id: DbId,
        sections: Vec<SectionDraft>,
        summary: Option<&str>,
        created_by: Option<DbId>,
        now: Timestamp,
    ) -> Result<PageVersion, DbError> {
        let payload = TreeSnapshot::new(sections).to_value()?;
        let version_number = Self::next_number_inner(conn, page_id).await?;

        let query = format!(
            "INSERT INTO page_versions \
                (page_id, version_number, snapshot, summary, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let version = sqlx::query_as::<_, PageVersion>(&query)
            .bind(page_id)
            .bind(version_number)
            .bind(&payload)
            .bind(summary)
            .bind(created_by)
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
        Ok(version)
    }

    /// Take an explicit snapshot of the page's current tree.
    pub async fn snapshot(
        pool: &PgPool,
        page_id: DbId,
        summary: Option<&str>,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageVersion, DbError> {
        if let Some(summary) = summary {
            validate_summary(summary)?;
        }

        let mut tx = pool.begin().await?;
        PageRepo::find_for_update_inner(&mut tx, page_id).await?;
        let drafts = PageTreeRepo::load_sections_inner(&mut tx, page_id)
            .await?
            .iter()
            .map(SectionWithBlocks::to_draft)
            .collect();
        let version = Self::snapshot_inner(
            &mut tx,
            page_id,
            drafts,
            Some(summary.unwrap_or(summaries::MANUAL)),
            Some(actor),
            now,
        )
        .await?;
        tx.commit().await?;
        Ok(version)
    }

    /// Version metadata of a page, newest first.
    pub async fn list_by_page(
        pool: &PgPool,
        page_id: DbId,
    ) -> Result<Vec<PageVersionInfo>, DbError> {
        let mut conn = pool.acquire().await?;
        if !PageRepo::exists_inner(&mut conn, page_id).await? {
            return Err(CoreError::NotFound {
                entity: "Page",
                id: page_id,
            }
            .into());
        }

        let query = format!(
            "SELECT {INFO_COLUMNS} FROM page_versions \
             WHERE page_id = $1 ORDER BY version_number DESC"
        );
        let versions = sqlx::query_as::<_, PageVersionInfo>(&query)
            .bind(page_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(versions)
    }

    /// One version of a page, including its snapshot.
    ///
    /// A version id that belongs to another page is reported as
    /// `VersionNotFound`.
    pub async fn find_for_page(
        pool: &PgPool,
        page_id: DbId,
        version_id: DbId,
    ) -> Result<PageVersion, DbError> {
        let mut conn = pool.acquire().await?;
        Self::find_for_page_inner(&mut conn, page_id, version_id).await
    }

    async fn find_for_page_inner(
        conn: &mut PgConnection,
        page_id: DbId,
        version_id: DbId,
    ) -> Result<PageVersion, DbError> {
        let query =
            format!("SELECT {COLUMNS} FROM page_versions WHERE id = $1 AND page_id = $2");
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(version_id)
            .bind(page_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(DbError::Core(CoreError::VersionNotFound {
                page_id,
                version_id,
            }))
    }

    /// Replace the page's live tree with the content of one of its versions.
    ///
    /// Rows are recreated under fresh ids. Restoring moves the live tree but
    /// does not itself record a version.
    pub async fn restore(
        pool: &PgPool,
        page_id: DbId,
        version_id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let mut tx = pool.begin().await?;
        PageRepo::find_writable_inner(&mut tx, page_id, actor, now).await?;

        let version = Self::find_for_page_inner(&mut tx, page_id, version_id).await?;
        let sections = TreeSnapshot::from_value(version.snapshot)?.into_restorable()?;

        PageTreeRepo::replace_sections_inner(&mut tx, page_id, &sections, now).await?;
        let page = PageRepo::touch_inner(&mut tx, page_id, now).await?;
        let sections = PageTreeRepo::load_sections_inner(&mut tx, page_id).await?;

        tx.commit().await?;
        Ok(PageTree { page, sections })
    }
}

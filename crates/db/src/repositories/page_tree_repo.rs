//! Repository for the section/block tree of a page (`page_sections`,
//! `section_blocks`).
//!
//! Every public mutation runs in one transaction that row-locks the page,
//! checks the resource lock, changes the tree, and records a version before
//! committing. Sibling `sort_order` values are dense and zero-based after
//! every commit; the unique order constraints are deferred so renumbering may
//! pass through transient duplicates.

use std::collections::HashMap;

use pagetree_core::content_tree::{
    changed_orders, insert_at, remove_by_id, reorder, validate_block, validate_section,
    validate_tree, BlockDraft, SectionDraft, Sibling, MAX_BLOCKS_PER_SECTION,
    MAX_SECTIONS_PER_PAGE, STATUS_DRAFT,
};
use pagetree_core::error::CoreError;
use pagetree_core::template::{plan_merge, ExistingSection};
use pagetree_core::types::{DbId, Timestamp};
use pagetree_core::versioning::{summaries, template_applied_summary};
use sqlx::{PgConnection, PgPool};

use crate::models::page::PageTree;
use crate::models::tree::{Block, Section, SectionWithBlocks};
use crate::repositories::{PageRepo, PageTemplateRepo, PageVersionRepo};
use crate::DbError;

const SECTION_COLUMNS: &str = "id, page_id, section_key, sort_order, created_at, updated_at";

const BLOCK_COLUMNS: &str = "id, section_id, block_type, sort_order, content, created_at, updated_at";

/// Tables holding ordered siblings.
#[derive(Debug, Clone, Copy)]
enum SiblingTable {
    Sections,
    Blocks,
}

impl SiblingTable {
    fn name(self) -> &'static str {
        match self {
            Self::Sections => "page_sections",
            Self::Blocks => "section_blocks",
        }
    }
}

/// Provides persisted content-tree operations.
pub struct PageTreeRepo;

impl PageTreeRepo {
    // -- reads ----------------------------------------------------------------

    /// Load a live page with its full ordered tree.
    pub async fn get_tree(pool: &PgPool, page_id: DbId) -> Result<Option<PageTree>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let Some(page) = PageRepo::find_live_inner(&mut conn, page_id).await? else {
            return Ok(None);
        };
        let sections = Self::load_sections_inner(&mut conn, page_id).await?;
        Ok(Some(PageTree { page, sections }))
    }

    /// All sections of a page with their blocks, both in `sort_order`.
    pub(crate) async fn load_sections_inner(
        conn: &mut PgConnection,
        page_id: DbId,
    ) -> Result<Vec<SectionWithBlocks>, sqlx::Error> {
        let query = format!(
            "SELECT {SECTION_COLUMNS} FROM page_sections WHERE page_id = $1 ORDER BY sort_order"
        );
        let sections = sqlx::query_as::<_, Section>(&query)
            .bind(page_id)
            .fetch_all(&mut *conn)
            .await?;

        let section_ids: Vec<DbId> = sections.iter().map(|s| s.id).collect();
        let query = format!(
            "SELECT {BLOCK_COLUMNS} FROM section_blocks \
             WHERE section_id = ANY($1) ORDER BY section_id, sort_order"
        );
        let blocks = sqlx::query_as::<_, Block>(&query)
            .bind(&section_ids)
            .fetch_all(&mut *conn)
            .await?;

        let mut by_section: HashMap<DbId, Vec<Block>> = HashMap::new();
        for block in blocks {
            by_section.entry(block.section_id).or_default().push(block);
        }

        Ok(sections
            .into_iter()
            .map(|section| {
                let blocks = by_section.remove(&section.id).unwrap_or_default();
                SectionWithBlocks { section, blocks }
            })
            .collect())
    }

    // -- whole-tree mutations -------------------------------------------------

    /// Atomically discard the page's tree and install `sections` in order.
    pub async fn replace_tree(
        pool: &PgPool,
        page_id: DbId,
        sections: &[SectionDraft],
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        validate_tree(sections)?;

        let mut tx = pool.begin().await?;
        PageRepo::find_writable_inner(&mut tx, page_id, actor, now).await?;
        Self::replace_sections_inner(&mut tx, page_id, sections, now).await?;
        let tree =
            Self::finish_mutation_inner(&mut tx, page_id, summaries::TREE_REPLACED, actor, now)
                .await?;
        tx.commit().await?;
        Ok(tree)
    }

    /// Merge a template into the page: missing sections are appended, and
    /// existing sections gain only block types they lack.
    ///
    /// Nothing is written and no version recorded when the page already
    /// covers the template.
    pub async fn apply_template(
        pool: &PgPool,
        page_id: DbId,
        template_id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let template = PageTemplateRepo::find_by_id(pool, template_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "PageTemplate",
                id: template_id,
            })?;
        let entries = template.entries()?;

        let mut tx = pool.begin().await?;
        let page = PageRepo::find_writable_inner(&mut tx, page_id, actor, now).await?;
        let sections = Self::load_sections_inner(&mut tx, page_id).await?;

        let existing: Vec<ExistingSection> = sections
            .iter()
            .map(|s| ExistingSection {
                section_key: s.section.section_key.clone(),
                block_types: s.blocks.iter().map(|b| b.block_type.clone()).collect(),
            })
            .collect();
        let plan = plan_merge(&existing, &entries);

        if plan.is_noop() {
            tx.commit().await?;
            return Ok(PageTree { page, sections });
        }

        if sections.len() + plan.new_sections.len() > MAX_SECTIONS_PER_PAGE {
            return Err(CoreError::Validation(format!(
                "Applying template '{}' would exceed {MAX_SECTIONS_PER_PAGE} sections",
                template.slug
            ))
            .into());
        }

        for additions in &plan.additions {
            let Some(target) = sections
                .iter()
                .find(|s| s.section.section_key == additions.section_key)
            else {
                continue;
            };
            let start = target.blocks.len();
            if start + additions.blocks.len() > MAX_BLOCKS_PER_SECTION {
                return Err(CoreError::Validation(format!(
                    "Applying template '{}' would exceed {MAX_BLOCKS_PER_SECTION} blocks in section '{}'",
                    template.slug, additions.section_key
                ))
                .into());
            }
            Self::insert_blocks_inner(
                &mut tx,
                target.section.id,
                &additions.blocks,
                start as i32,
                now,
            )
            .await?;
        }

        Self::install_sections_inner(
            &mut tx,
            page_id,
            &plan.new_sections,
            sections.len() as i32,
            now,
        )
        .await?;

        let tree = Self::finish_mutation_inner(
            &mut tx,
            page_id,
            &template_applied_summary(&template.slug),
            actor,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok(tree)
    }

    /// Deep-copy a page under a new id as a draft with a derived unique slug
    /// (`<slug>-2`, `<slug>-3`, ...) and no target keyword.
    pub async fn duplicate(
        pool: &PgPool,
        source_id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let mut tx = pool.begin().await?;

        let source = PageRepo::find_live_inner(&mut tx, source_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Page",
                id: source_id,
            })?;
        let drafts: Vec<SectionDraft> = Self::load_sections_inner(&mut tx, source_id)
            .await?
            .iter()
            .map(SectionWithBlocks::to_draft)
            .collect();

        let slug = PageRepo::unique_slug_inner(&mut tx, &source.slug, 2).await?;
        let title = format!("{} (Copy)", source.title);
        let copy = PageRepo::insert_inner(
            &mut tx,
            &title,
            &slug,
            &source.page_type,
            STATUS_DRAFT,
            None,
            now,
        )
        .await?;

        Self::install_sections_inner(&mut tx, copy.id, &drafts, 0, now).await?;
        let tree =
            Self::finish_mutation_inner(&mut tx, copy.id, summaries::DUPLICATED, actor, now)
                .await?;
        tx.commit().await?;
        Ok(tree)
    }

    // -- section mutations ----------------------------------------------------

    /// Insert a section at `at_index` (appended when absent or past the end).
    pub async fn insert_section(
        pool: &PgPool,
        page_id: DbId,
        draft: &SectionDraft,
        at_index: Option<usize>,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        validate_section(draft)?;

        let mut tx = pool.begin().await?;
        PageRepo::find_writable_inner(&mut tx, page_id, actor, now).await?;

        let mut siblings = Self::siblings_inner(&mut tx, SiblingTable::Sections, page_id).await?;
        if siblings.len() >= MAX_SECTIONS_PER_PAGE {
            return Err(CoreError::Validation(format!(
                "Page already has {MAX_SECTIONS_PER_PAGE} sections"
            ))
            .into());
        }
        let key_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM page_sections WHERE page_id = $1 AND section_key = $2)",
        )
        .bind(page_id)
        .bind(&draft.section_key)
        .fetch_one(&mut *tx)
        .await?;
        if key_taken {
            return Err(CoreError::Validation(format!(
                "Duplicate section_key '{}'",
                draft.section_key
            ))
            .into());
        }

        let appended = siblings.len() as i32;
        let section_id =
            Self::insert_section_row_inner(&mut tx, page_id, &draft.section_key, appended, now)
                .await?;
        Self::insert_blocks_inner(&mut tx, section_id, &draft.blocks, 0, now).await?;

        let new_sibling = Sibling {
            id: section_id,
            sort_order: appended,
        };
        let mut before = siblings.clone();
        before.push(new_sibling);
        insert_at(&mut siblings, new_sibling, at_index.unwrap_or(usize::MAX));
        Self::write_orders_inner(
            &mut tx,
            SiblingTable::Sections,
            &changed_orders(&before, &siblings),
        )
        .await?;

        let tree = Self::finish_mutation_inner(
            &mut tx,
            page_id,
            summaries::SECTION_INSERTED,
            actor,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok(tree)
    }

    /// Remove a section (and its blocks) and close the gap.
    pub async fn remove_section(
        pool: &PgPool,
        page_id: DbId,
        section_id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let mut tx = pool.begin().await?;
        PageRepo::find_writable_inner(&mut tx, page_id, actor, now).await?;

        let mut siblings = Self::siblings_inner(&mut tx, SiblingTable::Sections, page_id).await?;
        let before = siblings.clone();
        remove_by_id(&mut siblings, section_id).ok_or(CoreError::NotFound {
            entity: "Section",
            id: section_id,
        })?;

        sqlx::query("DELETE FROM page_sections WHERE id = $1")
            .bind(section_id)
            .execute(&mut *tx)
            .await?;
        Self::write_orders_inner(
            &mut tx,
            SiblingTable::Sections,
            &changed_orders(&before, &siblings),
        )
        .await?;

        let tree =
            Self::finish_mutation_inner(&mut tx, page_id, summaries::SECTION_REMOVED, actor, now)
                .await?;
        tx.commit().await?;
        Ok(tree)
    }

    /// Reorder all sections of a page. `ids` must be a permutation of the
    /// page's current section ids.
    pub async fn reorder_sections(
        pool: &PgPool,
        page_id: DbId,
        ids: &[DbId],
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let mut tx = pool.begin().await?;
        PageRepo::find_writable_inner(&mut tx, page_id, actor, now).await?;

        let before = Self::siblings_inner(&mut tx, SiblingTable::Sections, page_id).await?;
        let after = reorder(before.clone(), ids)?;
        Self::write_orders_inner(&mut tx, SiblingTable::Sections, &changed_orders(&before, &after))
            .await?;

        let tree = Self::finish_mutation_inner(
            &mut tx,
            page_id,
            summaries::SECTIONS_REORDERED,
            actor,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok(tree)
    }

    // -- block mutations ------------------------------------------------------

    /// Insert a block into a section at `at_index` (appended when absent or
    /// past the end).
    pub async fn insert_block(
        pool: &PgPool,
        section_id: DbId,
        draft: &BlockDraft,
        at_index: Option<usize>,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        validate_block(draft)?;

        let mut tx = pool.begin().await?;
        let page_id = Self::lock_section_page_inner(&mut tx, section_id, actor, now).await?;

        let mut siblings = Self::siblings_inner(&mut tx, SiblingTable::Blocks, section_id).await?;
        if siblings.len() >= MAX_BLOCKS_PER_SECTION {
            return Err(CoreError::Validation(format!(
                "Section already has {MAX_BLOCKS_PER_SECTION} blocks"
            ))
            .into());
        }

        let appended = siblings.len() as i32;
        let block_id = Self::insert_block_row_inner(&mut tx, section_id, draft, appended, now).await?;

        let new_sibling = Sibling {
            id: block_id,
            sort_order: appended,
        };
        let mut before = siblings.clone();
        before.push(new_sibling);
        insert_at(&mut siblings, new_sibling, at_index.unwrap_or(usize::MAX));
        Self::write_orders_inner(&mut tx, SiblingTable::Blocks, &changed_orders(&before, &siblings))
            .await?;

        let tree =
            Self::finish_mutation_inner(&mut tx, page_id, summaries::BLOCK_INSERTED, actor, now)
                .await?;
        tx.commit().await?;
        Ok(tree)
    }

    /// Remove a block from a section and close the gap.
    pub async fn remove_block(
        pool: &PgPool,
        section_id: DbId,
        block_id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let mut tx = pool.begin().await?;
        let page_id = Self::lock_section_page_inner(&mut tx, section_id, actor, now).await?;

        let mut siblings = Self::siblings_inner(&mut tx, SiblingTable::Blocks, section_id).await?;
        let before = siblings.clone();
        remove_by_id(&mut siblings, block_id).ok_or(CoreError::NotFound {
            entity: "Block",
            id: block_id,
        })?;

        sqlx::query("DELETE FROM section_blocks WHERE id = $1")
            .bind(block_id)
            .execute(&mut *tx)
            .await?;
        Self::write_orders_inner(&mut tx, SiblingTable::Blocks, &changed_orders(&before, &siblings))
            .await?;

        let tree =
            Self::finish_mutation_inner(&mut tx, page_id, summaries::BLOCK_REMOVED, actor, now)
                .await?;
        tx.commit().await?;
        Ok(tree)
    }

    /// Reorder all blocks of a section. `ids` must be a permutation of the
    /// section's current block ids.
    pub async fn reorder_blocks(
        pool: &PgPool,
        section_id: DbId,
        ids: &[DbId],
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let mut tx = pool.begin().await?;
        let page_id = Self::lock_section_page_inner(&mut tx, section_id, actor, now).await?;

        let before = Self::siblings_inner(&mut tx, SiblingTable::Blocks, section_id).await?;
        let after = reorder(before.clone(), ids)?;
        Self::write_orders_inner(&mut tx, SiblingTable::Blocks, &changed_orders(&before, &after))
            .await?;

        let tree =
            Self::finish_mutation_inner(&mut tx, page_id, summaries::BLOCKS_REORDERED, actor, now)
                .await?;
        tx.commit().await?;
        Ok(tree)
    }

    // -- transaction building blocks ------------------------------------------

    /// Delete every section of the page and install `sections` from order 0.
    pub(crate) async fn replace_sections_inner(
        conn: &mut PgConnection,
        page_id: DbId,
        sections: &[SectionDraft],
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM page_sections WHERE page_id = $1")
            .bind(page_id)
            .execute(&mut *conn)
            .await?;
        Self::install_sections_inner(conn, page_id, sections, 0, now).await
    }

    /// Insert `sections` with consecutive orders starting at `start_order`.
    pub(crate) async fn install_sections_inner(
        conn: &mut PgConnection,
        page_id: DbId,
        sections: &[SectionDraft],
        start_order: i32,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        for (offset, draft) in sections.iter().enumerate() {
            let section_id = Self::insert_section_row_inner(
                conn,
                page_id,
                &draft.section_key,
                start_order + offset as i32,
                now,
            )
            .await?;
            Self::insert_blocks_inner(conn, section_id, &draft.blocks, 0, now).await?;
        }
        Ok(())
    }

    /// Insert `blocks` into a section with consecutive orders from `start_order`.
    pub(crate) async fn insert_blocks_inner(
        conn: &mut PgConnection,
        section_id: DbId,
        blocks: &[BlockDraft],
        start_order: i32,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        for (offset, draft) in blocks.iter().enumerate() {
            Self::insert_block_row_inner(conn, section_id, draft, start_order + offset as i32, now)
                .await?;
        }
        Ok(())
    }

    /// Snapshot the page's current tree as its next version and return the
    /// refreshed page with that tree.
    pub(crate) async fn finish_mutation_inner(
        conn: &mut PgConnection,
        page_id: DbId,
        summary: &str,
        actor: DbId,
        now: Timestamp,
    ) -> Result<PageTree, DbError> {
        let sections = Self::load_sections_inner(conn, page_id).await?;
        let drafts = sections.iter().map(SectionWithBlocks::to_draft).collect();
        PageVersionRepo::snapshot_inner(conn, page_id, drafts, Some(summary), Some(actor), now)
            .await?;
        let page = PageRepo::find_live_inner(conn, page_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Page",
                id: page_id,
            })?;
        Ok(PageTree { page, sections })
    }

    // -- helpers --------------------------------------------------------------

    /// Resolve the page owning a section, row-lock it and check writability.
    async fn lock_section_page_inner(
        conn: &mut PgConnection,
        section_id: DbId,
        actor: DbId,
        now: Timestamp,
    ) -> Result<DbId, DbError> {
        let not_found = || {
            DbError::Core(CoreError::NotFound {
                entity: "Section",
                id: section_id,
            })
        };
        let page_id = Self::section_page_inner(conn, section_id)
            .await?
            .ok_or_else(not_found)?;
        PageRepo::find_writable_inner(conn, page_id, actor, now).await?;

        // The section may have been removed while we waited for the page.
        match Self::section_page_inner(conn, section_id).await? {
            Some(owner) if owner == page_id => Ok(page_id),
            _ => Err(not_found()),
        }
    }

    async fn section_page_inner(
        conn: &mut PgConnection,
        section_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT page_id FROM page_sections WHERE id = $1")
            .bind(section_id)
            .fetch_optional(&mut *conn)
            .await
    }

    async fn siblings_inner(
        conn: &mut PgConnection,
        table: SiblingTable,
        parent_id: DbId,
    ) -> Result<Vec<Sibling>, sqlx::Error> {
        let parent_column = match table {
            SiblingTable::Sections => "page_id",
            SiblingTable::Blocks => "section_id",
        };
        let query = format!(
            "SELECT id, sort_order FROM {} WHERE {parent_column} = $1 ORDER BY sort_order, id",
            table.name()
        );
        let rows = sqlx::query_as::<_, (DbId, i32)>(&query)
            .bind(parent_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, sort_order)| Sibling { id, sort_order })
            .collect())
    }

    /// Write new `sort_order` values for the given rows in one statement.
    async fn write_orders_inner(
        conn: &mut PgConnection,
        table: SiblingTable,
        changes: &[(DbId, i32)],
    ) -> Result<(), sqlx::Error> {
        if changes.is_empty() {
            return Ok(());
        }
        let (ids, orders): (Vec<DbId>, Vec<i32>) = changes.iter().copied().unzip();
        let query = format!(
            "UPDATE {table} AS t SET sort_order = v.ord \
             FROM UNNEST($1::BIGINT[], $2::INT[]) AS v(id, ord) \
             WHERE t.id = v.id",
            table = table.name()
        );
        sqlx::query(&query)
            .bind(&ids)
            .bind(&orders)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn insert_section_row_inner(
        conn: &mut PgConnection,
        page_id: DbId,
        section_key: &str,
        sort_order: i32,
        now: Timestamp,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO page_sections (page_id, section_key, sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING id",
        )
        .bind(page_id)
        .bind(section_key)
        .bind(sort_order)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
    }

    async fn insert_block_row_inner(
        conn: &mut PgConnection,
        section_id: DbId,
        draft: &BlockDraft,
        sort_order: i32,
        now: Timestamp,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO section_blocks \
                (section_id, block_type, sort_order, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING id",
        )
        .bind(section_id)
        .bind(&draft.block_type)
        .bind(sort_order)
        .bind(&draft.content)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
    }
}

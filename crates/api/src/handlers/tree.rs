//! Handlers that change the section/block tree of a page.
//!
//! Every handler here is lock-checked and records a new version of the page
//! (applying a template that adds nothing records none). Responses carry the
//! full updated tree.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use pagetree_core::types::DbId;
use pagetree_db::models::page::{PageTree, ReplaceTree};
use pagetree_db::models::page_template::ApplyTemplate;
use pagetree_db::models::tree::{InsertBlock, InsertSection, ReorderRequest};
use pagetree_db::repositories::PageTreeRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

type TreeResponse = Json<DataResponse<PageTree>>;

fn respond(tree: PageTree) -> TreeResponse {
    Json(DataResponse { data: tree })
}

// ---------------------------------------------------------------------------
// Whole tree
// ---------------------------------------------------------------------------

/// PUT /api/v1/pages/{id}/tree
pub async fn replace_tree(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
    Json(input): Json<ReplaceTree>,
) -> AppResult<TreeResponse> {
    let tree =
        PageTreeRepo::replace_tree(&state.pool, page_id, &input.sections, auth.user_id, Utc::now())
            .await?;

    tracing::info!(
        user_id = auth.user_id,
        page_id,
        version = tree.page.version_counter,
        sections = tree.sections.len(),
        "Page tree replaced"
    );
    Ok(respond(tree))
}

/// POST /api/v1/pages/{id}/apply-template
pub async fn apply_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
    Json(input): Json<ApplyTemplate>,
) -> AppResult<TreeResponse> {
    let tree = PageTreeRepo::apply_template(
        &state.pool,
        page_id,
        input.template_id,
        auth.user_id,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        page_id,
        template_id = input.template_id,
        version = tree.page.version_counter,
        "Template applied"
    );
    Ok(respond(tree))
}

/// POST /api/v1/pages/{id}/duplicate
pub async fn duplicate_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
) -> AppResult<(StatusCode, TreeResponse)> {
    let tree = PageTreeRepo::duplicate(&state.pool, page_id, auth.user_id, Utc::now()).await?;

    tracing::info!(
        user_id = auth.user_id,
        source_page_id = page_id,
        page_id = tree.page.id,
        slug = %tree.page.slug,
        "Page duplicated"
    );
    Ok((StatusCode::CREATED, respond(tree)))
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// POST /api/v1/pages/{id}/sections
pub async fn insert_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
    Json(input): Json<InsertSection>,
) -> AppResult<(StatusCode, TreeResponse)> {
    let tree = PageTreeRepo::insert_section(
        &state.pool,
        page_id,
        &input.section,
        input.at_index,
        auth.user_id,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        page_id,
        section_key = %input.section.section_key,
        "Section inserted"
    );
    Ok((StatusCode::CREATED, respond(tree)))
}

/// DELETE /api/v1/pages/{id}/sections/{section_id}
pub async fn remove_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((page_id, section_id)): Path<(DbId, DbId)>,
) -> AppResult<TreeResponse> {
    let tree =
        PageTreeRepo::remove_section(&state.pool, page_id, section_id, auth.user_id, Utc::now())
            .await?;

    tracing::info!(user_id = auth.user_id, page_id, section_id, "Section removed");
    Ok(respond(tree))
}

/// PUT /api/v1/pages/{id}/sections/order
pub async fn reorder_sections(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
    Json(input): Json<ReorderRequest>,
) -> AppResult<TreeResponse> {
    let tree =
        PageTreeRepo::reorder_sections(&state.pool, page_id, &input.ids, auth.user_id, Utc::now())
            .await?;

    tracing::info!(user_id = auth.user_id, page_id, "Sections reordered");
    Ok(respond(tree))
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// POST /api/v1/sections/{id}/blocks
pub async fn insert_block(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<DbId>,
    Json(input): Json<InsertBlock>,
) -> AppResult<(StatusCode, TreeResponse)> {
    let tree = PageTreeRepo::insert_block(
        &state.pool,
        section_id,
        &input.block,
        input.at_index,
        auth.user_id,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        page_id = tree.page.id,
        section_id,
        block_type = %input.block.block_type,
        "Block inserted"
    );
    Ok((StatusCode::CREATED, respond(tree)))
}

/// DELETE /api/v1/sections/{id}/blocks/{block_id}
pub async fn remove_block(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((section_id, block_id)): Path<(DbId, DbId)>,
) -> AppResult<TreeResponse> {
    let tree =
        PageTreeRepo::remove_block(&state.pool, section_id, block_id, auth.user_id, Utc::now())
            .await?;

    tracing::info!(user_id = auth.user_id, section_id, block_id, "Block removed");
    Ok(respond(tree))
}

/// PUT /api/v1/sections/{id}/blocks/order
pub async fn reorder_blocks(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<DbId>,
    Json(input): Json<ReorderRequest>,
) -> AppResult<TreeResponse> {
    let tree = PageTreeRepo::reorder_blocks(
        &state.pool,
        section_id,
        &input.ids,
        auth.user_id,
        Utc::now(),
    )
    .await?;

    tracing::info!(user_id = auth.user_id, section_id, "Blocks reordered");
    Ok(respond(tree))
}

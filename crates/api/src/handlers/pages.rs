//! Handlers for the `/pages` resource: metadata CRUD and listing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use pagetree_core::content_tree::validate_page_type;
use pagetree_core::error::CoreError;
use pagetree_core::types::DbId;
use pagetree_db::models::page::{CreatePage, Page, PageFilter, PageListItem, PageTree, UpdatePage};
use pagetree_db::repositories::{PageRepo, PageTreeRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/pages?page_type=&status=&limit=&offset=
///
/// Each page carries its live lock (if any) so editors can see who is
/// working on what.
pub async fn list_pages(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PageFilter>,
) -> AppResult<Json<DataResponse<Vec<PageListItem>>>> {
    if let Some(page_type) = &filter.page_type {
        validate_page_type(page_type)?;
    }
    let pages = PageRepo::list_with_locks(&state.pool, &filter, Utc::now()).await?;
    Ok(Json(DataResponse { data: pages }))
}

/// POST /api/v1/pages
pub async fn create_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePage>,
) -> AppResult<(StatusCode, Json<DataResponse<PageTree>>)> {
    let tree = PageRepo::create(&state.pool, &input, auth.user_id, Utc::now()).await?;

    tracing::info!(
        user_id = auth.user_id,
        page_id = tree.page.id,
        slug = %tree.page.slug,
        sections = tree.sections.len(),
        "Page created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: tree })))
}

/// GET /api/v1/pages/{id}
pub async fn get_page(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PageTree>>> {
    let tree = PageTreeRepo::get_tree(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Page", id }))?;
    Ok(Json(DataResponse { data: tree }))
}

/// PUT /api/v1/pages/{id}
pub async fn update_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePage>,
) -> AppResult<Json<DataResponse<Page>>> {
    let page = PageRepo::update(&state.pool, id, &input, auth.user_id, Utc::now()).await?;

    tracing::info!(user_id = auth.user_id, page_id = id, "Page updated");
    Ok(Json(DataResponse { data: page }))
}

/// DELETE /api/v1/pages/{id}
pub async fn delete_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    PageRepo::soft_delete(&state.pool, id, auth.user_id, Utc::now()).await?;

    tracing::info!(user_id = auth.user_id, page_id = id, "Page deleted");
    Ok(StatusCode::NO_CONTENT)
}

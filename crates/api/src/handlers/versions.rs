//! Handlers for page version history.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use pagetree_core::types::DbId;
use pagetree_db::models::page::PageTree;
use pagetree_db::models::page_version::{CreateSnapshot, PageVersion, PageVersionInfo};
use pagetree_db::repositories::PageVersionRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/pages/{id}/versions
///
/// Newest first. Snapshots are left out of the listing.
pub async fn list_versions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<PageVersionInfo>>>> {
    let versions = PageVersionRepo::list_by_page(&state.pool, page_id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/v1/pages/{id}/versions
pub async fn create_snapshot(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
    Json(input): Json<CreateSnapshot>,
) -> AppResult<(StatusCode, Json<DataResponse<PageVersion>>)> {
    let version = PageVersionRepo::snapshot(
        &state.pool,
        page_id,
        input.summary.as_deref(),
        auth.user_id,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        page_id,
        version = version.version_number,
        "Snapshot taken"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: version })))
}

/// GET /api/v1/pages/{id}/versions/{version_id}
pub async fn get_version(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((page_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<PageVersion>>> {
    let version = PageVersionRepo::find_for_page(&state.pool, page_id, version_id).await?;
    Ok(Json(DataResponse { data: version }))
}

/// POST /api/v1/pages/{id}/versions/{version_id}/restore
pub async fn restore_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((page_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<PageTree>>> {
    let tree =
        PageVersionRepo::restore(&state.pool, page_id, version_id, auth.user_id, Utc::now())
            .await?;

    tracing::info!(user_id = auth.user_id, page_id, version_id, "Version restored");
    Ok(Json(DataResponse { data: tree }))
}

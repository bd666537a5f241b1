//! Handlers for page templates.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pagetree_core::error::CoreError;
use pagetree_core::types::DbId;
use pagetree_db::models::page_template::{CreatePageTemplate, PageTemplate};
use pagetree_db::repositories::PageTemplateRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/templates
pub async fn list_templates(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<PageTemplate>>>> {
    let templates = PageTemplateRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// POST /api/v1/templates
pub async fn create_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePageTemplate>,
) -> AppResult<(StatusCode, Json<DataResponse<PageTemplate>>)> {
    let template = PageTemplateRepo::create(&state.pool, &input).await?;

    tracing::info!(
        user_id = auth.user_id,
        template_id = template.id,
        slug = %template.slug,
        entries = input.skeleton.len(),
        "Template created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PageTemplate>>> {
    let template = PageTemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PageTemplate",
            id,
        }))?;
    Ok(Json(DataResponse { data: template }))
}

//! Read-only slug and target-keyword checks used by editors before saving.

use axum::extract::{Query, State};
use axum::Json;
use pagetree_core::conflict::{normalize_slug, validate_keyword, validate_slug, KeywordConflict};
use pagetree_core::types::DbId;
use pagetree_db::repositories::PageRepo;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SlugCheckParams {
    pub slug: String,
    /// The page being edited; its own slug never counts as taken.
    pub page_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct SlugCheck {
    pub slug: String,
    pub available: bool,
}

/// GET /api/v1/pages/validate-slug?slug=&page_id=
pub async fn validate_slug_handler(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SlugCheckParams>,
) -> AppResult<Json<DataResponse<SlugCheck>>> {
    let slug = normalize_slug(&params.slug);
    validate_slug(&slug)?;
    let available = PageRepo::slug_available(&state.pool, &slug, params.page_id).await?;
    Ok(Json(DataResponse {
        data: SlugCheck { slug, available },
    }))
}

#[derive(Debug, Deserialize)]
pub struct KeywordCheckParams {
    pub keyword: String,
    pub page_id: Option<DbId>,
}

/// GET /api/v1/pages/keyword-conflicts?keyword=&page_id=
///
/// Lists other live pages targeting the same normalised keyword.
pub async fn keyword_conflicts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<KeywordCheckParams>,
) -> AppResult<Json<DataResponse<Vec<KeywordConflict>>>> {
    validate_keyword(&params.keyword)?;
    let conflicts =
        PageRepo::keyword_conflicts(&state.pool, &params.keyword, params.page_id).await?;
    Ok(Json(DataResponse { data: conflicts }))
}

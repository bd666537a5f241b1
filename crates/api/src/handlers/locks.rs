//! Handlers for cooperative resource locks.
//!
//! A lock is toggled: the first call takes it, the holder's second call
//! releases it. Anyone else gets a 409 naming the holder until the lock is
//! released or expires.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use pagetree_core::types::DbId;
use pagetree_db::models::resource_lock::{LockRequest, LockToggle, ResourceLock};
use pagetree_db::repositories::ResourceLockRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/locks/toggle
pub async fn toggle_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockRequest>,
) -> AppResult<Json<DataResponse<LockToggle>>> {
    let toggle = ResourceLockRepo::toggle(
        &state.pool,
        &input.resource_type,
        input.resource_id,
        auth.user_id,
        state.config.lock_ttl_mins,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        resource_type = %input.resource_type,
        resource_id = input.resource_id,
        transition = ?toggle.transition,
        "Lock toggled"
    );
    Ok(Json(DataResponse { data: toggle }))
}

/// POST /api/v1/locks/extend
///
/// Renew a lock the caller holds for another full TTL.
pub async fn extend_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockRequest>,
) -> AppResult<Json<DataResponse<ResourceLock>>> {
    let lock = ResourceLockRepo::extend(
        &state.pool,
        &input.resource_type,
        input.resource_id,
        auth.user_id,
        state.config.lock_ttl_mins,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        resource_type = %input.resource_type,
        resource_id = input.resource_id,
        expires_at = %lock.expires_at,
        "Lock extended"
    );
    Ok(Json(DataResponse { data: lock }))
}

/// GET /api/v1/locks/{resource_type}/{resource_id}
///
/// Returns the live lock, or `null` when the resource is free.
pub async fn get_lock(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, DbId)>,
) -> AppResult<Json<DataResponse<Option<ResourceLock>>>> {
    let lock =
        ResourceLockRepo::inspect(&state.pool, &resource_type, resource_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: lock }))
}

//! Handlers for bulk page operations.
//!
//! Small batches run inline and return the per-page result directly. Larger
//! batches, or any batch sent with `"async": true`, are recorded and run on a
//! background task; the caller polls `GET /bulk-operations/{id}` for the outcome.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pagetree_core::bulk::{should_run_async, validate_batch, BulkOperationKind};
use pagetree_core::error::CoreError;
use pagetree_core::types::DbId;
use pagetree_db::models::bulk_operation::{BulkOperation, BulkRequest, BulkResponse};
use pagetree_db::repositories::{BulkOperationRepo, PageTemplateRepo};

use crate::engine::bulk::apply_bulk;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/pages/bulk
///
/// Returns 200 with the result for inline runs, 202 with the recorded run for
/// background runs. A background run requested during shutdown comes back
/// already `failed`.
pub async fn bulk_pages(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<BulkRequest>,
) -> AppResult<Response> {
    validate_batch(&input.page_ids)?;

    // An unknown template would fail every page the same way.
    if let BulkOperationKind::ApplyTemplate { template_id } = input.operation {
        if PageTemplateRepo::find_by_id(&state.pool, template_id)
            .await?
            .is_none()
        {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "PageTemplate",
                id: template_id,
            }));
        }
    }

    let operation = input.operation.as_str();

    if should_run_async(
        input.page_ids.len(),
        state.config.bulk_async_threshold,
        input.run_async,
    ) {
        let mut run = BulkOperationRepo::create(
            &state.pool,
            &input.operation,
            &input.page_ids,
            auth.user_id,
        )
        .await?;
        let started = state
            .bulk_tracker
            .spawn_run(
                state.pool.clone(),
                run.id,
                input.page_ids,
                input.operation,
                auth.user_id,
            )
            .await;
        if !started {
            if let Some(refused) = BulkOperationRepo::find_by_id(&state.pool, run.id).await? {
                run = refused;
            }
        }

        tracing::info!(
            user_id = auth.user_id,
            run_id = run.id,
            operation,
            pages = run.total_count,
            "Bulk run queued"
        );
        return Ok((StatusCode::ACCEPTED, Json(DataResponse { data: run })).into_response());
    }

    let result = apply_bulk(&state.pool, &input.page_ids, &input.operation, auth.user_id).await;

    tracing::info!(
        user_id = auth.user_id,
        operation,
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Bulk run finished"
    );
    Ok(Json(DataResponse {
        data: BulkResponse { operation, result },
    })
    .into_response())
}

/// GET /api/v1/bulk-operations/{id}
///
/// Only the user who queued a run can read it.
pub async fn get_bulk_operation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BulkOperation>>> {
    let run = BulkOperationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "BulkOperation",
            id,
        }))?;
    if run.requested_by != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Bulk run belongs to another user".into(),
        )));
    }
    Ok(Json(DataResponse { data: run }))
}

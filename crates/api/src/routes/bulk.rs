use axum::routing::get;
use axum::Router;

use crate::handlers::bulk;
use crate::state::AppState;

/// Bulk run routes mounted at `/bulk-operations`.
///
/// ```text
/// GET /{id}        -> get_bulk_operation
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(bulk::get_bulk_operation))
}

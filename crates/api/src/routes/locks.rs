//! Route definitions for cooperative resource locks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock routes mounted at `/locks`.
///
/// ```text
/// POST /toggle                             -> toggle_lock
/// POST /extend                             -> extend_lock
/// GET  /{resource_type}/{resource_id}      -> get_lock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/toggle", post(locks::toggle_lock))
        .route("/extend", post(locks::extend_lock))
        .route("/{resource_type}/{resource_id}", get(locks::get_lock))
}

//! Route definitions for block operations addressed by section.

use axum::routing::{delete, post, put};
use axum::Router;

use crate::handlers::tree;
use crate::state::AppState;

/// Section routes mounted at `/sections`.
///
/// ```text
/// POST   /{id}/blocks                  -> insert_block
/// PUT    /{id}/blocks/order            -> reorder_blocks
/// DELETE /{id}/blocks/{block_id}       -> remove_block
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/blocks", post(tree::insert_block))
        .route("/{id}/blocks/order", put(tree::reorder_blocks))
        .route("/{id}/blocks/{block_id}", delete(tree::remove_block))
}

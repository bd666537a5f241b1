use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::bulk::BulkTracker;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pagetree_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Background bulk runs still in flight.
    pub bulk_tracker: BulkTracker,
}

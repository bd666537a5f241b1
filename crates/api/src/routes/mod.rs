pub mod bulk;
pub mod health;
pub mod locks;
pub mod pages;
pub mod sections;
pub mod templates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /locks/toggle                                   take or release (POST)
/// /locks/extend                                   renew own lock (POST)
/// /locks/{resource_type}/{resource_id}            inspect (GET)
///
/// /pages                                          list, create
/// /pages/validate-slug                            slug availability (GET)
/// /pages/keyword-conflicts                        keyword conflicts (GET)
/// /pages/bulk                                     bulk operation (POST)
/// /pages/{id}                                     get, update, delete
/// /pages/{id}/tree                                replace tree (PUT)
/// /pages/{id}/apply-template                      apply template (POST)
/// /pages/{id}/duplicate                           duplicate (POST)
/// /pages/{id}/sections                            insert section (POST)
/// /pages/{id}/sections/order                      reorder sections (PUT)
/// /pages/{id}/sections/{section_id}               remove section (DELETE)
/// /pages/{id}/versions                            list, snapshot
/// /pages/{id}/versions/{version_id}               get
/// /pages/{id}/versions/{version_id}/restore       restore (POST)
///
/// /sections/{id}/blocks                           insert block (POST)
/// /sections/{id}/blocks/order                     reorder blocks (PUT)
/// /sections/{id}/blocks/{block_id}                remove block (DELETE)
///
/// /templates                                      list, create
/// /templates/{id}                                 get
///
/// /bulk-operations/{id}                           poll background run (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/locks", locks::router())
        .nest("/pages", pages::router())
        .nest("/sections", sections::router())
        .nest("/templates", templates::router())
        .nest("/bulk-operations", bulk::router())
}

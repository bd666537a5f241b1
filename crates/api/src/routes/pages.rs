//! Route definitions for pages, their trees and their version history.
//!
//! All endpoints require authentication via the `AuthUser` extractor.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{bulk, conflicts, pages, tree, versions};
use crate::state::AppState;

/// Page routes mounted at `/pages`.
///
/// ```text
/// GET    /                                           -> list_pages
/// POST   /                                           -> create_page
/// GET    /validate-slug?slug=&page_id=               -> validate_slug_handler
/// GET    /keyword-conflicts?keyword=&page_id=        -> keyword_conflicts
/// POST   /bulk                                       -> bulk_pages
/// GET    /{id}                                       -> get_page
/// PUT    /{id}                                       -> update_page
/// DELETE /{id}                                       -> delete_page
/// PUT    /{id}/tree                                  -> replace_tree
/// POST   /{id}/apply-template                        -> apply_template
/// POST   /{id}/duplicate                             -> duplicate_page
/// POST   /{id}/sections                              -> insert_section
/// PUT    /{id}/sections/order                        -> reorder_sections
/// DELETE /{id}/sections/{section_id}                 -> remove_section
/// GET    /{id}/versions                              -> list_versions
/// POST   /{id}/versions                              -> create_snapshot
/// GET    /{id}/versions/{version_id}                 -> get_version
/// POST   /{id}/versions/{version_id}/restore         -> restore_version
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::list_pages).post(pages::create_page))
        .route("/validate-slug", get(conflicts::validate_slug_handler))
        .route("/keyword-conflicts", get(conflicts::keyword_conflicts))
        .route("/bulk", post(bulk::bulk_pages))
        .route(
            "/{id}",
            get(pages::get_page)
                .put(pages::update_page)
                .delete(pages::delete_page),
        )
        .route("/{id}/tree", put(tree::replace_tree))
        .route("/{id}/apply-template", post(tree::apply_template))
        .route("/{id}/duplicate", post(tree::duplicate_page))
        .route("/{id}/sections", post(tree::insert_section))
        .route("/{id}/sections/order", put(tree::reorder_sections))
        .route(
            "/{id}/sections/{section_id}",
            delete(tree::remove_section),
        )
        .route(
            "/{id}/versions",
            get(versions::list_versions).post(versions::create_snapshot),
        )
        .route("/{id}/versions/{version_id}", get(versions::get_version))
        .route(
            "/{id}/versions/{version_id}/restore",
            post(versions::restore_version),
        )
}

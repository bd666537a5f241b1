//! Repository structs, one per aggregate.
//!
//! Repositories are zero-sized structs whose async methods take a `&PgPool`.
//! Methods suffixed `_inner` take an open transaction (or connection) so that
//! several steps can commit atomically.

pub mod bulk_operation_repo;
pub mod page_repo;
pub mod page_template_repo;
pub mod page_tree_repo;
pub mod page_version_repo;
pub mod resource_lock_repo;

pub use bulk_operation_repo::BulkOperationRepo;
pub use page_repo::PageRepo;
pub use page_template_repo::PageTemplateRepo;
pub use page_tree_repo::PageTreeRepo;
pub use page_version_repo::PageVersionRepo;
pub use resource_lock_repo::ResourceLockRepo;

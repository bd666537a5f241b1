//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` request DTOs for creates and patches

pub mod bulk_operation;
pub mod page;
pub mod page_template;
pub mod page_version;
pub mod resource_lock;
pub mod tree;

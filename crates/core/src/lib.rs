//! Domain logic for the page-tree content backend.
//!
//! Everything in this crate is pure: no database, no HTTP. The `db` crate
//! persists what these modules compute and the `api` crate exposes it.

pub mod bulk;
pub mod conflict;
pub mod content_tree;
pub mod error;
pub mod locking;
pub mod template;
pub mod types;
pub mod versioning;

//! Multi-page execution engines.
//!
//! - [`bulk`] -- applies one operation to many pages, inline or in the background.

pub mod bulk;

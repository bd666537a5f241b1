pub mod bulk;
pub mod conflicts;
pub mod locks;
pub mod pages;
pub mod templates;
pub mod tree;
pub mod versions;

//! Editorial metadata from the content store

pub mod models;
pub mod store;

pub use models::{Artefact, Detail, Part};
pub use store::{parse_content_item, ContentError, ContentStore, HttpContentStore};

//! Catalog persistence

pub mod catalog;

pub use catalog::{change_status, CatalogStore, SqliteCatalogStore};

//! # Cinelist Common Library
//!
//! Shared code for the cinelist catalog service:
//! - Error type and result alias
//! - Configuration loading (TOML, environment overrides, validation)
//! - SQLite initialization and the catalog schema
//! - Clock abstraction used for selection expiry
//! - Identifier helpers (internal short ids, correlation ids)
//! - Outgoing chat event bus

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod ids;
pub mod time;

pub use error::{Error, Result};

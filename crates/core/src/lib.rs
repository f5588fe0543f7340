//! ELOG core library.
//!
//! This crate provides the building blocks of the logbook service:
//! configuration, entry import validation and reader grants, projection of
//! stored records into their public view, SQLite persistence, person and
//! group directory lookups, and bearer token handling.

pub mod config;
pub mod db;
pub mod directory;
pub mod errors;
pub mod import;
pub mod mapper;
pub mod models;
pub mod token;

// Re-exports for convenience.
pub use config::AppConfig;
pub use db::Database;
pub use directory::Directory;
pub use import::{import_entry, validate_request, EntryImportPersistence};
pub use mapper::LogMapper;
pub use token::TokenIssuer;

//! REST API endpoint modules.

pub mod auth;
pub mod directory;
pub mod entries;
pub mod status;

//! Error types for the ELOG core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// An entry import request was rejected before anything was persisted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The request carried no `entry` payload.
    #[error("import request is missing the entry payload")]
    MissingEntry,

    /// A reader user id was empty or whitespace.
    #[error("reader user ids must not be blank")]
    BlankReaderId,

    /// The entry payload failed its own field checks.
    #[error("invalid entry: {0}")]
    InvalidEntry(#[from] validator::ValidationErrors),
}

// ---------------------------------------------------------------------------
// Import errors
// ---------------------------------------------------------------------------

/// Errors from the validate-then-persist import pipeline.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("import storage error: {0}")]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed {
        version: u32,
        detail: String,
    },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// A record with the same unique key already exists.
    #[error("{entity} already exists: {id}")]
    Duplicate {
        entity: String,
        id: String,
    },

    /// A stored value could not be decoded.
    #[error("corrupt {column} value '{value}': {detail}")]
    CorruptValue {
        column: String,
        value: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Directory errors
// ---------------------------------------------------------------------------

/// Errors from the person / group directory lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// LDAP connection, bind or search failure.
    #[error("LDAP error: {0}")]
    Ldap(#[from] ldap3::LdapError),

    /// The static directory file could not be loaded.
    #[error("directory file error at '{path}': {detail}")]
    FileError {
        path: String,
        detail: String,
    },

    /// TOML parse error when reading the static directory file.
    #[error("directory file parse error: {0}")]
    ParseError(String),

    /// Generic I/O error.
    #[error("directory I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Token errors
// ---------------------------------------------------------------------------

/// Errors from bearer token issuance and verification.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No signing key is available.
    #[error("token signing key is not configured")]
    MissingKey,

    /// The configured lifetime does not fit in a timestamp.
    #[error("token lifetime of {0}s is out of range")]
    InvalidLifetime(u64),

    /// Encoding, signature or claim validation failed.
    #[error("token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

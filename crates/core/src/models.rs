//! Domain model types used throughout the ELOG service.
//!
//! These types bridge the import pipeline, the database layer, and the web
//! API. Wire names are camelCase to match the public REST representation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ---------------------------------------------------------------------------
// Import request
// ---------------------------------------------------------------------------

/// Inbound body of an entry import call.
///
/// Both fields are optional on the wire so that a missing entry surfaces as
/// a validation failure instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryImportRequest {
    /// Users to grant read access on the entry's logbooks.
    #[serde(default)]
    pub reader_user_ids: Option<Vec<String>>,

    /// The entry to import.
    #[serde(default)]
    pub entry: Option<EntryImport>,
}

/// The entry payload carried by an [`EntryImportRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EntryImport {
    /// Names of the logbooks the entry belongs to.
    #[serde(default)]
    #[validate(
        length(min = 1, message = "at least one logbook is required"),
        custom(function = "validate_names")
    )]
    pub logbooks: Vec<String>,

    #[serde(default)]
    #[validate(
        length(min = 1, max = 255, message = "title must be 1 to 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,

    /// Body of the entry.
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_names"))]
    pub tags: Vec<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    /// Account name of the author in the source system.
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    pub user_name: String,

    /// When the logged event happened, if different from `logged_at`.
    #[serde(default)]
    pub event_at: Option<DateTime<Utc>>,

    /// When the entry was written. Defaults to the import time.
    #[serde(default)]
    pub logged_at: Option<DateTime<Utc>>,

    /// Identifier of the entry in the system it was exported from.
    #[serde(default)]
    pub origin_id: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_names(names: &[String]) -> Result<(), validator::ValidationError> {
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(validator::ValidationError::new("blank_name"));
    }
    Ok(())
}

/// A validated import request, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCommand {
    /// Deduplicated reader user ids.
    pub reader_user_ids: BTreeSet<String>,
    pub entry: EntryImport,
}

// ---------------------------------------------------------------------------
// Persisted log record
// ---------------------------------------------------------------------------

/// The stored representation of an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    pub id: String,
    pub logbooks: Vec<String>,
    pub title: String,
    pub text: String,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: String,
    pub logged_at: DateTime<Utc>,
    pub event_at: Option<DateTime<Utc>>,
    pub origin_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Public view
// ---------------------------------------------------------------------------

/// Public projection of a [`LogRecord`] returned by read APIs.
///
/// `author` is derived from the record's first and last name on every
/// projection and is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryView {
    pub id: String,
    pub logbooks: Vec<String>,
    pub title: String,
    pub text: String,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: String,
    pub logged_at: DateTime<Utc>,
    pub event_at: Option<DateTime<Utc>>,
    pub origin_id: Option<String>,
}

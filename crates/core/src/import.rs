//! Entry import validation and reader-grant normalization.
//!
//! [`validate_request`] turns a raw [`EntryImportRequest`] into an
//! [`ImportCommand`]: the entry must be present and pass its field checks,
//! and the reader list is collapsed into a set. Persisting the command and
//! applying the grants is the job of an [`EntryImportPersistence`]
//! implementation.

use std::collections::BTreeSet;

use tracing::debug;
use validator::Validate;

use crate::errors::{DatabaseError, ImportError, ValidationError};
use crate::models::{EntryImportRequest, ImportCommand, LogRecord};

/// Storage side of an import: persist the entry and apply its reader grants.
pub trait EntryImportPersistence {
    fn create(&self, command: &ImportCommand) -> Result<LogRecord, DatabaseError>;
}

/// Validate an import request and normalize its reader list.
///
/// A missing `readerUserIds` is treated as an empty list. Duplicate ids
/// collapse into a single grant; blank ids are rejected.
pub fn validate_request(request: EntryImportRequest) -> Result<ImportCommand, ValidationError> {
    let entry = request.entry.ok_or(ValidationError::MissingEntry)?;
    entry.validate()?;

    let reader_user_ids: BTreeSet<String> =
        request.reader_user_ids.unwrap_or_default().into_iter().collect();
    if reader_user_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ValidationError::BlankReaderId);
    }

    debug!(
        title = %entry.title,
        logbooks = entry.logbooks.len(),
        readers = reader_user_ids.len(),
        "import request validated"
    );

    Ok(ImportCommand {
        reader_user_ids,
        entry,
    })
}

/// Validate `request` and hand the resulting command to `store`.
///
/// Nothing is persisted when validation fails.
pub fn import_entry<P>(store: &P, request: EntryImportRequest) -> Result<LogRecord, ImportError>
where
    P: EntryImportPersistence + ?Sized,
{
    let command = validate_request(request)?;
    let record = store.create(&command)?;
    debug!(id = %record.id, "entry imported");
    Ok(record)
}

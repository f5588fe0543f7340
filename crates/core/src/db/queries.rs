//! Typed query helpers for log records and logbook grants.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use super::Database;
use crate::errors::DatabaseError;
use crate::import::EntryImportPersistence;
use crate::models::{ImportCommand, LogRecord};

/// Permission name stored for reader grants.
pub const READ_PERMISSION: &str = "read";

const LOG_COLUMNS: &str = "l.id, l.title, l.text, l.note, l.first_name, l.last_name, \
                           l.user_name, l.logged_at, l.event_at, l.origin_id";

/// A raw row from the `logs` table, before timestamps are decoded and the
/// logbook / tag lists are attached.
struct LogRow {
    id: String,
    title: String,
    text: String,
    note: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    user_name: String,
    logged_at: String,
    event_at: Option<String>,
    origin_id: Option<String>,
}

impl LogRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            text: row.get(2)?,
            note: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            user_name: row.get(6)?,
            logged_at: row.get(7)?,
            event_at: row.get(8)?,
            origin_id: row.get(9)?,
        })
    }

    fn into_record(self, conn: &Connection) -> Result<LogRecord, DatabaseError> {
        let logbooks = string_list(
            conn,
            "SELECT logbook FROM log_logbooks WHERE log_id = ?1 ORDER BY position",
            &self.id,
        )?;
        let tags = string_list(
            conn,
            "SELECT tag FROM log_tags WHERE log_id = ?1 ORDER BY position",
            &self.id,
        )?;
        Ok(LogRecord {
            logged_at: parse_timestamp("logged_at", &self.logged_at)?,
            event_at: self
                .event_at
                .as_deref()
                .map(|v| parse_timestamp("event_at", v))
                .transpose()?,
            id: self.id,
            logbooks,
            title: self.title,
            text: self.text,
            note: self.note,
            tags,
            first_name: self.first_name,
            last_name: self.last_name,
            user_name: self.user_name,
            origin_id: self.origin_id,
        })
    }
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptValue {
            column: column.into(),
            value: value.into(),
            detail: e.to_string(),
        })
}

fn string_list(conn: &Connection, sql: &str, key: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map(params![key], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(values)
}

fn query_logs(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<LogRecord>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, LogRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|row| row.into_record(conn)).collect()
}

/// Keep the first occurrence of each name.
fn dedup_preserving_order(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

impl EntryImportPersistence for Database {
    /// Insert the entry and grant every reader `read` on each of its logbooks,
    /// all in one transaction. Existing grants are left untouched.
    fn create(&self, command: &ImportCommand) -> Result<LogRecord, DatabaseError> {
        let entry = &command.entry;
        let now = Utc::now();
        let record = LogRecord {
            id: Uuid::new_v4().to_string(),
            logbooks: dedup_preserving_order(&entry.logbooks),
            title: entry.title.clone(),
            text: entry.text.clone(),
            note: entry.note.clone(),
            tags: entry.tags.clone(),
            first_name: entry.first_name.clone(),
            last_name: entry.last_name.clone(),
            user_name: entry.user_name.clone(),
            logged_at: entry.logged_at.unwrap_or(now),
            event_at: entry.event_at,
            origin_id: entry.origin_id.clone(),
        };

        let granted = self.transaction(|conn| {
            if let Some(ref origin_id) = record.origin_id {
                let existing: Option<String> = conn
                    .query_row(
                        "SELECT id FROM logs WHERE origin_id = ?1",
                        params![origin_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if existing.is_some() {
                    return Err(DatabaseError::Duplicate {
                        entity: "log with origin id".into(),
                        id: origin_id.clone(),
                    });
                }
            }

            conn.execute(
                "INSERT INTO logs (id, title, text, note, first_name, last_name, user_name,
                                   logged_at, event_at, origin_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.title,
                    record.text,
                    record.note,
                    record.first_name,
                    record.last_name,
                    record.user_name,
                    record.logged_at.to_rfc3339(),
                    record.event_at.map(|t| t.to_rfc3339()),
                    record.origin_id,
                    now.to_rfc3339(),
                ],
            )?;

            for (position, logbook) in record.logbooks.iter().enumerate() {
                conn.execute(
                    "INSERT INTO log_logbooks (log_id, logbook, position) VALUES (?1, ?2, ?3)",
                    params![record.id, logbook, position as i64],
                )?;
            }
            for (position, tag) in record.tags.iter().enumerate() {
                conn.execute(
                    "INSERT INTO log_tags (log_id, tag, position) VALUES (?1, ?2, ?3)",
                    params![record.id, tag, position as i64],
                )?;
            }

            let mut granted = 0usize;
            for logbook in &record.logbooks {
                for user_id in &command.reader_user_ids {
                    granted += grant(conn, logbook, user_id, READ_PERMISSION, &now)?;
                }
            }
            Ok(granted)
        })?;

        info!(
            id = %record.id,
            logbooks = record.logbooks.len(),
            new_grants = granted,
            "stored imported log entry"
        );
        Ok(record)
    }
}

/// Insert a grant unless it already exists. Returns the number of new rows.
fn grant(
    conn: &Connection,
    logbook: &str,
    user_id: &str,
    permission: &str,
    at: &DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO logbook_grants (logbook, user_id, permission, granted_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![logbook, user_id, permission, at.to_rfc3339()],
    )?;
    Ok(inserted)
}

impl Database {
    // -- logs ---------------------------------------------------------------

    /// Fetch one log record by id.
    pub fn get_log(&self, id: &str) -> Result<Option<LogRecord>, DatabaseError> {
        let conn = self.conn();
        let sql = format!("SELECT {LOG_COLUMNS} FROM logs l WHERE l.id = ?1");
        let mut logs = query_logs(&conn, &sql, params![id])?;
        Ok(logs.pop())
    }

    /// Most recent log records, newest first.
    pub fn list_logs(&self, limit: u32) -> Result<Vec<LogRecord>, DatabaseError> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM logs l ORDER BY l.logged_at DESC, l.id LIMIT ?1"
        );
        query_logs(&conn, &sql, params![limit])
    }

    /// Most recent log records filed in `logbook`, newest first.
    pub fn list_logs_in_logbook(
        &self,
        logbook: &str,
        limit: u32,
    ) -> Result<Vec<LogRecord>, DatabaseError> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM logs l
             JOIN log_logbooks lb ON lb.log_id = l.id
             WHERE lb.logbook = ?1
             ORDER BY l.logged_at DESC, l.id LIMIT ?2"
        );
        query_logs(&conn, &sql, params![logbook, limit])
    }

    /// Most recent log records `user_id` may read, newest first.
    pub fn list_readable_logs(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<LogRecord>, DatabaseError> {
        let conn = self.conn();
        let sql = format!(
            "SELECT DISTINCT {LOG_COLUMNS} FROM logs l
             JOIN log_logbooks lb ON lb.log_id = l.id
             JOIN logbook_grants g ON g.logbook = lb.logbook
             WHERE g.user_id = ?1 AND g.permission = ?2
             ORDER BY l.logged_at DESC, l.id LIMIT ?3"
        );
        query_logs(&conn, &sql, params![user_id, READ_PERMISSION, limit])
    }

    // -- grants -------------------------------------------------------------

    /// Grant `user_id` read access on `logbook`. Returns false if it already existed.
    pub fn grant_read(&self, logbook: &str, user_id: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let inserted = grant(&conn, logbook, user_id, READ_PERMISSION, &Utc::now())?;
        debug!(logbook, user_id, inserted, "grant_read");
        Ok(inserted > 0)
    }

    /// User ids holding a read grant on `logbook`, sorted.
    pub fn readers_of(&self, logbook: &str) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id FROM logbook_grants
             WHERE logbook = ?1 AND permission = ?2 ORDER BY user_id",
        )?;
        let readers = stmt
            .query_map(params![logbook, READ_PERMISSION], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(readers)
    }

    /// Whether `user_id` holds a read grant on any of `logbooks`.
    pub fn can_read(&self, user_id: &str, logbooks: &[String]) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT 1 FROM logbook_grants
             WHERE user_id = ?1 AND logbook = ?2 AND permission = ?3 LIMIT 1",
        )?;
        for logbook in logbooks {
            if stmt.exists(params![user_id, logbook, READ_PERMISSION])? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

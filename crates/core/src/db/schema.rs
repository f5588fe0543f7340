//! Database schema definitions and migration runner.
//!
//! Migrations are SQL strings applied in order. The SQLite `user_version`
//! pragma tracks which migrations have already been applied.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::DatabaseError;

/// All migrations, in order. Each entry is `(version, description, sql)`.
static MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "logs and logbook membership",
        r#"
        CREATE TABLE IF NOT EXISTS logs (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            text        TEXT NOT NULL DEFAULT '',
            note        TEXT,
            first_name  TEXT,
            last_name   TEXT,
            user_name   TEXT NOT NULL,
            logged_at   TEXT NOT NULL,
            event_at    TEXT,
            origin_id   TEXT UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_logs_logged_at ON logs (logged_at);

        CREATE TABLE IF NOT EXISTS log_logbooks (
            log_id      TEXT NOT NULL REFERENCES logs (id) ON DELETE CASCADE,
            logbook     TEXT NOT NULL,
            position    INTEGER NOT NULL,
            PRIMARY KEY (log_id, logbook)
        );

        CREATE INDEX IF NOT EXISTS idx_log_logbooks_logbook ON log_logbooks (logbook);

        CREATE TABLE IF NOT EXISTS log_tags (
            log_id      TEXT NOT NULL REFERENCES logs (id) ON DELETE CASCADE,
            tag         TEXT NOT NULL,
            position    INTEGER NOT NULL,
            PRIMARY KEY (log_id, position)
        );
        "#,
    ),
    (
        2,
        "logbook reader grants",
        r#"
        CREATE TABLE IF NOT EXISTS logbook_grants (
            logbook     TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            permission  TEXT NOT NULL CHECK (permission IN ('read', 'write', 'admin')),
            granted_at  TEXT NOT NULL,
            UNIQUE (logbook, user_id, permission)
        );

        CREATE INDEX IF NOT EXISTS idx_logbook_grants_user ON logbook_grants (user_id);
        "#,
    ),
];

/// Run all pending migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;
    info!(
        current_version,
        target_version = MIGRATIONS.last().map(|m| m.0).unwrap_or(0),
        "checking database migrations"
    );

    for &(version, description, sql) in MIGRATIONS {
        if version > current_version {
            info!(version, description, "applying migration");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    detail: e.to_string(),
                })?;
            set_schema_version(conn, version)?;
            debug!(version, "migration applied successfully");
        }
    }

    Ok(())
}

/// Read the current schema version from the SQLite `user_version` pragma.
fn get_schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_idempotently() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };

        for table in ["logs", "log_logbooks", "log_tags", "logbook_grants"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }
}

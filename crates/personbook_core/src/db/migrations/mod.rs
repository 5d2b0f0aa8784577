//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Handle unmigratable version gaps according to `MigrationPolicy`.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A destructive recreate is always logged at `warn` with the gap.

use crate::config::MigrationPolicy;
use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_salary.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the stored version is newer than
///   [`latest_version`] and `policy` is `FailClosed`.
pub fn apply_migrations(conn: &mut Connection, policy: MigrationPolicy) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    let mut from_version = current_version;

    if current_version > latest {
        match policy {
            MigrationPolicy::FailClosed => {
                return Err(DbError::UnsupportedSchemaVersion {
                    db_version: current_version,
                    latest_supported: latest,
                });
            }
            MigrationPolicy::DestructiveRecreate => {
                let dropped_rows = count_rows_if_present(&tx)?;
                warn!(
                    "event=schema_migrate module=db status=destructive from_version={} to_version={} dropped_rows={}",
                    current_version, latest, dropped_rows
                );
                tx.execute_batch("DROP TABLE IF EXISTS persons; PRAGMA user_version = 0;")?;
                from_version = 0;
            }
        }
    }

    for migration in MIGRATIONS {
        if migration.version <= from_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=schema_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Reads `PRAGMA user_version` from an open connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn count_rows_if_present(conn: &Connection) -> DbResult<i64> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'persons');",
        [],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(0);
    }
    let count = conn.query_row("SELECT COUNT(*) FROM persons;", [], |row| row.get(0))?;
    Ok(count)
}

//! Schema migrations for the item store.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per entry.
//! - `PRAGMA user_version` always names the last migration applied.
//! - Pending migrations commit together or not at all.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "items",
        sql: include_str!("0001_items.sql"),
    },
    Migration {
        version: 2,
        name: "labels",
        sql: include_str!("0002_labels.sql"),
    },
];

/// Schema version written by the newest migration this build knows.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Brings the schema on `conn` up to [`latest_version`].
///
/// A store written by a newer build is refused untouched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let to = latest_version();
    if from > to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }
    let pending = &MIGRATIONS[from as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .and_then(|_| tx.pragma_update(None, "user_version", migration.version))
            .map_err(|source| DbError::Migration {
                version: migration.version,
                source,
            })?;
        debug!(
            "event=db_migration module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from={from} to={to}");
    Ok(())
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

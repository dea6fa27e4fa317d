//! Schema steps for the session database.
//!
//! Step 1 creates `kv_store`, the key/value table whose rows hold whole
//! session blobs. New steps are appended with the next level; a step that
//! shipped is never edited.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(level, sql)` pairs in ascending level order.
const SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_kv_store.sql"))];

/// Highest schema level this build can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(level, _)| *level)
}

/// Brings `conn` up to `latest_version()` inside one transaction.
///
/// A database already at the latest level is left untouched; one above it
/// yields `DbError::SchemaTooNew`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<_> = SCHEMA_STEPS
        .iter()
        .filter(|(level, _)| *level > found)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &(level, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", level)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from={} to={}",
        found, supported
    );
    Ok(())
}

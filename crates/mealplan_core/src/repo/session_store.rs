//! Key-value session store contract and SQLite implementation.
//!
//! # Responsibility
//! - Read and write one serialized record per key.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `write` replaces the whole value for a key (last write wins).
//! - Stored values are opaque text; decoding belongs to the service layer.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-level error for session record access.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidKey(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey(key) => write!(f, "invalid store key: `{key}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-record storage boundary for serialized sessions.
pub trait SessionStore {
    /// Returns the stored value, or `None` when the key was never written.
    fn read(&self, key: &str) -> RepoResult<Option<String>>;
    /// Replaces the stored value for `key`.
    fn write(&self, key: &str, value: &str) -> RepoResult<()>;
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn read(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).write(key, value)
    }
}

/// SQLite-backed store over the `kv_store` table.
pub struct SqliteSessionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SessionStore for SqliteSessionStore<'_> {
    fn read(&self, key: &str) -> RepoResult<Option<String>> {
        let key = normalize_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> RepoResult<()> {
        let key = normalize_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

fn normalize_key(key: &str) -> RepoResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{RepoError, SessionStore, SqliteSessionStore};
    use crate::db::open_db_in_memory;

    #[test]
    fn read_missing_key_returns_none() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteSessionStore::new(&conn);
        assert_eq!(store.read("absent").expect("read"), None);
    }

    #[test]
    fn write_replaces_previous_value() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteSessionStore::new(&conn);
        store.write("plan", "{\"v\":1}").expect("first write");
        store.write(" plan ", "{\"v\":2}").expect("second write");
        assert_eq!(store.read("plan").expect("read").as_deref(), Some("{\"v\":2}"));

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv_store;", [], |row| row.get(0))
            .expect("count rows");
        assert_eq!(rows, 1);
    }

    #[test]
    fn blank_key_is_rejected() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteSessionStore::new(&conn);
        let err = store.write("   ", "x").expect_err("blank key must fail");
        assert!(matches!(err, RepoError::InvalidKey(_)));
    }
}

//! Key-value repository contracts and implementations.
//!
//! # Responsibility
//! - Provide put/get/remove of string values in two namespaces.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `Durable` values survive process restarts (SQLite-backed).
//! - `Session` values are cleared whenever a new session begins.
//! - Values are opaque strings; JSON encoding is the caller's concern.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Durable quote collection key.
pub const QUOTES_KEY: &str = "dqg_quotes_v2";
/// Session key holding the last displayed quote.
pub const LAST_VIEWED_KEY: &str = "dqg_last_viewed";
/// Durable key holding the last selected category filter.
pub const LAST_FILTER_KEY: &str = "dqg_last_filter";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for key-value persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidKey(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey(key) => write!(f, "invalid storage key: `{key}`"),
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

/// Storage namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Survives restarts.
    Durable,
    /// Lives for one session only.
    Session,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Durable => "durable",
            Self::Session => "session",
        }
    }
}

/// Repository interface for namespaced string values.
pub trait KvRepository {
    fn get(&self, namespace: Namespace, key: &str) -> RepoResult<Option<String>>;
    fn put(&self, namespace: Namespace, key: &str, value: &str) -> RepoResult<()>;
    /// Returns whether a value was removed.
    fn remove(&self, namespace: Namespace, key: &str) -> RepoResult<bool>;
    /// Drops every value of one namespace, returning the removed count.
    fn clear(&self, namespace: Namespace) -> RepoResult<usize>;
}

/// SQLite-backed repository storing both namespaces in `kv_entries`.
pub struct SqliteKvRepository {
    conn: Connection,
}

impl SqliteKvRepository {
    /// Wraps a migrated connection (see `db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Wraps a connection and clears the previous session namespace.
    pub fn begin_session(conn: Connection) -> RepoResult<Self> {
        let repo = Self::new(conn);
        repo.clear(Namespace::Session)?;
        Ok(repo)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KvRepository for SqliteKvRepository {
    fn get(&self, namespace: Namespace, key: &str) -> RepoResult<Option<String>> {
        let key = normalize_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE namespace = ?1 AND key = ?2;",
                params![namespace.as_str(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, namespace: Namespace, key: &str, value: &str) -> RepoResult<()> {
        let key = normalize_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_entries (namespace, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![namespace.as_str(), key, value, now_epoch_ms()],
        )?;
        Ok(())
    }

    fn remove(&self, namespace: Namespace, key: &str) -> RepoResult<bool> {
        let key = normalize_key(key)?;
        let changed = self.conn.execute(
            "DELETE FROM kv_entries WHERE namespace = ?1 AND key = ?2;",
            params![namespace.as_str(), key],
        )?;
        Ok(changed > 0)
    }

    fn clear(&self, namespace: Namespace) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM kv_entries WHERE namespace = ?1;",
            params![namespace.as_str()],
        )?;
        Ok(changed)
    }
}

/// Process-memory repository; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryKvRepository {
    entries: RefCell<HashMap<(Namespace, String), String>>,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvRepository for MemoryKvRepository {
    fn get(&self, namespace: Namespace, key: &str) -> RepoResult<Option<String>> {
        let key = normalize_key(key)?;
        Ok(self
            .entries
            .borrow()
            .get(&(namespace, key.to_string()))
            .cloned())
    }

    fn put(&self, namespace: Namespace, key: &str, value: &str) -> RepoResult<()> {
        let key = normalize_key(key)?;
        self.entries
            .borrow_mut()
            .insert((namespace, key.to_string()), value.to_string());
        Ok(())
    }

    fn remove(&self, namespace: Namespace, key: &str) -> RepoResult<bool> {
        let key = normalize_key(key)?;
        Ok(self
            .entries
            .borrow_mut()
            .remove(&(namespace, key.to_string()))
            .is_some())
    }

    fn clear(&self, namespace: Namespace) -> RepoResult<usize> {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(ns, _), _| *ns != namespace);
        Ok(before - entries.len())
    }
}

fn normalize_key(key: &str) -> RepoResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

//! Key-value snapshot persistence.
//!
//! # Responsibility
//! - Store the serialized tree and the id counter under fixed keys.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - `put` overwrites any previous value under the same key.
//! - `get` on a missing key returns `Ok(None)`, never an error.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key holding the full tree snapshot (compact JSON).
pub const SNAPSHOT_KEY: &str = "family_tree.snapshot";
/// Key holding the id counter as a decimal string.
pub const ID_COUNTER_KEY: &str = "family_tree.id_counter";

const STORE_TABLE: &str = "kv_store";
const UPSERT_SQL: &str = "INSERT INTO kv_store (store_key, store_value, updated_at)
     VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)
     ON CONFLICT(store_key) DO UPDATE SET
        store_value = excluded.store_value,
        updated_at = excluded.updated_at;";

/// Result type used by snapshot repository operations.
pub type SnapshotRepoResult<T> = Result<T, SnapshotRepoError>;

/// Errors from snapshot repository operations.
#[derive(Debug)]
pub enum SnapshotRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Backend refused the write for a non-SQL reason.
    Unavailable(String),
}

impl Display for SnapshotRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "snapshot store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "snapshot store requires table `{table}`")
            }
            Self::Unavailable(message) => write!(f, "snapshot store unavailable: {message}"),
        }
    }
}

impl Error for SnapshotRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SnapshotRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SnapshotRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for key-value snapshot storage.
pub trait SnapshotRepository {
    /// Loads the value stored under `key`.
    fn get(&self, key: &str) -> SnapshotRepoResult<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> SnapshotRepoResult<()>;
    /// Removes `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> SnapshotRepoResult<()>;

    /// Stores several entries as one unit.
    ///
    /// Transactional backends override this so either every entry lands or
    /// none does. The default writes in order and stops at the first error.
    fn put_all(&self, entries: &[(&str, &str)]) -> SnapshotRepoResult<()> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

/// SQLite-backed snapshot repository.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> SnapshotRepoResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn get(&self, key: &str) -> SnapshotRepoResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT store_value FROM kv_store WHERE store_key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn put(&self, key: &str, value: &str) -> SnapshotRepoResult<()> {
        self.conn.execute(UPSERT_SQL, params![key, value])?;
        Ok(())
    }

    fn put_all(&self, entries: &[(&str, &str)]) -> SnapshotRepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(UPSERT_SQL, params![key, value])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SnapshotRepoResult<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE store_key = ?1;", [key])?;
        Ok(())
    }
}

/// Process-local snapshot repository for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemorySnapshotRepository {
    entries: RefCell<HashMap<String, String>>,
}

impl MemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotRepository for MemorySnapshotRepository {
    fn get(&self, key: &str) -> SnapshotRepoResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> SnapshotRepoResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SnapshotRepoResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn put_all(&self, entries: &[(&str, &str)]) -> SnapshotRepoResult<()> {
        let mut map = self.entries.borrow_mut();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> SnapshotRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(SnapshotRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [STORE_TABLE],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(SnapshotRepoError::MissingRequiredTable(STORE_TABLE));
    }
    Ok(())
}

//! src/services/kv_store.rs
//!
//! KvStore — an ordered, transactional key-value store on top of SQLite.
//! A single `kv` table keyed by raw bytes gives memcmp ordering, so prefix
//! scans walk exactly one entity family. WAL journaling gives readers a
//! stable snapshot while a writer is active.

use serde::{Serialize, de::DeserializeOwned};
use sqlx::{
    Sqlite, SqliteConnection, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{
    ops::{Deref, DerefMut},
    path::Path,
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::debug;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer won the race; the transaction may be retried.
    #[error("write conflict")]
    Conflict,
    #[error("stored key is not valid UTF-8")]
    MalformedKey,
    #[error("stored value under `{key}` is malformed: {source}")]
    MalformedValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_conflict(&err) {
            StoreError::Conflict
        } else {
            StoreError::Sqlx(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Tuning knobs for the embedded engine.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a connection waits on a locked database before giving up.
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 5,
        }
    }
}

/// Process-wide handle to the metadata database.
///
/// Opened once at startup and shared behind an `Arc`; every read and write
/// goes through a [`ReadTxn`] or [`WriteTxn`].
#[derive(Debug)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    /// Open (creating if needed) the database at `database_url` and apply the schema.
    pub async fn open(database_url: &str, options: &StoreOptions) -> StoreResult<Self> {
        let connect = SqliteConnectOptions::from_str(database_url)?;
        Self::connect(connect, options).await
    }

    /// Open a database file by path. Mostly useful for per-test stores.
    pub async fn open_path(path: impl AsRef<Path>, options: &StoreOptions) -> StoreResult<Self> {
        let connect = SqliteConnectOptions::new().filename(path);
        Self::connect(connect, options).await
    }

    async fn connect(connect: SqliteConnectOptions, options: &StoreOptions) -> StoreResult<Self> {
        let connect = connect
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.busy_timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the embedded schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.lines().all(|l| l.trim_start().starts_with("--")))
            .collect::<Vec<_>>();

        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Begin a read-only snapshot transaction.
    pub async fn read(&self) -> StoreResult<ReadTxn> {
        Ok(ReadTxn {
            tx: self.pool.begin().await?,
        })
    }

    /// Begin a write transaction. Nothing is visible to others until
    /// [`WriteTxn::commit`]; dropping it rolls everything back.
    ///
    /// The writer lock is taken up front, so reads inside the transaction
    /// never need a snapshot upgrade and concurrent writers queue on the
    /// busy timeout instead of failing.
    pub async fn write(&self) -> StoreResult<WriteTxn> {
        Ok(WriteTxn {
            inner: ReadTxn {
                tx: self.pool.begin_with("BEGIN IMMEDIATE").await?,
            },
        })
    }

    /// Cheap liveness query used by the readiness probe.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Wait for in-flight connections and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A consistent point-in-time view of the store.
pub struct ReadTxn {
    tx: Transaction<'static, Sqlite>,
}

impl ReadTxn {
    pub async fn get(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        fetch_value(&mut self.tx, key).await
    }

    pub async fn contains(&mut self, key: &str) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM kv WHERE key = ?")
            .bind(key.as_bytes())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(found.is_some())
    }

    /// Fetch and decode a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&mut self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => decode_json(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub async fn scan_prefix(&mut self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let rows: Vec<(Vec<u8>, Vec<u8>)> = match prefix_end(prefix.as_bytes()) {
            Some(end) => {
                sqlx::query_as("SELECT key, value FROM kv WHERE key >= ? AND key < ? ORDER BY key")
                    .bind(prefix.as_bytes())
                    .bind(end)
                    .fetch_all(&mut *self.tx)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT key, value FROM kv WHERE key >= ? ORDER BY key")
                    .bind(prefix.as_bytes())
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };

        rows.into_iter()
            .map(|(key, value)| {
                String::from_utf8(key)
                    .map(|key| (key, value))
                    .map_err(|_| StoreError::MalformedKey)
            })
            .collect()
    }
}

/// An atomic unit of writes. Reads observe the transaction's own earlier writes.
pub struct WriteTxn {
    inner: ReadTxn,
}

impl WriteTxn {
    /// Insert or replace the value under `key`.
    pub async fn put(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key.as_bytes())
        .bind(value)
        .execute(self.conn())
        .await?;
        Ok(())
    }

    pub async fn put_json<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_vec(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.put(key, &raw).await
    }

    /// Remove `key`. Returns whether anything was there.
    pub async fn delete(&mut self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key.as_bytes())
            .execute(self.conn())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every key starting with `prefix`. Returns the number removed.
    pub async fn delete_prefix(&mut self, prefix: &str) -> StoreResult<u64> {
        let result = match prefix_end(prefix.as_bytes()) {
            Some(end) => {
                sqlx::query("DELETE FROM kv WHERE key >= ? AND key < ?")
                    .bind(prefix.as_bytes())
                    .bind(end)
                    .execute(self.conn())
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM kv WHERE key >= ?")
                    .bind(prefix.as_bytes())
                    .execute(self.conn())
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    /// Make every write in this transaction visible at once.
    pub async fn commit(self) -> StoreResult<()> {
        self.inner.tx.commit().await?;
        Ok(())
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.inner.tx
    }
}

impl Deref for WriteTxn {
    type Target = ReadTxn;

    fn deref(&self) -> &ReadTxn {
        &self.inner
    }
}

impl DerefMut for WriteTxn {
    fn deref_mut(&mut self) -> &mut ReadTxn {
        &mut self.inner
    }
}

async fn fetch_value(conn: &mut SqliteConnection, key: &str) -> StoreResult<Option<Vec<u8>>> {
    let value = sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM kv WHERE key = ?")
        .bind(key.as_bytes())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(value)
}

/// Decode a stored JSON document, naming the key on failure.
pub fn decode_json<T: DeserializeOwned>(key: &str, raw: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(raw).map_err(|source| StoreError::MalformedValue {
        key: key.to_string(),
        source,
    })
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// `None` when no such bound exists (empty or all-`0xff` prefix).
fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Return true if the engine reported a busy or locked database.
///
/// SQLite reports these as primary codes 5 (`SQLITE_BUSY`) and 6
/// (`SQLITE_LOCKED`); extended codes carry the primary code in the low byte.
fn is_conflict(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    if let Some(code) = db_err.code().and_then(|c| c.parse::<i32>().ok()) {
        return matches!(code & 0xff, 5 | 6);
    }
    let message = db_err.message().to_ascii_lowercase();
    message.contains("database is locked") || message.contains("database is busy")
}

use crate::config::TableConfig;
use crate::error::BackendError;
use crate::store::traits::{Isolation, SessionRow, SessionStore};
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// SQLite-backed session store.
///
/// Exclusive locking comes from `BEGIN IMMEDIATE`: the transaction
/// takes the database write lock at `begin`, so two cycles contending
/// for the same sid (or any sid — SQLite's lock is per-database, a
/// coarser grain than `SELECT … FOR UPDATE`) serialize right there.
/// A contender waits in the busy handler up to the configured
/// `busy_timeout`, then gets `SQLITE_BUSY` as a [`BackendError`].
///
/// One instance per in-flight request; the connection is never shared
/// across cycles. Dropping the instance closes the connection, which
/// rolls back any transaction left open by an aborted request.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    sql: Arc<Statements>,
}

/// Statements with the configured identifiers spliced in once at
/// construction, after validation.
#[derive(Debug)]
struct Statements {
    lock_for_update: String,
    insert: String,
    upsert: String,
    delete_by_sid: String,
    delete_expired: String,
}

impl Statements {
    fn prepare(table: &TableConfig) -> Self {
        let t = &table.table;
        let sid = &table.sid_column;
        let expiry = &table.expiry_column;
        let data = &table.data_column;
        Self {
            lock_for_update: format!(
                "SELECT \"{expiry}\", \"{data}\" FROM \"{t}\" WHERE \"{sid}\" = ?1"
            ),
            insert: format!(
                "INSERT INTO \"{t}\" (\"{sid}\", \"{expiry}\", \"{data}\") VALUES (?1, ?2, ?3)"
            ),
            upsert: format!(
                "INSERT INTO \"{t}\" (\"{sid}\", \"{expiry}\", \"{data}\") VALUES (?1, ?2, ?3)
                 ON CONFLICT(\"{sid}\") DO UPDATE SET
                    \"{expiry}\" = excluded.\"{expiry}\",
                    \"{data}\"   = excluded.\"{data}\""
            ),
            delete_by_sid: format!("DELETE FROM \"{t}\" WHERE \"{sid}\" = ?1"),
            delete_expired: format!("DELETE FROM \"{t}\" WHERE \"{expiry}\" < ?1"),
        }
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bootstrap the schema.
    pub fn open(path: &Path, table: &TableConfig, busy_timeout_ms: u64) -> anyhow::Result<Self> {
        table.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("failed to open session database")?;

        // WAL keeps unrelated readers unblocked between cycles;
        // busy_timeout is the lock-wait bound that surfaces as
        // SQLITE_BUSY when a contending cycle holds the lock too long.
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             PRAGMA busy_timeout = {busy_timeout_ms};"
        ))?;

        Self::init_schema(&conn, table)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sql: Arc::new(Statements::prepare(table)),
        })
    }

    /// Create the sessions table and its expiry index if missing.
    /// Safe to run on every open.
    fn init_schema(conn: &Connection, table: &TableConfig) -> anyhow::Result<()> {
        let t = &table.table;
        let sid = &table.sid_column;
        let expiry = &table.expiry_column;
        let data = &table.data_column;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{t}\" (
                \"{sid}\"    TEXT PRIMARY KEY,
                \"{expiry}\" INTEGER NOT NULL,
                \"{data}\"   BLOB NOT NULL
             );
             CREATE INDEX IF NOT EXISTS \"idx_{t}_{expiry}\" ON \"{t}\"(\"{expiry}\");"
        ))
        .context("failed to create sessions table")?;
        Ok(())
    }

    /// Run `f` against the connection on a blocking thread.
    async fn blocking<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| BackendError::from(anyhow::anyhow!("session store task failed: {e}")))?
            .map_err(BackendError::from)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn in_transaction(&self) -> bool {
        !self.conn.lock().is_autocommit()
    }

    async fn begin(&self, _isolation: Isolation) -> Result<(), BackendError> {
        // SQLite transactions are serializable no matter which level is
        // asked for, which satisfies the read-committed floor. IMMEDIATE
        // takes the write lock up front so contention blocks here, not
        // at the first write.
        self.blocking(|conn| {
            conn.execute_batch("BEGIN IMMEDIATE")
                .context("failed to begin session transaction")
        })
        .await
    }

    async fn commit(&self) -> Result<(), BackendError> {
        self.blocking(|conn| {
            conn.execute_batch("COMMIT")
                .context("failed to commit session transaction")
        })
        .await
    }

    async fn rollback(&self) -> Result<(), BackendError> {
        self.blocking(|conn| {
            conn.execute_batch("ROLLBACK")
                .context("failed to roll back session transaction")
        })
        .await
    }

    async fn lock_for_update(&self, sid: &str) -> Result<Option<SessionRow>, BackendError> {
        let sql = Arc::clone(&self.sql);
        let sid = sid.to_owned();
        self.blocking(move |conn| {
            conn.query_row(&sql.lock_for_update, params![sid], |row| {
                Ok(SessionRow {
                    expiry: row.get(0)?,
                    data: row.get(1)?,
                })
            })
            .optional()
            .context("failed to lock session row")
        })
        .await
    }

    async fn insert(&self, sid: &str, expiry: i64, data: &[u8]) -> Result<(), BackendError> {
        let sql = Arc::clone(&self.sql);
        let sid = sid.to_owned();
        let data = data.to_vec();
        self.blocking(move |conn| {
            conn.execute(&sql.insert, params![sid, expiry, data])
                .context("failed to insert session row")?;
            Ok(())
        })
        .await
    }

    async fn upsert(&self, sid: &str, expiry: i64, data: &[u8]) -> Result<(), BackendError> {
        let sql = Arc::clone(&self.sql);
        let sid = sid.to_owned();
        let data = data.to_vec();
        self.blocking(move |conn| {
            conn.execute(&sql.upsert, params![sid, expiry, data])
                .context("failed to upsert session row")?;
            Ok(())
        })
        .await
    }

    async fn delete_by_sid(&self, sid: &str) -> Result<usize, BackendError> {
        let sql = Arc::clone(&self.sql);
        let sid = sid.to_owned();
        self.blocking(move |conn| {
            conn.execute(&sql.delete_by_sid, params![sid])
                .context("failed to delete session row")
        })
        .await
    }

    async fn delete_expired_before(&self, now: i64) -> Result<usize, BackendError> {
        let sql = Arc::clone(&self.sql);
        self.blocking(move |conn| {
            conn.execute(&sql.delete_expired, params![now])
                .context("failed to delete expired sessions")
        })
        .await
    }

    async fn health_check(&self) -> bool {
        self.blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .context("session store probe failed")
        })
        .await
        .is_ok()
    }
}

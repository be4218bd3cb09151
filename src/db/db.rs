use crate::libs::config::DatabaseConfig;
use crate::libs::data_storage::DataStorage;
use crate::libs::error::StoreResult;
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Handle to the database file.
///
/// `Db` holds no open connection: every [`Db::scope`] opens its own, so
/// scopes may run from several callers at once and SQLite's file locking
/// serializes the writers.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Db {
    pub fn new(config: &DatabaseConfig, storage: &DataStorage) -> StoreResult<Db> {
        let path = config.resolve_path(storage)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        Ok(Db {
            path,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        })
    }

    pub fn open(path: impl Into<PathBuf>) -> Db {
        Db {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh connection with the busy timeout applied.
    pub fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Runs `f` as one unit of work.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back on any
    /// `Err`, which is returned unchanged; SQLite failures arrive as
    /// `StoreError::Storage` through `?`. The connection is closed when the
    /// scope ends, whatever the outcome.
    ///
    /// ```rust,no_run
    /// use empenhos::db::{db::Db, empenhos::Empenhos};
    ///
    /// let db = Db::open("empenhos.db");
    /// let recent = db.scope(|tx| Empenhos::new(tx).list(None))?;
    /// # Ok::<(), empenhos::libs::error::StoreError>(())
    /// ```
    pub fn scope<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let mut conn = self.connect()?;
        // IMMEDIATE takes the write lock up front so two scopes never
        // deadlock upgrading from a read lock.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                msg_debug!(Message::ScopeRolledBack(err.to_string()));
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

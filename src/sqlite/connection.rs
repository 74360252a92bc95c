use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, InterruptHandle};
use tracing::debug;

use crate::driver::DriverConnection;
use crate::error::DriverError;
use crate::isolation::IsolationLevel;

use super::config::SqliteOptions;
use super::error::SqliteDriverError;
use super::transaction::SqliteTransaction;

/// Connection slot shared between the driver and its open transactions.
pub(crate) type SharedSqliteConnection = Arc<Mutex<Option<Connection>>>;

pub(crate) fn lock_shared(
    conn: &SharedSqliteConnection,
) -> Result<MutexGuard<'_, Option<Connection>>, SqliteDriverError> {
    conn.lock().map_err(|_| SqliteDriverError::Poisoned)
}

/// Blocking `rusqlite` connection exposed as a driver.
///
/// `SQLite` has no asynchronous primitives, so every adaptive operation on this driver takes the
/// fallback path.
pub struct SqliteDriver {
    opts: SqliteOptions,
    conn: SharedSqliteConnection,
    interrupt: Mutex<Option<InterruptHandle>>,
}

impl SqliteDriver {
    #[must_use]
    pub fn new(opts: SqliteOptions) -> Self {
        Self {
            opts,
            conn: Arc::new(Mutex::new(None)),
            interrupt: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.opts
    }

    /// Whether the underlying `rusqlite` connection is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        lock_shared(&self.conn).is_ok_and(|guard| guard.is_some())
    }

    /// Run synchronous work against the open `rusqlite` connection.
    ///
    /// This bypasses the adaptive connection entirely; the closure runs on the calling thread.
    ///
    /// # Errors
    /// Returns `SqliteDriverError::NotOpen` if the connection is closed, or the error produced by
    /// `func`.
    pub fn with_connection<F, R>(&self, func: F) -> Result<R, SqliteDriverError>
    where
        F: FnOnce(&Connection) -> Result<R, rusqlite::Error>,
    {
        let guard = lock_shared(&self.conn)?;
        let conn = guard.as_ref().ok_or(SqliteDriverError::NotOpen)?;
        Ok(func(conn)?)
    }

    fn open_connection(&self) -> Result<(), SqliteDriverError> {
        let mut guard = lock_shared(&self.conn)?;
        if guard.is_some() {
            return Err(SqliteDriverError::AlreadyOpen);
        }
        let conn = Connection::open(&self.opts.db_path)?;
        if let Some(timeout) = self.opts.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if self.opts.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        *self.lock_interrupt()? = Some(conn.get_interrupt_handle());
        if let Some(sql) = &self.opts.init_sql
            && let Err(err) = conn.execute_batch(sql)
        {
            self.lock_interrupt()?.take();
            return Err(err.into());
        }
        *guard = Some(conn);
        debug!(db_path = %self.opts.db_path, "sqlite connection opened");
        Ok(())
    }

    /// Close the connection if it is open; closing a closed connection is a no-op.
    fn close_connection(&self) -> Result<(), SqliteDriverError> {
        let mut guard = lock_shared(&self.conn)?;
        self.lock_interrupt()?.take();
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, err)| SqliteDriverError::Sqlite(err))?;
            debug!(db_path = %self.opts.db_path, "sqlite connection closed");
        }
        Ok(())
    }

    fn begin(&self, isolation: IsolationLevel) -> Result<SqliteTransaction, SqliteDriverError> {
        let (reported, restore_read_uncommitted) = match isolation {
            IsolationLevel::Unspecified | IsolationLevel::Serializable => {
                (IsolationLevel::Serializable, false)
            }
            IsolationLevel::ReadUncommitted => (IsolationLevel::ReadUncommitted, true),
            other => return Err(SqliteDriverError::UnsupportedIsolation(other)),
        };
        let guard = lock_shared(&self.conn)?;
        let conn = guard.as_ref().ok_or(SqliteDriverError::NotOpen)?;
        if restore_read_uncommitted {
            conn.execute_batch("PRAGMA read_uncommitted = 1;")?;
        }
        if let Err(err) = conn.execute_batch("BEGIN DEFERRED;") {
            // No transaction exists to restore the pragma later.
            if restore_read_uncommitted
                && let Err(reset_err) = conn.execute_batch("PRAGMA read_uncommitted = 0;")
            {
                debug!(error = %reset_err, "failed to reset read_uncommitted after BEGIN failed");
            }
            return Err(err.into());
        }
        Ok(SqliteTransaction::new(
            Arc::clone(&self.conn),
            reported,
            restore_read_uncommitted,
        ))
    }

    fn lock_interrupt(&self) -> Result<MutexGuard<'_, Option<InterruptHandle>>, SqliteDriverError> {
        self.interrupt
            .lock()
            .map_err(|_| SqliteDriverError::Poisoned)
    }
}

impl DriverConnection for SqliteDriver {
    type Transaction = SqliteTransaction;

    fn open(&self) -> Result<(), DriverError> {
        self.open_connection()
            .map_err(SqliteDriverError::into_driver_error)
    }

    fn close(&self) -> Result<(), DriverError> {
        self.close_connection()
            .map_err(SqliteDriverError::into_driver_error)
    }

    fn begin_transaction(&self) -> Result<SqliteTransaction, DriverError> {
        self.begin(IsolationLevel::Unspecified)
            .map_err(SqliteDriverError::into_driver_error)
    }

    fn begin_transaction_with_isolation(
        &self,
        isolation: IsolationLevel,
    ) -> Result<SqliteTransaction, DriverError> {
        self.begin(isolation)
            .map_err(SqliteDriverError::into_driver_error)
    }

    fn dispose(&self) -> Result<(), DriverError> {
        self.close_connection()
            .map_err(SqliteDriverError::into_driver_error)
    }

    fn interrupt(&self) {
        if let Ok(guard) = self.interrupt.lock()
            && let Some(handle) = guard.as_ref()
        {
            handle.interrupt();
        }
    }
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("opts", &self.opts)
            .field("open", &self.is_open())
            .finish()
    }
}

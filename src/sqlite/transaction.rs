use std::thread;
use std::time::Duration;

use crate::driver::DriverTransaction;
use crate::error::DriverError;
use crate::isolation::IsolationLevel;

use super::connection::{SharedSqliteConnection, lock_shared};
use super::error::SqliteDriverError;

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

/// Blocking `SQLite` transaction on a shared driver connection.
pub struct SqliteTransaction {
    conn: SharedSqliteConnection,
    isolation: IsolationLevel,
    restore_read_uncommitted: bool,
}

impl SqliteTransaction {
    pub(crate) fn new(
        conn: SharedSqliteConnection,
        isolation: IsolationLevel,
        restore_read_uncommitted: bool,
    ) -> Self {
        Self {
            conn,
            isolation,
            restore_read_uncommitted,
        }
    }

    fn run(&self, sql: &str) -> Result<(), SqliteDriverError> {
        let guard = lock_shared(&self.conn)?;
        let conn = guard.as_ref().ok_or(SqliteDriverError::NotOpen)?;
        conn.execute_batch(sql)?;
        if self.restore_read_uncommitted {
            conn.execute_batch("PRAGMA read_uncommitted = 0;")?;
        }
        Ok(())
    }

    fn rollback_with_busy_retries(&self) -> Result<(), SqliteDriverError> {
        for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
            match self.run("ROLLBACK;") {
                Err(SqliteDriverError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                    if err.code == rusqlite::ErrorCode::DatabaseBusy
                        && idx + 1 < ROLLBACK_BUSY_RETRIES.len() =>
                {
                    thread::sleep(delay);
                }
                result => return result,
            }
        }
        self.run("ROLLBACK;")
    }
}

impl DriverTransaction for SqliteTransaction {
    fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        Ok(self.run("COMMIT;")?)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        Ok(self.rollback_with_busy_retries()?)
    }
}

impl std::fmt::Debug for SqliteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("isolation", &self.isolation)
            .finish_non_exhaustive()
    }
}

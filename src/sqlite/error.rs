use thiserror::Error;

use crate::error::{DriverError, OperationCancelled};
use crate::isolation::IsolationLevel;

#[derive(Debug, Error)]
pub enum SqliteDriverError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("SQLite connection is not open")]
    NotOpen,

    #[error("SQLite connection is already open")]
    AlreadyOpen,

    #[error("SQLite does not support isolation level {0}")]
    UnsupportedIsolation(IsolationLevel),

    #[error("SQLite connection lock poisoned")]
    Poisoned,
}

impl SqliteDriverError {
    /// Whether `SQLite` stopped the statement because the connection was interrupted.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            SqliteDriverError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::OperationInterrupted
        )
    }

    /// Box for the driver boundary; an interrupted statement is reported as a cancellation.
    pub(crate) fn into_driver_error(self) -> DriverError {
        if self.is_interrupted() {
            Box::new(OperationCancelled)
        } else {
            Box::new(self)
        }
    }
}

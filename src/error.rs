use std::fmt;

use thiserror::Error;

#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteDriverError;

/// Error type produced by driver primitives, passed through to callers untouched.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The driver reported a failure; the original error is kept as the source.
    #[error("Connection error: {0}")]
    Connection(#[source] DriverError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Connection used after dispose")]
    UseAfterDispose,

    #[error("Transaction already completed")]
    TransactionCompleted,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AdapterError {
    /// Classify an error coming back from a driver call.
    ///
    /// A driver (or native binding) that observed the caller's cancellation reports it with
    /// [`OperationCancelled`]; everything else is a driver failure and is kept as-is.
    #[must_use]
    pub fn from_driver(err: DriverError) -> Self {
        if err.is::<OperationCancelled>() {
            AdapterError::Cancelled
        } else {
            AdapterError::Connection(err)
        }
    }

    /// Borrow the driver error, if this is a `Connection` error.
    #[must_use]
    pub fn driver_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            AdapterError::Connection(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Downcast the driver error to a concrete driver error type.
    #[must_use]
    pub fn downcast_driver<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.driver_error().and_then(|err| err.downcast_ref::<E>())
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AdapterError::Cancelled)
    }

    #[must_use]
    pub fn is_use_after_dispose(&self) -> bool {
        matches!(self, AdapterError::UseAfterDispose)
    }
}

/// Marker error a driver returns when it stopped an operation because cancellation was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCancelled;

impl fmt::Display for OperationCancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation cancelled by driver")
    }
}

impl std::error::Error for OperationCancelled {}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::ConfigError(format!("invalid adapter options: {err}"))
    }
}

#[cfg(feature = "sqlite")]
impl From<SqliteDriverError> for AdapterError {
    fn from(err: SqliteDriverError) -> Self {
        AdapterError::Connection(Box::new(err))
    }
}

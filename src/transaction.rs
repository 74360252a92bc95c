use async_trait::async_trait;
use tracing::trace;

use crate::driver::DriverTransaction;
use crate::error::AdapterError;
use crate::fallback::FallbackExecutor;
use crate::isolation::IsolationLevel;

/// Asynchronous transaction capability.
///
/// Produced by a native binding or by [`SyncTransactionAdapter`]; the caller owns it and is
/// responsible for completing or disposing it.
#[async_trait]
pub trait AsyncTransaction: Send {
    fn isolation_level(&self) -> IsolationLevel;

    /// # Errors
    /// Returns the driver's error, or `TransactionCompleted` if already committed/rolled back.
    async fn commit(&mut self) -> Result<(), AdapterError>;

    /// # Errors
    /// Returns the driver's error, or `TransactionCompleted` if already committed/rolled back.
    async fn rollback(&mut self) -> Result<(), AdapterError>;

    /// Roll back if still active and release the transaction. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns the driver's error if the implicit rollback fails.
    async fn dispose(&mut self) -> Result<(), AdapterError>;
}

/// Async-capable wrapper over a driver's blocking transaction.
pub struct SyncTransactionAdapter<T: DriverTransaction> {
    tx: Option<T>,
    isolation: IsolationLevel,
    executor: FallbackExecutor,
    completed: bool,
}

impl<T: DriverTransaction> SyncTransactionAdapter<T> {
    pub(crate) fn new(tx: T, executor: FallbackExecutor) -> Self {
        let isolation = tx.isolation_level();
        Self {
            tx: Some(tx),
            isolation,
            executor,
            completed: false,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    async fn finish(&mut self, commit: bool) -> Result<(), AdapterError> {
        if self.completed {
            return Err(AdapterError::TransactionCompleted);
        }
        let Some(tx) = self.tx.take() else {
            return Err(AdapterError::TransactionCompleted);
        };
        let (tx, result) = self
            .executor
            .run_owned(tx, move |tx| if commit { tx.commit() } else { tx.rollback() })
            .await;
        // A failed commit leaves the transaction open so the caller can still roll back.
        self.tx = tx;
        if result.is_ok() || self.tx.is_none() {
            self.completed = true;
        }
        trace!(commit, ok = result.is_ok(), "fallback transaction finished");
        result
    }
}

#[async_trait]
impl<T: DriverTransaction> AsyncTransaction for SyncTransactionAdapter<T> {
    fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    async fn commit(&mut self) -> Result<(), AdapterError> {
        self.finish(true).await
    }

    async fn rollback(&mut self) -> Result<(), AdapterError> {
        self.finish(false).await
    }

    async fn dispose(&mut self) -> Result<(), AdapterError> {
        if self.completed {
            self.tx = None;
            return Ok(());
        }
        let result = self.finish(false).await;
        self.completed = true;
        self.tx = None;
        result
    }
}

impl<T: DriverTransaction> Drop for SyncTransactionAdapter<T> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if let Some(mut tx) = self.tx.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn_blocking(move || {
                    let _ = tx.rollback();
                });
            } else {
                let _ = tx.rollback();
            }
        }
    }
}

impl<T: DriverTransaction> std::fmt::Debug for SyncTransactionAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTransactionAdapter")
            .field("isolation", &self.isolation)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

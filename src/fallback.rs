//! Runs blocking driver primitives under the asynchronous contract.

use std::sync::Arc;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::config::FallbackExecution;
use crate::driver::DriverConnection;
use crate::error::{AdapterError, DriverError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FallbackExecutor {
    mode: FallbackExecution,
}

impl FallbackExecutor {
    pub(crate) fn new(mode: FallbackExecution) -> Self {
        Self { mode }
    }

    pub(crate) fn mode(self) -> FallbackExecution {
        self.mode
    }

    /// Run a cancellable driver call.
    ///
    /// Callers check the token before getting here. When offloaded, a token that fires while the
    /// call is in flight interrupts the driver and the call is still awaited. Its outcome is
    /// reported as-is: only a driver that answers with [`OperationCancelled`] turns it into
    /// `Cancelled`.
    ///
    /// [`OperationCancelled`]: crate::error::OperationCancelled
    pub(crate) async fn run<D, R, F>(
        self,
        driver: &Arc<D>,
        cancel: &CancellationToken,
        func: F,
    ) -> Result<R, AdapterError>
    where
        D: DriverConnection,
        F: FnOnce(&D) -> Result<R, DriverError> + Send + 'static,
        R: Send + 'static,
    {
        match self.mode {
            FallbackExecution::Inline => func(driver).map_err(AdapterError::from_driver),
            FallbackExecution::Offload => {
                let worker = Arc::clone(driver);
                let mut handle = tokio::task::spawn_blocking(move || func(&worker));
                tokio::select! {
                    biased;
                    joined = &mut handle => flatten(joined),
                    () = cancel.cancelled() => {
                        trace!("cancellation requested during offloaded call; interrupting driver");
                        driver.interrupt();
                        flatten(handle.await)
                    }
                }
            }
        }
    }

    /// Run a driver call that must always complete (close, dispose).
    pub(crate) async fn run_to_completion<D, R, F>(
        self,
        driver: &Arc<D>,
        func: F,
    ) -> Result<R, AdapterError>
    where
        D: DriverConnection,
        F: FnOnce(&D) -> Result<R, DriverError> + Send + 'static,
        R: Send + 'static,
    {
        match self.mode {
            FallbackExecution::Inline => func(driver).map_err(AdapterError::from_driver),
            FallbackExecution::Offload => {
                let worker = Arc::clone(driver);
                flatten(tokio::task::spawn_blocking(move || func(&worker)).await)
            }
        }
    }

    /// Run a call on an owned value (a driver transaction), handing the value back.
    ///
    /// The value is only lost if the blocking task itself is torn down.
    pub(crate) async fn run_owned<T, R, F>(
        self,
        mut value: T,
        func: F,
    ) -> (Option<T>, Result<R, AdapterError>)
    where
        T: Send + 'static,
        F: FnOnce(&mut T) -> Result<R, DriverError> + Send + 'static,
        R: Send + 'static,
    {
        match self.mode {
            FallbackExecution::Inline => {
                let result = func(&mut value).map_err(AdapterError::from_driver);
                (Some(value), result)
            }
            FallbackExecution::Offload => {
                let joined = tokio::task::spawn_blocking(move || {
                    let result = func(&mut value);
                    (value, result)
                })
                .await;
                match joined {
                    Ok((value, result)) => (Some(value), result.map_err(AdapterError::from_driver)),
                    Err(err) => (None, flatten::<R>(Err(err))),
                }
            }
        }
    }
}

/// Panics inside the blocking call are resumed on the caller. A task torn down by runtime
/// shutdown never ran to an outcome; that is a connection failure, not a caller cancellation.
fn flatten<R>(joined: Result<Result<R, DriverError>, JoinError>) -> Result<R, AdapterError> {
    match joined {
        Ok(result) => result.map_err(AdapterError::from_driver),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(AdapterError::Connection(Box::new(err))),
    }
}

//! Convenient imports for common functionality.
//!
//! This module re-exports the types needed to build and drive an adaptive connection.

pub use crate::bindings::{BindingSet, BoxedTransaction, NativeFuture};
pub use crate::config::{AdapterOptions, FallbackExecution};
pub use crate::connection::{AdaptiveConnection, AsyncConnection, ConnectionState};
pub use crate::driver::{DriverConnection, DriverTransaction};
pub use crate::error::{AdapterError, DriverError, OperationCancelled};
pub use crate::isolation::IsolationLevel;
pub use crate::transaction::AsyncTransaction;
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteDriver, SqliteDriverError, SqliteOptions};

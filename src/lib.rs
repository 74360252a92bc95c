//! Uniform asynchronous connections over database drivers with or without native async support.
//!
//! A driver implements the blocking [`DriverConnection`] primitives and, optionally, advertises
//! native asynchronous operations through [`DriverConnection::native_bindings`]. An
//! [`AdaptiveConnection`] resolves those bindings once per driver type and then serves every
//! open, close, begin-transaction and dispose call through the native path when one exists and
//! through the blocking primitive otherwise, with the same error and cancellation contract.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use adaptive_conn::prelude::*;
//!
//! # async fn demo() -> Result<(), AdapterError> {
//! let driver = Arc::new(SqliteDriver::new(SqliteOptions::in_memory()));
//! let mut conn = AdaptiveConnection::new(Arc::clone(&driver));
//! conn.open(None).await?;
//! let mut tx = conn
//!     .begin_transaction_with_isolation(IsolationLevel::Serializable, None)
//!     .await?;
//! tx.commit().await?;
//! conn.dispose().await?;
//! # Ok(()) }
//! ```

pub mod bindings;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod isolation;
pub mod prelude;
pub mod registry;
pub mod transaction;

mod fallback;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use bindings::{
    BindingSet, BindingSetBuilder, BoxedTransaction, Capabilities, NativeBeginTransaction,
    NativeBeginTransactionWithIsolation, NativeClose, NativeDispose, NativeFuture, NativeOpen,
};
pub use config::{AdapterOptions, AdapterOptionsBuilder, FallbackExecution};
pub use connection::{AdaptiveConnection, AsyncConnection, ConnectionState};
pub use driver::{DriverConnection, DriverTransaction};
pub use error::{AdapterError, DriverError, OperationCancelled};
pub use isolation::IsolationLevel;
pub use registry::CapabilityRegistry;
pub use transaction::{AsyncTransaction, SyncTransactionAdapter};

pub use tokio_util::sync::CancellationToken;

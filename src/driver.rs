//! Synchronous driver primitives.
//!
//! Every driver exposes the blocking operations below. Drivers that also have true asynchronous
//! variants advertise them through [`DriverConnection::native_bindings`]; the adaptive
//! connection uses those and falls back to these methods for everything else.

use crate::bindings::BindingSet;
use crate::error::DriverError;
use crate::isolation::IsolationLevel;

/// Blocking connection surface of a database driver.
///
/// Methods take `&self`: drivers keep their mutable state behind their own synchronization so a
/// connection can be shared with a blocking worker thread.
pub trait DriverConnection: Send + Sync + 'static {
    /// Synchronous transaction produced by `begin_transaction*`.
    type Transaction: DriverTransaction;

    /// Open the connection.
    ///
    /// # Errors
    /// Returns the driver's own error if the connection cannot be opened.
    fn open(&self) -> Result<(), DriverError>;

    /// Close the connection.
    ///
    /// # Errors
    /// Returns the driver's own error if closing fails.
    fn close(&self) -> Result<(), DriverError>;

    /// Begin a transaction at the driver's default isolation level.
    ///
    /// # Errors
    /// Returns the driver's own error if the transaction cannot be started.
    fn begin_transaction(&self) -> Result<Self::Transaction, DriverError>;

    /// Begin a transaction at an explicit isolation level.
    ///
    /// # Errors
    /// Returns the driver's own error if the transaction cannot be started or the level is not
    /// supported.
    fn begin_transaction_with_isolation(
        &self,
        isolation: IsolationLevel,
    ) -> Result<Self::Transaction, DriverError>;

    /// Release every resource held by the connection.
    ///
    /// # Errors
    /// Returns the driver's own error if releasing resources fails.
    fn dispose(&self) -> Result<(), DriverError>;

    /// Ask an in-flight blocking call to stop early. Drivers without an interrupt primitive keep
    /// the default no-op.
    ///
    /// A call that stops because of the interrupt should fail with
    /// [`crate::error::OperationCancelled`]; any other error is reported to the caller unchanged.
    fn interrupt(&self) {}

    /// Native asynchronous operations this driver type provides.
    ///
    /// This is a property of the type, not the instance: it is resolved once per type and cached
    /// by [`crate::registry::CapabilityRegistry`].
    #[must_use]
    fn native_bindings() -> BindingSet<Self>
    where
        Self: Sized,
    {
        BindingSet::empty()
    }
}

/// Blocking transaction surface of a database driver.
pub trait DriverTransaction: Send + 'static {
    fn isolation_level(&self) -> IsolationLevel;

    /// # Errors
    /// Returns the driver's own error if the commit fails.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns the driver's own error if the rollback fails.
    fn rollback(&mut self) -> Result<(), DriverError>;
}

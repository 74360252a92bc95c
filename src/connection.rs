//! The adaptive connection: one asynchronous surface over any [`DriverConnection`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::bindings::{BindingSet, BoxedTransaction, Capabilities};
use crate::config::AdapterOptions;
use crate::driver::DriverConnection;
use crate::error::AdapterError;
use crate::fallback::FallbackExecutor;
use crate::isolation::IsolationLevel;
use crate::registry::CapabilityRegistry;
use crate::transaction::SyncTransactionAdapter;

/// Uniform asynchronous connection capability.
///
/// Cancellable operations take `Option<&CancellationToken>`; `None` means no cancellation can be
/// requested. `close` and `dispose` always run to completion.
#[async_trait]
pub trait AsyncConnection: Send {
    /// # Errors
    /// `Connection` for driver failures, `Cancelled` if the token fired first,
    /// `UseAfterDispose` once disposed.
    async fn open(&mut self, cancel: Option<&CancellationToken>) -> Result<(), AdapterError>;

    /// # Errors
    /// `Connection` for driver failures, `UseAfterDispose` once disposed.
    async fn close(&mut self) -> Result<(), AdapterError>;

    /// # Errors
    /// `Connection` for driver failures, `Cancelled` if the token fired first,
    /// `UseAfterDispose` once disposed.
    async fn begin_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<BoxedTransaction, AdapterError>;

    /// # Errors
    /// `Connection` for driver failures (including unsupported levels), `Cancelled` if the
    /// token fired first, `UseAfterDispose` once disposed.
    async fn begin_transaction_with_isolation(
        &mut self,
        isolation: IsolationLevel,
        cancel: Option<&CancellationToken>,
    ) -> Result<BoxedTransaction, AdapterError>;

    /// Dispose the connection. Repeated calls are no-ops.
    ///
    /// # Errors
    /// `Connection` if the driver fails while disposing; the connection is disposed regardless.
    async fn dispose(&mut self) -> Result<(), AdapterError>;
}

/// Lifecycle of an [`AdaptiveConnection`]. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Constructed,
    Open,
    Closed,
    Disposed,
}

/// Asynchronous façade over a driver connection.
///
/// Each operation uses the driver's native binding when the driver type has one and the
/// driver's blocking primitive otherwise. Which path runs is fixed when the connection is built.
pub struct AdaptiveConnection<D: DriverConnection> {
    driver: Arc<D>,
    bindings: Arc<BindingSet<D>>,
    fallback: FallbackExecutor,
    state: ConnectionState,
}

impl<D: DriverConnection> AdaptiveConnection<D> {
    /// Wrap `driver` with default options, using the bindings cached for `D`.
    #[must_use]
    pub fn new(driver: Arc<D>) -> Self {
        Self::with_options(driver, AdapterOptions::default())
    }

    #[must_use]
    pub fn with_options(driver: Arc<D>, options: AdapterOptions) -> Self {
        let bindings = CapabilityRegistry::global().bindings_for::<D>();
        Self::with_bindings(driver, bindings, options)
    }

    /// Wrap `driver` with bindings resolved elsewhere.
    #[must_use]
    pub fn with_bindings(
        driver: Arc<D>,
        bindings: Arc<BindingSet<D>>,
        options: AdapterOptions,
    ) -> Self {
        debug!(
            driver = std::any::type_name::<D>(),
            native = %bindings.capabilities(),
            fallback = ?options.fallback,
            "adaptive connection constructed"
        );
        Self {
            driver,
            bindings,
            fallback: FallbackExecutor::new(options.fallback),
            state: ConnectionState::Constructed,
        }
    }

    /// The wrapped driver connection.
    #[must_use]
    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state == ConnectionState::Disposed
    }

    /// Operations served natively for this driver type.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.bindings.capabilities()
    }

    fn ensure_usable(&self) -> Result<(), AdapterError> {
        if self.is_disposed() {
            Err(AdapterError::UseAfterDispose)
        } else {
            Ok(())
        }
    }
}

/// Resolve the caller's token and refuse to start if it already fired.
fn entry_token(cancel: Option<&CancellationToken>) -> Result<CancellationToken, AdapterError> {
    let token = cancel.cloned().unwrap_or_else(CancellationToken::new);
    if token.is_cancelled() {
        return Err(AdapterError::Cancelled);
    }
    Ok(token)
}

#[async_trait]
impl<D: DriverConnection> AsyncConnection for AdaptiveConnection<D> {
    async fn open(&mut self, cancel: Option<&CancellationToken>) -> Result<(), AdapterError> {
        self.ensure_usable()?;
        let cancel = entry_token(cancel)?;
        if let Some(native) = self.bindings.open() {
            trace!("open: native");
            native(Arc::clone(&self.driver), cancel)
                .await
                .map_err(AdapterError::from_driver)?;
        } else {
            trace!("open: fallback");
            self.fallback
                .run(&self.driver, &cancel, |driver| driver.open())
                .await?;
        }
        self.state = ConnectionState::Open;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        self.ensure_usable()?;
        if let Some(native) = self.bindings.close() {
            trace!("close: native");
            native(Arc::clone(&self.driver))
                .await
                .map_err(AdapterError::from_driver)?;
        } else {
            trace!("close: fallback");
            self.fallback
                .run_to_completion(&self.driver, |driver| driver.close())
                .await?;
        }
        self.state = ConnectionState::Closed;
        Ok(())
    }

    async fn begin_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<BoxedTransaction, AdapterError> {
        self.ensure_usable()?;
        let cancel = entry_token(cancel)?;
        if let Some(native) = self.bindings.begin_transaction() {
            trace!("begin_transaction: native");
            return native(Arc::clone(&self.driver), cancel)
                .await
                .map_err(AdapterError::from_driver);
        }
        trace!("begin_transaction: fallback");
        let tx = self
            .fallback
            .run(&self.driver, &cancel, |driver| driver.begin_transaction())
            .await?;
        Ok(Box::new(SyncTransactionAdapter::new(tx, self.fallback)))
    }

    async fn begin_transaction_with_isolation(
        &mut self,
        isolation: IsolationLevel,
        cancel: Option<&CancellationToken>,
    ) -> Result<BoxedTransaction, AdapterError> {
        self.ensure_usable()?;
        let cancel = entry_token(cancel)?;
        if let Some(native) = self.bindings.begin_transaction_with_isolation() {
            trace!(%isolation, "begin_transaction_with_isolation: native");
            return native(Arc::clone(&self.driver), isolation, cancel)
                .await
                .map_err(AdapterError::from_driver);
        }
        trace!(%isolation, "begin_transaction_with_isolation: fallback");
        let tx = self
            .fallback
            .run(&self.driver, &cancel, move |driver| {
                driver.begin_transaction_with_isolation(isolation)
            })
            .await?;
        Ok(Box::new(SyncTransactionAdapter::new(tx, self.fallback)))
    }

    async fn dispose(&mut self) -> Result<(), AdapterError> {
        if self.is_disposed() {
            return Ok(());
        }
        // Terminal even if the driver reports a failure below.
        self.state = ConnectionState::Disposed;
        if let Some(native) = self.bindings.dispose() {
            trace!("dispose: native");
            native(Arc::clone(&self.driver))
                .await
                .map_err(AdapterError::from_driver)
        } else {
            trace!("dispose: fallback");
            self.fallback
                .run_to_completion(&self.driver, |driver| driver.dispose())
                .await
        }
    }
}

impl<D: DriverConnection> fmt::Debug for AdaptiveConnection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveConnection")
            .field("driver", &std::any::type_name::<D>())
            .field("native", &self.bindings.capabilities())
            .field("fallback", &self.fallback.mode())
            .field("state", &self.state)
            .finish()
    }
}

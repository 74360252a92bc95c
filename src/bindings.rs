//! Per-driver-type table of native asynchronous operations.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::DriverError;
use crate::isolation::IsolationLevel;
use crate::transaction::AsyncTransaction;

/// Future returned by a native binding.
pub type NativeFuture<T> = Pin<Box<dyn Future<Output = Result<T, DriverError>> + Send + 'static>>;

/// Transaction value handed back to callers regardless of which path produced it.
pub type BoxedTransaction = Box<dyn AsyncTransaction>;

type OpenFn<D> = Arc<dyn Fn(Arc<D>, CancellationToken) -> NativeFuture<()> + Send + Sync>;
type CloseFn<D> = Arc<dyn Fn(Arc<D>) -> NativeFuture<()> + Send + Sync>;
type BeginFn<D> =
    Arc<dyn Fn(Arc<D>, CancellationToken) -> NativeFuture<BoxedTransaction> + Send + Sync>;
type BeginWithIsolationFn<D> = Arc<
    dyn Fn(Arc<D>, IsolationLevel, CancellationToken) -> NativeFuture<BoxedTransaction>
        + Send
        + Sync,
>;
type DisposeFn<D> = Arc<dyn Fn(Arc<D>) -> NativeFuture<()> + Send + Sync>;

/// Native asynchronous open.
pub trait NativeOpen {
    fn open_async(self: Arc<Self>, cancel: CancellationToken) -> NativeFuture<()>;
}

/// Native asynchronous close.
pub trait NativeClose {
    fn close_async(self: Arc<Self>) -> NativeFuture<()>;
}

/// Native asynchronous begin-transaction at the default isolation level.
pub trait NativeBeginTransaction {
    fn begin_transaction_async(
        self: Arc<Self>,
        cancel: CancellationToken,
    ) -> NativeFuture<BoxedTransaction>;
}

/// Native asynchronous begin-transaction at an explicit isolation level.
pub trait NativeBeginTransactionWithIsolation {
    fn begin_transaction_with_isolation_async(
        self: Arc<Self>,
        isolation: IsolationLevel,
        cancel: CancellationToken,
    ) -> NativeFuture<BoxedTransaction>;
}

/// Native asynchronous dispose.
pub trait NativeDispose {
    fn dispose_async(self: Arc<Self>) -> NativeFuture<()>;
}

/// Up to five native bindings for driver type `D`; an empty slot means "use the fallback".
///
/// Built once through [`BindingSetBuilder`] and never mutated afterwards.
pub struct BindingSet<D> {
    open: Option<OpenFn<D>>,
    close: Option<CloseFn<D>>,
    begin_transaction: Option<BeginFn<D>>,
    begin_transaction_with_isolation: Option<BeginWithIsolationFn<D>>,
    dispose: Option<DisposeFn<D>>,
}

impl<D> BindingSet<D> {
    /// No native operations: every call goes through the fallback path.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            open: None,
            close: None,
            begin_transaction: None,
            begin_transaction_with_isolation: None,
            dispose: None,
        }
    }

    #[must_use]
    pub fn builder() -> BindingSetBuilder<D> {
        BindingSetBuilder {
            set: Self::empty(),
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            open: self.open.is_some(),
            close: self.close.is_some(),
            begin_transaction: self.begin_transaction.is_some(),
            begin_transaction_with_isolation: self.begin_transaction_with_isolation.is_some(),
            dispose: self.dispose.is_some(),
        }
    }

    pub(crate) fn open(&self) -> Option<&OpenFn<D>> {
        self.open.as_ref()
    }

    pub(crate) fn close(&self) -> Option<&CloseFn<D>> {
        self.close.as_ref()
    }

    pub(crate) fn begin_transaction(&self) -> Option<&BeginFn<D>> {
        self.begin_transaction.as_ref()
    }

    pub(crate) fn begin_transaction_with_isolation(&self) -> Option<&BeginWithIsolationFn<D>> {
        self.begin_transaction_with_isolation.as_ref()
    }

    pub(crate) fn dispose(&self) -> Option<&DisposeFn<D>> {
        self.dispose.as_ref()
    }
}

impl<D> Clone for BindingSet<D> {
    fn clone(&self) -> Self {
        Self {
            open: self.open.clone(),
            close: self.close.clone(),
            begin_transaction: self.begin_transaction.clone(),
            begin_transaction_with_isolation: self.begin_transaction_with_isolation.clone(),
            dispose: self.dispose.clone(),
        }
    }
}

impl<D> Default for BindingSet<D> {
    fn default() -> Self {
        Self::empty()
    }
}

// Bindings are closures; show which slots are filled instead.
impl<D> fmt::Debug for BindingSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BindingSet")
            .field(&self.capabilities())
            .finish()
    }
}

/// Fluent builder for [`BindingSet`].
///
/// Each slot can be filled from a closure or, when the driver implements the matching
/// capability trait, with the `native_*` shortcut.
pub struct BindingSetBuilder<D> {
    set: BindingSet<D>,
}

impl<D: Send + Sync + 'static> BindingSetBuilder<D> {
    #[must_use]
    pub fn open<F>(mut self, binding: F) -> Self
    where
        F: Fn(Arc<D>, CancellationToken) -> NativeFuture<()> + Send + Sync + 'static,
    {
        self.set.open = Some(Arc::new(binding));
        self
    }

    #[must_use]
    pub fn close<F>(mut self, binding: F) -> Self
    where
        F: Fn(Arc<D>) -> NativeFuture<()> + Send + Sync + 'static,
    {
        self.set.close = Some(Arc::new(binding));
        self
    }

    #[must_use]
    pub fn begin_transaction<F>(mut self, binding: F) -> Self
    where
        F: Fn(Arc<D>, CancellationToken) -> NativeFuture<BoxedTransaction> + Send + Sync + 'static,
    {
        self.set.begin_transaction = Some(Arc::new(binding));
        self
    }

    #[must_use]
    pub fn begin_transaction_with_isolation<F>(mut self, binding: F) -> Self
    where
        F: Fn(Arc<D>, IsolationLevel, CancellationToken) -> NativeFuture<BoxedTransaction>
            + Send
            + Sync
            + 'static,
    {
        self.set.begin_transaction_with_isolation = Some(Arc::new(binding));
        self
    }

    #[must_use]
    pub fn dispose<F>(mut self, binding: F) -> Self
    where
        F: Fn(Arc<D>) -> NativeFuture<()> + Send + Sync + 'static,
    {
        self.set.dispose = Some(Arc::new(binding));
        self
    }

    #[must_use]
    pub fn native_open(self) -> Self
    where
        D: NativeOpen,
    {
        self.open(<D as NativeOpen>::open_async)
    }

    #[must_use]
    pub fn native_close(self) -> Self
    where
        D: NativeClose,
    {
        self.close(<D as NativeClose>::close_async)
    }

    #[must_use]
    pub fn native_begin_transaction(self) -> Self
    where
        D: NativeBeginTransaction,
    {
        self.begin_transaction(<D as NativeBeginTransaction>::begin_transaction_async)
    }

    #[must_use]
    pub fn native_begin_transaction_with_isolation(self) -> Self
    where
        D: NativeBeginTransactionWithIsolation,
    {
        self.begin_transaction_with_isolation(
            <D as NativeBeginTransactionWithIsolation>::begin_transaction_with_isolation_async,
        )
    }

    #[must_use]
    pub fn native_dispose(self) -> Self
    where
        D: NativeDispose,
    {
        self.dispose(<D as NativeDispose>::dispose_async)
    }

    #[must_use]
    pub fn build(self) -> BindingSet<D> {
        self.set
    }
}

/// Which operations a driver type implements natively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub open: bool,
    pub close: bool,
    pub begin_transaction: bool,
    pub begin_transaction_with_isolation: bool,
    pub dispose: bool,
}

impl Capabilities {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Capabilities::default()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.open, "open"),
            (self.close, "close"),
            (self.begin_transaction, "begin_transaction"),
            (
                self.begin_transaction_with_isolation,
                "begin_transaction_with_isolation",
            ),
            (self.dispose, "dispose"),
        ];
        let present: Vec<&str> = names
            .iter()
            .filter(|(bound, _)| *bound)
            .map(|(_, name)| *name)
            .collect();
        if present.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&present.join(","))
        }
    }
}

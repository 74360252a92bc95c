#![allow(dead_code)]

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use adaptive_conn::prelude::*;
use adaptive_conn::{NativeBeginTransaction, NativeBeginTransactionWithIsolation, NativeClose};
use adaptive_conn::{NativeDispose, NativeOpen};
use async_trait::async_trait;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FakeDriverError {
    #[error("server refused connection")]
    Refused,
    #[error("connection is not open")]
    NotOpen,
}

/// Invocation counters, one per path per operation.
#[derive(Debug, Default)]
pub struct Calls {
    pub sync_open: AtomicUsize,
    pub sync_close: AtomicUsize,
    pub sync_begin: AtomicUsize,
    pub sync_begin_isolation: AtomicUsize,
    pub sync_dispose: AtomicUsize,
    pub native_open: AtomicUsize,
    pub native_close: AtomicUsize,
    pub native_begin: AtomicUsize,
    pub native_begin_isolation: AtomicUsize,
    pub native_dispose: AtomicUsize,
}

impl Calls {
    pub fn sync_total(&self) -> usize {
        [
            &self.sync_open,
            &self.sync_close,
            &self.sync_begin,
            &self.sync_begin_isolation,
            &self.sync_dispose,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Which native operations a fake driver type advertises.
pub trait Profile: Send + Sync + Sized + 'static {
    fn bindings() -> BindingSet<FakeDriver<Self>>;
}

/// No native operations at all.
pub struct SyncOnly;

/// Native open only.
pub struct NativeOpenOnly;

/// All five operations native.
pub struct FullyNative;

impl Profile for SyncOnly {
    fn bindings() -> BindingSet<FakeDriver<Self>> {
        BindingSet::empty()
    }
}

impl Profile for NativeOpenOnly {
    fn bindings() -> BindingSet<FakeDriver<Self>> {
        BindingSet::builder().native_open().build()
    }
}

impl Profile for FullyNative {
    fn bindings() -> BindingSet<FakeDriver<Self>> {
        BindingSet::builder()
            .native_open()
            .native_close()
            .native_begin_transaction()
            .native_begin_transaction_with_isolation()
            .native_dispose()
            .build()
    }
}

pub struct FakeDriver<P> {
    pub calls: Calls,
    pub open: AtomicBool,
    pub fail_open: AtomicBool,
    pub fail_dispose: AtomicBool,
    /// How long the native open waits before completing.
    pub native_open_delay: Duration,
    /// How long the blocking open takes; it never reacts to `interrupt()`.
    pub sync_open_delay: Duration,
    _profile: PhantomData<P>,
}

impl<P: Profile> FakeDriver<P> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(Duration::ZERO))
    }

    pub fn with_native_open_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(delay))
    }

    fn build(native_open_delay: Duration) -> Self {
        Self {
            calls: Calls::default(),
            open: AtomicBool::new(false),
            fail_open: AtomicBool::new(false),
            fail_dispose: AtomicBool::new(false),
            native_open_delay,
            sync_open_delay: Duration::ZERO,
            _profile: PhantomData,
        }
    }

    pub fn failing_open() -> Arc<Self> {
        let driver = Self::build(Duration::ZERO);
        driver.fail_open.store(true, Ordering::SeqCst);
        Arc::new(driver)
    }

    /// Blocking open that takes `delay` and then fails with `Refused`.
    pub fn slow_failing_open(delay: Duration) -> Arc<Self> {
        let mut driver = Self::build(Duration::ZERO);
        driver.sync_open_delay = delay;
        driver.fail_open.store(true, Ordering::SeqCst);
        Arc::new(driver)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn do_open(&self) -> Result<(), FakeDriverError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(FakeDriverError::Refused);
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn do_begin(&self, isolation: IsolationLevel) -> Result<FakeTx, FakeDriverError> {
        if !self.is_open() {
            return Err(FakeDriverError::NotOpen);
        }
        Ok(FakeTx::new(isolation))
    }

    fn do_dispose(&self) -> Result<(), FakeDriverError> {
        self.open.store(false, Ordering::SeqCst);
        if self.fail_dispose.load(Ordering::SeqCst) {
            return Err(FakeDriverError::Refused);
        }
        Ok(())
    }
}

impl<P: Profile> DriverConnection for FakeDriver<P> {
    type Transaction = FakeTx;

    fn open(&self) -> Result<(), DriverError> {
        self.calls.sync_open.fetch_add(1, Ordering::SeqCst);
        if !self.sync_open_delay.is_zero() {
            std::thread::sleep(self.sync_open_delay);
        }
        Ok(self.do_open()?)
    }

    fn close(&self) -> Result<(), DriverError> {
        self.calls.sync_close.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn begin_transaction(&self) -> Result<FakeTx, DriverError> {
        self.calls.sync_begin.fetch_add(1, Ordering::SeqCst);
        Ok(self.do_begin(IsolationLevel::ReadCommitted)?)
    }

    fn begin_transaction_with_isolation(
        &self,
        isolation: IsolationLevel,
    ) -> Result<FakeTx, DriverError> {
        self.calls.sync_begin_isolation.fetch_add(1, Ordering::SeqCst);
        Ok(self.do_begin(isolation)?)
    }

    fn dispose(&self) -> Result<(), DriverError> {
        self.calls.sync_dispose.fetch_add(1, Ordering::SeqCst);
        Ok(self.do_dispose()?)
    }

    fn native_bindings() -> BindingSet<Self> {
        P::bindings()
    }
}

impl<P: Profile> FakeDriver<P> {
    async fn native_open(self: Arc<Self>, cancel: CancellationToken) -> Result<(), DriverError> {
        self.calls.native_open.fetch_add(1, Ordering::SeqCst);
        if !self.native_open_delay.is_zero() {
            tokio::select! {
                () = cancel.cancelled() => return Err(OperationCancelled.into()),
                () = tokio::time::sleep(self.native_open_delay) => {}
            }
        }
        Ok(self.do_open()?)
    }

    async fn native_begin(
        self: Arc<Self>,
        isolation: Option<IsolationLevel>,
    ) -> Result<BoxedTransaction, DriverError> {
        let counter = if isolation.is_some() {
            &self.calls.native_begin_isolation
        } else {
            &self.calls.native_begin
        };
        counter.fetch_add(1, Ordering::SeqCst);
        let tx = self.do_begin(isolation.unwrap_or(IsolationLevel::ReadCommitted))?;
        Ok(Box::new(NativeFakeTx(tx)) as BoxedTransaction)
    }

    async fn native_close(self: Arc<Self>) -> Result<(), DriverError> {
        self.calls.native_close.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn native_dispose(self: Arc<Self>) -> Result<(), DriverError> {
        self.calls.native_dispose.fetch_add(1, Ordering::SeqCst);
        Ok(self.do_dispose()?)
    }
}

impl<P: Profile> NativeOpen for FakeDriver<P> {
    fn open_async(self: Arc<Self>, cancel: CancellationToken) -> NativeFuture<()> {
        Box::pin(self.native_open(cancel))
    }
}

impl<P: Profile> NativeClose for FakeDriver<P> {
    fn close_async(self: Arc<Self>) -> NativeFuture<()> {
        Box::pin(self.native_close())
    }
}

impl<P: Profile> NativeBeginTransaction for FakeDriver<P> {
    fn begin_transaction_async(
        self: Arc<Self>,
        _cancel: CancellationToken,
    ) -> NativeFuture<BoxedTransaction> {
        Box::pin(self.native_begin(None))
    }
}

impl<P: Profile> NativeBeginTransactionWithIsolation for FakeDriver<P> {
    fn begin_transaction_with_isolation_async(
        self: Arc<Self>,
        isolation: IsolationLevel,
        _cancel: CancellationToken,
    ) -> NativeFuture<BoxedTransaction> {
        Box::pin(self.native_begin(Some(isolation)))
    }
}

impl<P: Profile> NativeDispose for FakeDriver<P> {
    fn dispose_async(self: Arc<Self>) -> NativeFuture<()> {
        Box::pin(self.native_dispose())
    }
}

/// Blocking transaction handed out by the fake driver.
#[derive(Debug)]
pub struct FakeTx {
    isolation: IsolationLevel,
    pub commits: Arc<AtomicUsize>,
    pub rollbacks: Arc<AtomicUsize>,
}

impl FakeTx {
    fn new(isolation: IsolationLevel) -> Self {
        Self {
            isolation,
            commits: Arc::new(AtomicUsize::new(0)),
            rollbacks: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DriverTransaction for FakeTx {
    fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Natively asynchronous transaction over the same fake state.
pub struct NativeFakeTx(FakeTx);

#[async_trait]
impl AsyncTransaction for NativeFakeTx {
    fn isolation_level(&self) -> IsolationLevel {
        self.0.isolation
    }

    async fn commit(&mut self) -> Result<(), AdapterError> {
        self.0.commit().map_err(AdapterError::from_driver)
    }

    async fn rollback(&mut self) -> Result<(), AdapterError> {
        self.0.rollback().map_err(AdapterError::from_driver)
    }

    async fn dispose(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}

//! The connection pool: borrow, return, resize, reconfigure and shutdown

use crate::available::AvailableSet;
use crate::config::PoolConfig;
use crate::connection::{Connection, ConnectionFactory};
use crate::errors::{ConnectionError, PoolError, PoolResult};
use crate::eviction::EvictionScheduler;
use crate::handle::PooledConnection;
use crate::holder::ConnectionHolder;
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::processor;
use crate::semaphore::ResizeableSemaphore;

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_POOL_NAME: &str = "ConnectionPool";

/// A bounded, resizable pool of database connections.
///
/// Cloning is cheap and every clone refers to the same pool. Call
/// [`init`](Self::init) to start periodic idle eviction and
/// [`shutdown`](Self::shutdown) to drain the pool; the embedding application
/// owns both ends of that lifecycle.
pub struct ConnectionPool<C: Connection> {
    pub(crate) inner: Arc<PoolInner<C>>,
}

impl<C: Connection> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection> fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("name", &self.inner.name)
            .field("size", &self.inner.sem.size())
            .field("available_permits", &self.inner.sem.available_permits())
            .field("idle", &self.inner.available.len())
            .finish()
    }
}

impl<C: Connection> ConnectionPool<C> {
    /// Create a pool named `"ConnectionPool"` with an unfair semaphore
    pub fn new<F>(factory: F, config: PoolConfig) -> PoolResult<Self>
    where
        F: ConnectionFactory<Connection = C>,
    {
        Self::builder(factory).config(config).build()
    }

    /// Instantiate a builder for a new pool
    pub fn builder<F>(factory: F) -> PoolBuilder<C>
    where
        F: ConnectionFactory<Connection = C>,
    {
        PoolBuilder {
            factory: Box::new(factory),
            config: PoolConfig::default(),
            name: DEFAULT_POOL_NAME.to_string(),
            fair: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// A copy of the configuration currently in effect
    pub fn get_configuration(&self) -> PoolConfig {
        (*self.inner.config()).clone()
    }

    /// Start the periodic idle eviction worker.
    ///
    /// Calling it again while running does nothing.
    pub fn init(&self) -> PoolResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if self.inner.is_shut_down() {
            return Err(PoolError::Closed);
        }
        if lifecycle.eviction.is_none() {
            let interval = self.inner.config().eviction_interval;
            lifecycle.eviction = EvictionScheduler::start(Arc::downgrade(&self.inner), interval);
            info!(pool = %self.inner.name, ?interval, "connection pool initialized");
        }
        Ok(())
    }

    /// Borrow a connection, waiting up to the configured connection timeout
    pub fn borrow(&self) -> PoolResult<PooledConnection<C>> {
        let timeout = self.inner.config().connection_timeout;
        self.borrow_timeout(timeout)
    }

    /// Borrow a connection, waiting up to `timeout` for capacity
    pub fn borrow_timeout(&self, timeout: Duration) -> PoolResult<PooledConnection<C>> {
        let holder = self.inner.borrow_holder(timeout)?;
        Ok(PooledConnection::new(holder, Arc::clone(&self.inner)))
    }

    /// Borrow a connection from async code.
    ///
    /// The blocking wait runs on tokio's blocking thread pool.
    pub async fn borrow_async(&self) -> PoolResult<PooledConnection<C>> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.borrow())
            .await
            .map_err(|_| PoolError::Interrupted)?
    }

    /// Change the capacity, returning the size actually reached.
    ///
    /// Capacity never shrinks below the number of borrowed connections. The
    /// recorded configuration is updated to the size reached. A shut down pool
    /// keeps its size.
    pub fn resize(&self, new_size: usize) -> usize {
        let _lifecycle = self.inner.lifecycle.lock();
        if self.inner.is_shut_down() {
            return self.inner.sem.size();
        }
        let size = self.inner.sem.resize(new_size);
        let mut config = self.inner.config.write();
        if config.pool_size != size {
            let mut updated = (**config).clone();
            updated.pool_size = size;
            *config = Arc::new(updated);
        }
        size
    }

    /// Swap in a new configuration.
    ///
    /// Restarts the eviction worker under the new interval and resizes the
    /// pool when the size changed. The stored size is whatever the resize
    /// actually reached.
    pub fn reconfigure(&self, new_config: PoolConfig) -> PoolResult<()> {
        new_config.validate()?;
        let mut lifecycle = self.inner.lifecycle.lock();
        let current = self.inner.config();
        if *current == new_config {
            return Ok(());
        }
        if self.inner.is_shut_down() {
            return Err(PoolError::Closed);
        }

        let mut new_config = new_config;
        if let Some(eviction) = lifecycle.eviction.take() {
            eviction.stop();
            lifecycle.eviction =
                EvictionScheduler::start(Arc::downgrade(&self.inner), new_config.eviction_interval);
        }
        if current.pool_size != new_config.pool_size {
            new_config.pool_size = self.inner.sem.resize(new_config.pool_size);
        }
        info!(
            pool = %self.inner.name,
            old_size = current.pool_size,
            new_size = new_config.pool_size,
            "connection pool reconfigured"
        );
        *self.inner.config.write() = Arc::new(new_config);
        Ok(())
    }

    /// Close every connection, waiting up to the shutdown timeout for
    /// borrowed ones to come back.
    ///
    /// Never fails. Connections still borrowed when the timeout expires stay
    /// open; they are closed when their handle is dropped. Later borrows fail
    /// with [`PoolError::Closed`].
    pub fn shutdown(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(eviction) = lifecycle.eviction.take() {
            eviction.stop();
        }
        debug!(pool = %self.inner.name, "connection pool is shutting down");
        self.inner.drain(&self.inner.config());
    }

    /// Run an idle eviction pass after `delay` on a background thread
    pub fn schedule_eviction(&self, delay: Duration) {
        EvictionScheduler::run_once_after(Arc::downgrade(&self.inner), delay);
    }

    /// Run an idle eviction pass now, returning how many connections it closed
    pub fn run_eviction(&self) -> usize {
        self.inner.collect_idle()
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        self.inner.metrics.get_metrics(
            self.inner.sem.size(),
            self.inner.sem.available_permits(),
            self.inner.available.len(),
        )
    }

    /// Number of connections sitting in the pool
    pub fn idle_count(&self) -> usize {
        self.inner.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.available.is_empty()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_shut_down()
    }
}

/// Builder for [`ConnectionPool`]s.
#[must_use = "builder does nothing itself, use `.build()` to build it"]
pub struct PoolBuilder<C: Connection> {
    factory: Box<dyn ConnectionFactory<Connection = C>>,
    config: PoolConfig,
    name: String,
    fair: bool,
}

impl<C: Connection> PoolBuilder<C> {
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Name used in log events
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Serve waiting borrowers in arrival order
    pub fn fair(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    /// Build the pool, rejecting an invalid configuration
    pub fn build(self) -> PoolResult<ConnectionPool<C>> {
        self.config.validate()?;
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                sem: ResizeableSemaphore::new(self.config.pool_size, self.fair),
                name: self.name,
                factory: self.factory,
                available: AvailableSet::new(),
                config: RwLock::new(Arc::new(self.config)),
                lifecycle: Mutex::new(Lifecycle { eviction: None }),
                shut_down: AtomicBool::new(false),
                metrics: MetricsTracker::new(),
            }),
        })
    }
}

/// State guarded by the pool lock, which also serializes eviction runs
pub(crate) struct Lifecycle {
    eviction: Option<EvictionScheduler>,
}

pub(crate) struct PoolInner<C: Connection> {
    pub(crate) name: String,
    factory: Box<dyn ConnectionFactory<Connection = C>>,
    pub(crate) available: AvailableSet<C>,
    pub(crate) sem: ResizeableSemaphore,
    config: RwLock<Arc<PoolConfig>>,
    pub(crate) lifecycle: Mutex<Lifecycle>,
    shut_down: AtomicBool,
    pub(crate) metrics: MetricsTracker,
}

/// Why a single borrow attempt did not produce a usable connection
enum AttemptFailure {
    /// Validation said no; the connection was discarded
    Invalid,
    /// Provisioning defaults could not be applied; the connection was discarded
    Provisioning(ConnectionError),
    /// Ends the borrow immediately
    Fatal(PoolError),
}

impl<C: Connection> PoolInner<C> {
    pub(crate) fn config(&self) -> Arc<PoolConfig> {
        Arc::clone(&self.config.read())
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn borrow_holder(&self, timeout: Duration) -> PoolResult<ConnectionHolder<C>> {
        if self.is_shut_down() {
            return Err(PoolError::Closed);
        }
        let config = self.config();
        if !self.sem.acquire_for(timeout) {
            self.metrics.increment_timeout();
            return Err(PoolError::Timeout(timeout));
        }
        // one permit covers every attempt of this call
        let permit = Permit::new(&self.sem);

        for attempt in 0..=config.acquisition_retries {
            match self.try_provision(&config) {
                Ok(mut holder) => {
                    permit.forget();
                    holder.set_borrowed();
                    self.metrics.increment_borrowed();
                    return Ok(holder);
                }
                Err(AttemptFailure::Invalid) => {
                    debug!(pool = %self.name, attempt, "discarded invalid connection, retrying");
                }
                Err(AttemptFailure::Provisioning(e)) => {
                    debug!(pool = %self.name, attempt, error = %e, "could not apply connection defaults, retrying");
                }
                Err(AttemptFailure::Fatal(e)) => return Err(e),
            }
        }
        Err(PoolError::AcquisitionFailed {
            retries: config.acquisition_retries,
        })
    }

    fn try_provision(&self, config: &PoolConfig) -> Result<ConnectionHolder<C>, AttemptFailure> {
        let mut holder = match self.available.pop() {
            Some(holder) => holder,
            None => {
                let conn = self
                    .factory
                    .create()
                    .map_err(|e| AttemptFailure::Fatal(PoolError::Creation(e)))?;
                self.metrics.increment_created();
                ConnectionHolder::new(conn)
            }
        };

        if config.validate_on_borrow {
            match processor::is_valid(holder.connection_mut(), config.validation_timeout) {
                Ok(true) => {}
                Ok(false) => {
                    self.metrics.increment_validation_failure();
                    self.discard(holder);
                    return Err(AttemptFailure::Invalid);
                }
                Err(e) => {
                    self.available.push(holder);
                    return Err(AttemptFailure::Fatal(e));
                }
            }
        }

        if let Err(e) = processor::apply_defaults(holder.connection_mut(), &config.defaults) {
            self.discard(holder);
            return Err(AttemptFailure::Provisioning(e));
        }
        Ok(holder)
    }

    /// Take back a borrowed connection and release its permit
    pub(crate) fn return_holder(&self, mut holder: ConnectionHolder<C>) {
        // released on every path, unwinding included
        let _permit = Permit::new(&self.sem);
        self.metrics.increment_returned();

        if self.is_shut_down() {
            debug!(pool = %self.name, "connection returned after shutdown, closing it");
            self.discard(holder);
            return;
        }

        let config = self.config();
        let reset_ok = processor::reset(holder.connection_mut());
        let valid = !config.validate_on_return
            || processor::is_valid(holder.connection_mut(), config.validation_timeout)
                .unwrap_or(false);
        if !valid {
            self.metrics.increment_validation_failure();
        }

        if reset_ok && valid {
            holder.set_returned();
            let id = holder.id();
            self.available.push(holder);
            // a shutdown that finished during the reset never saw this holder
            if self.is_shut_down() {
                if let Some(holder) = self.available.remove(id) {
                    debug!(pool = %self.name, "connection returned during shutdown, closing it");
                    self.discard(holder);
                }
            }
        } else {
            debug!(pool = %self.name, "the returned connection was invalid so it will be discarded");
            self.discard(holder);
        }
    }

    pub(crate) fn discard(&self, mut holder: ConnectionHolder<C>) {
        processor::discard(holder.connection_mut());
        self.metrics.increment_discarded();
    }

    /// Reclaim every permit, closing the idle connection behind each one.
    /// Acquired permits are never released.
    fn drain(&self, config: &PoolConfig) {
        let mut reclaimed = self.sem.drain_permits();
        for _ in 0..reclaimed {
            if let Some(holder) = self.available.pop() {
                self.discard(holder);
            }
        }

        while reclaimed < config.pool_size {
            if !self.sem.acquire_for(config.shutdown_timeout) {
                warn!(
                    pool = %self.name,
                    outstanding = config.pool_size - reclaimed,
                    timeout = ?config.shutdown_timeout,
                    "shutdown timed out with connections still borrowed"
                );
                break;
            }
            reclaimed += 1;
            if let Some(holder) = self.available.pop() {
                self.discard(holder);
            }
        }

        // returns racing the shutdown flag may have slipped a holder back in
        while let Some(holder) = self.available.pop() {
            self.discard(holder);
        }
        info!(pool = %self.name, reclaimed, size = config.pool_size, "connection pool shut down");
    }
}

/// One semaphore permit, released on drop unless forgotten
pub(crate) struct Permit<'a> {
    sem: &'a ResizeableSemaphore,
    armed: bool,
}

impl<'a> Permit<'a> {
    /// Wrap a permit the caller already acquired
    pub(crate) fn new(sem: &'a ResizeableSemaphore) -> Self {
        Self { sem, armed: true }
    }

    /// Keep the permit held past this guard
    pub(crate) fn forget(mut self) {
        self.armed = false;
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.sem.release();
        }
    }
}

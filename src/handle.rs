//! Borrowed connection handle

use crate::connection::Connection;
use crate::errors::{ConnectionError, PoolError, PoolResult};
use crate::holder::ConnectionHolder;
use crate::pool::PoolInner;

use std::fmt;
use std::sync::Arc;

/// A connection borrowed from a [`ConnectionPool`](crate::ConnectionPool).
///
/// Closing the handle hands the connection back to the pool instead of
/// closing it. `close` is idempotent, and a handle dropped while still open
/// is closed automatically. Once closed, every accessor fails with
/// [`PoolError::ClosedHandle`] since the connection may already belong to
/// another borrower.
#[must_use]
pub struct PooledConnection<C: Connection> {
    holder: Option<ConnectionHolder<C>>,
    pool: Arc<PoolInner<C>>,
}

impl<C: Connection> PooledConnection<C> {
    pub(crate) fn new(holder: ConnectionHolder<C>, pool: Arc<PoolInner<C>>) -> Self {
        Self {
            holder: Some(holder),
            pool,
        }
    }

    /// Return the connection to its pool
    pub fn close(&mut self) {
        if let Some(holder) = self.holder.take() {
            self.pool.return_holder(holder);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.holder.is_none()
    }

    pub fn get(&self) -> PoolResult<&C> {
        self.holder
            .as_ref()
            .map(ConnectionHolder::connection)
            .ok_or(PoolError::ClosedHandle)
    }

    pub fn get_mut(&mut self) -> PoolResult<&mut C> {
        self.holder
            .as_mut()
            .map(ConnectionHolder::connection_mut)
            .ok_or(PoolError::ClosedHandle)
    }

    /// Liveness check of the underlying connection; always `false` once closed
    pub fn is_valid(&mut self, timeout_secs: u64) -> Result<bool, ConnectionError> {
        match self.holder.as_mut() {
            Some(holder) => holder.connection_mut().is_valid(timeout_secs),
            None => Ok(false),
        }
    }

    /// How many times the underlying connection has been borrowed
    pub fn times_borrowed(&self) -> PoolResult<u64> {
        self.holder
            .as_ref()
            .map(ConnectionHolder::times_borrowed)
            .ok_or(PoolError::ClosedHandle)
    }
}

impl<C: Connection> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connection> fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("pool", &self.pool.name)
            .field("connection", &self.holder.as_ref().map(ConnectionHolder::connection))
            .finish()
    }
}

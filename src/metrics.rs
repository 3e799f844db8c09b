//! Pool counters and status snapshots

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time view of a pool
///
/// # Examples
///
/// ```
/// use esox_connpool::{ConnectionError, ConnectionPool, PoolConfig, TxIsolation};
///
/// #[derive(Debug)]
/// struct Noop;
///
/// impl esox_connpool::Connection for Noop {
///     fn is_valid(&mut self, _: u64) -> Result<bool, ConnectionError> { Ok(true) }
///     fn clear_warnings(&mut self) -> Result<(), ConnectionError> { Ok(()) }
///     fn auto_commit(&mut self) -> Result<bool, ConnectionError> { Ok(true) }
///     fn rollback(&mut self) -> Result<(), ConnectionError> { Ok(()) }
///     fn set_auto_commit(&mut self, _: bool) -> Result<(), ConnectionError> { Ok(()) }
///     fn set_read_only(&mut self, _: bool) -> Result<(), ConnectionError> { Ok(()) }
///     fn set_isolation(&mut self, _: TxIsolation) -> Result<(), ConnectionError> { Ok(()) }
///     fn set_catalog(&mut self, _: &str) -> Result<(), ConnectionError> { Ok(()) }
///     fn close(&mut self) -> Result<(), ConnectionError> { Ok(()) }
/// }
///
/// let pool = ConnectionPool::new(|| Ok::<_, ConnectionError>(Noop), PoolConfig::new().with_pool_size(2))
///     .unwrap();
/// {
///     let _conn = pool.borrow().unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_borrowed, 1);
///     assert_eq!(metrics.borrowed_connections, 1);
/// }
/// assert_eq!(pool.get_metrics().idle_connections, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PoolMetrics {
    /// Successful borrows
    pub total_borrowed: usize,

    /// Connections handed back by callers
    pub total_returned: usize,

    /// Connections obtained from the factory
    pub connections_created: usize,

    /// Connections closed because they were invalid, failed reset or
    /// provisioning, or came back after shutdown
    pub connections_discarded: usize,

    /// Connections closed by idle eviction
    pub connections_evicted: usize,

    /// Validation checks that reported a connection unusable
    pub validation_failures: usize,

    /// Borrows that gave up waiting for a permit
    pub borrow_timeouts: usize,

    /// Current capacity
    pub pool_size: usize,

    /// Permits nobody holds right now
    pub available_permits: usize,

    /// Connections sitting in the pool
    pub idle_connections: usize,

    /// Permits held by borrowers
    pub borrowed_connections: usize,

    /// Borrowed share of capacity (0.0 to 1.0)
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_borrowed".to_string(), self.total_borrowed.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("connections_created".to_string(), self.connections_created.to_string());
        metrics.insert("connections_discarded".to_string(), self.connections_discarded.to_string());
        metrics.insert("connections_evicted".to_string(), self.connections_evicted.to_string());
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("borrow_timeouts".to_string(), self.borrow_timeouts.to_string());
        metrics.insert("pool_size".to_string(), self.pool_size.to_string());
        metrics.insert("available_permits".to_string(), self.available_permits.to_string());
        metrics.insert("idle_connections".to_string(), self.idle_connections.to_string());
        metrics.insert("borrowed_connections".to_string(), self.borrowed_connections.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    borrowed: AtomicUsize,
    returned: AtomicUsize,
    created: AtomicUsize,
    discarded: AtomicUsize,
    evicted: AtomicUsize,
    validation_failures: AtomicUsize,
    timeouts: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_borrowed(&self) {
        self.borrowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_returned(&self) {
        self.returned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, pool_size: usize, available_permits: usize, idle: usize) -> PoolMetrics {
        let borrowed = pool_size.saturating_sub(available_permits);
        let utilization = if pool_size > 0 {
            borrowed as f64 / pool_size as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_borrowed: self.borrowed.load(Ordering::Relaxed),
            total_returned: self.returned.load(Ordering::Relaxed),
            connections_created: self.created.load(Ordering::Relaxed),
            connections_discarded: self.discarded.load(Ordering::Relaxed),
            connections_evicted: self.evicted.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            borrow_timeouts: self.timeouts.load(Ordering::Relaxed),
            pool_size,
            available_permits,
            idle_connections: idle,
            borrowed_connections: borrowed,
            utilization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_derives_borrowed_from_permits() {
        let tracker = MetricsTracker::new();
        tracker.increment_borrowed();
        tracker.increment_borrowed();
        tracker.increment_returned();

        let metrics = tracker.get_metrics(4, 3, 1);
        assert_eq!(metrics.total_borrowed, 2);
        assert_eq!(metrics.total_returned, 1);
        assert_eq!(metrics.borrowed_connections, 1);
        assert!((metrics.utilization - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_pool_has_zero_utilization() {
        let metrics = MetricsTracker::new().get_metrics(0, 0, 0);
        assert_eq!(metrics.utilization, 0.0);
        assert_eq!(metrics.export()["utilization"], "0.00");
    }
}

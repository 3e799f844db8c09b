//! Pool configuration options

use crate::errors::{PoolError, PoolResult};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Transaction isolation level applied to fresh connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TxIsolation {
    /// Leave the driver's isolation level untouched
    #[default]
    Undefined,
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl TxIsolation {
    /// The numeric code JDBC-style drivers use for this level
    pub fn jdbc_value(self) -> i32 {
        match self {
            TxIsolation::Undefined => -3000,
            TxIsolation::None => 0,
            TxIsolation::ReadUncommitted => 1,
            TxIsolation::ReadCommitted => 2,
            TxIsolation::RepeatableRead => 4,
            TxIsolation::Serializable => 8,
        }
    }
}

/// Baseline settings applied to every connection before it is handed out
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionDefaults {
    /// Auto-commit mode, always applied
    pub auto_commit: bool,

    /// Isolation level, skipped when [`TxIsolation::Undefined`]
    pub isolation: TxIsolation,

    /// Read-only flag, skipped when unset
    pub read_only: Option<bool>,

    /// Catalog, skipped when unset
    pub catalog: Option<String>,
}

/// Configuration for connection pool behavior
///
/// Snapshots are immutable once handed to a pool; use
/// [`ConnectionPool::reconfigure`](crate::ConnectionPool::reconfigure) to swap
/// in a new one.
///
/// # Examples
///
/// ```
/// use esox_connpool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_pool_size(8)
///     .with_acquisition_retries(3)
///     .with_connection_timeout(Duration::from_secs(5))
///     .with_idle(1, 4, Duration::from_secs(60));
///
/// assert_eq!(config.pool_size, 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Maximum number of connections that can be borrowed at once
    pub pool_size: usize,

    /// How many extra attempts a borrow makes when a connection is invalid
    /// or cannot be provisioned
    pub acquisition_retries: usize,

    /// How long a borrow blocks waiting for a free permit
    pub connection_timeout: Duration,

    /// How long shutdown waits for borrowed connections to come back
    pub shutdown_timeout: Duration,

    /// Number of idle connections left in the pool after an eviction run
    pub min_idle: usize,

    /// Number of idle connections that triggers an eviction run to act
    pub max_idle: usize,

    /// Time a connection has to sit in the pool before it counts as idle
    pub idle_timeout: Duration,

    /// How often the eviction worker runs
    pub eviction_interval: Duration,

    pub validate_on_borrow: bool,

    pub validate_on_return: bool,

    /// Bound for the driver's liveness check, in whole seconds
    pub validation_timeout: Duration,

    /// Provisioning defaults
    pub defaults: ConnectionDefaults,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 20,
            acquisition_retries: 10,
            connection_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(60),
            min_idle: 1,
            max_idle: 5,
            idle_timeout: Duration::from_secs(5 * 60),
            eviction_interval: Duration::from_secs(10 * 60),
            validate_on_borrow: true,
            validate_on_return: false,
            validation_timeout: Duration::from_secs(5),
            defaults: ConnectionDefaults::default(),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the invariants a pool relies on
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_connpool::PoolConfig;
    ///
    /// let config = PoolConfig::new().with_idle(5, 2, Default::default());
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> PoolResult<()> {
        if self.min_idle > self.max_idle {
            return Err(PoolError::InvalidConfiguration(format!(
                "min_idle ({}) must not exceed max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        if self.eviction_interval.is_zero() {
            return Err(PoolError::InvalidConfiguration(
                "eviction_interval must be greater than zero".to_string(),
            ));
        }
        if self.validation_timeout.subsec_nanos() != 0 {
            return Err(PoolError::InvalidTimeout(self.validation_timeout));
        }
        Ok(())
    }

    /// Set the pool size
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the number of acquisition retries
    pub fn with_acquisition_retries(mut self, retries: usize) -> Self {
        self.acquisition_retries = retries;
        self
    }

    /// Set the borrow timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the idle thresholds and the idle timeout together
    pub fn with_idle(mut self, min_idle: usize, max_idle: usize, idle_timeout: Duration) -> Self {
        self.min_idle = min_idle;
        self.max_idle = max_idle;
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set the eviction interval
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    /// Enable or disable validation on borrow and on return
    pub fn with_validation(mut self, on_borrow: bool, on_return: bool) -> Self {
        self.validate_on_borrow = on_borrow;
        self.validate_on_return = on_return;
        self
    }

    /// Set the validation timeout
    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Set the provisioning defaults
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_connpool::{ConnectionDefaults, PoolConfig, TxIsolation};
    ///
    /// let config = PoolConfig::new().with_defaults(ConnectionDefaults {
    ///     auto_commit: true,
    ///     isolation: TxIsolation::ReadCommitted,
    ///     read_only: Some(false),
    ///     catalog: Some("e-shop".into()),
    /// });
    ///
    /// assert_eq!(config.defaults.isolation, TxIsolation::ReadCommitted);
    /// ```
    pub fn with_defaults(mut self, defaults: ConnectionDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PoolConfig::default();
        assert_eq!(config.pool_size, 20);
        assert_eq!(config.acquisition_retries, 10);
        assert!(config.validate_on_borrow);
        assert!(!config.validate_on_return);
        assert!(!config.defaults.auto_commit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn equality_is_structural() {
        let a = PoolConfig::new().with_pool_size(3);
        let b = PoolConfig::new().with_pool_size(3);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_validation(false, false));
    }

    #[test]
    fn fractional_validation_timeout_is_rejected() {
        let config = PoolConfig::new().with_validation_timeout(Duration::from_millis(400));
        assert!(matches!(config.validate(), Err(PoolError::InvalidTimeout(_))));
    }

    #[test]
    fn zero_eviction_interval_is_rejected() {
        let config = PoolConfig::new().with_eviction_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(PoolError::InvalidConfiguration(_))));
    }

    #[test]
    fn isolation_codes() {
        assert_eq!(TxIsolation::Undefined.jdbc_value(), -3000);
        assert_eq!(TxIsolation::ReadCommitted.jdbc_value(), 2);
        assert_eq!(TxIsolation::Serializable.jdbc_value(), 8);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_loads_from_partial_json() {
        let config: PoolConfig =
            serde_json::from_str(r#"{ "pool_size": 4, "validate_on_return": true }"#).unwrap();
        assert_eq!(config.pool_size, 4);
        assert!(config.validate_on_return);
        assert_eq!(config.max_idle, 5);
    }
}

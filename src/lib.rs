//! # EsoxSolutions.ConnectionPool
//!
//! Thread-safe, bounded pool of database connections with a capacity that
//! can be changed while the pool is in use.
//!
//! ## Features
//!
//! - Capacity bounded by a resizable semaphore; shrinking never goes below
//!   the number of borrowed connections
//! - Validation on borrow and on return, with retries on borrow
//! - Provisioning defaults (auto-commit, isolation, read-only, catalog)
//!   applied to every connection handed out
//! - Periodic and on-demand idle eviction that keeps `min_idle` connections
//! - Live reconfiguration and graceful, time-bounded shutdown
//! - Automatic return of connections via RAII (Drop trait)
//! - Async borrow on top of tokio
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_connpool::{Connection, ConnectionError, ConnectionPool, PoolConfig, TxIsolation};
//!
//! #[derive(Debug)]
//! struct Db;
//!
//! impl Connection for Db {
//!     fn is_valid(&mut self, _: u64) -> Result<bool, ConnectionError> { Ok(true) }
//!     fn clear_warnings(&mut self) -> Result<(), ConnectionError> { Ok(()) }
//!     fn auto_commit(&mut self) -> Result<bool, ConnectionError> { Ok(true) }
//!     fn rollback(&mut self) -> Result<(), ConnectionError> { Ok(()) }
//!     fn set_auto_commit(&mut self, _: bool) -> Result<(), ConnectionError> { Ok(()) }
//!     fn set_read_only(&mut self, _: bool) -> Result<(), ConnectionError> { Ok(()) }
//!     fn set_isolation(&mut self, _: TxIsolation) -> Result<(), ConnectionError> { Ok(()) }
//!     fn set_catalog(&mut self, _: &str) -> Result<(), ConnectionError> { Ok(()) }
//!     fn close(&mut self) -> Result<(), ConnectionError> { Ok(()) }
//! }
//!
//! let pool = ConnectionPool::new(|| Ok::<_, ConnectionError>(Db), PoolConfig::new().with_pool_size(4)).unwrap();
//! pool.init().unwrap();
//! {
//!     let conn = pool.borrow().unwrap();
//!     assert!(!conn.is_closed());
//!     // Connection automatically returned when `conn` goes out of scope
//! }
//! assert_eq!(pool.idle_count(), 1);
//! pool.shutdown();
//! ```

mod available;
mod config;
mod connection;
mod errors;
mod eviction;
mod handle;
mod holder;
mod metrics;
mod pool;
mod processor;
mod semaphore;

#[cfg(test)]
mod testing;

pub use config::{ConnectionDefaults, PoolConfig, TxIsolation};
pub use connection::{Connection, ConnectionFactory};
pub use errors::{ConnectionError, PoolError, PoolResult};
pub use handle::PooledConnection;
pub use metrics::PoolMetrics;
pub use pool::{ConnectionPool, PoolBuilder};

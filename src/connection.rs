//! Collaborator contracts: the raw connection and its factory

use crate::config::TxIsolation;
use crate::errors::ConnectionError;
use std::fmt;

/// Capabilities the pool needs from a physical database connection.
///
/// Every method may fail; the pool decides per call whether a failure means
/// "discard and retry", "log and carry on" or "surface to the caller".
pub trait Connection: fmt::Debug + Send + 'static {
    /// Liveness check bounded by `timeout_secs` seconds
    fn is_valid(&mut self, timeout_secs: u64) -> Result<bool, ConnectionError>;

    fn clear_warnings(&mut self) -> Result<(), ConnectionError>;

    fn auto_commit(&mut self) -> Result<bool, ConnectionError>;

    fn rollback(&mut self) -> Result<(), ConnectionError>;

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), ConnectionError>;

    fn set_read_only(&mut self, read_only: bool) -> Result<(), ConnectionError>;

    fn set_isolation(&mut self, isolation: TxIsolation) -> Result<(), ConnectionError>;

    fn set_catalog(&mut self, catalog: &str) -> Result<(), ConnectionError>;

    /// Physically close the connection
    fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Creates new physical connections.
///
/// Implementations must be safe to call from several threads at once.
/// Any `Fn() -> Result<C, ConnectionError>` closure is a factory.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Connection;

    fn create(&self) -> Result<Self::Connection, ConnectionError>;
}

impl<C, F> ConnectionFactory for F
where
    C: Connection,
    F: Fn() -> Result<C, ConnectionError> + Send + Sync + 'static,
{
    type Connection = C;

    fn create(&self) -> Result<C, ConnectionError> {
        self()
    }
}

//! Error types for the connection pool

use std::time::Duration;
use thiserror::Error;

/// Error reported by a [`Connection`](crate::Connection) or a
/// [`ConnectionFactory`](crate::ConnectionFactory).
///
/// Drivers wrap whatever their native failure is into a message; the pool
/// only logs it or hands it back through [`PoolError::Creation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConnectionError {
    message: String,
}

impl ConnectionError {
    /// Create a new connection error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The driver supplied message
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Timeout expired ({0:?}) while waiting to acquire a connection from the pool")]
    Timeout(Duration),

    #[error("Could not acquire a valid connection after {retries} retries")]
    AcquisitionFailed { retries: usize },

    #[error("Could not create a new connection: {0}")]
    Creation(#[source] ConnectionError),

    #[error("Could not execute operation on a closed connection")]
    ClosedHandle,

    #[error("Interrupted while waiting for a connection permit")]
    Interrupted,

    #[error("Pool has been shut down")]
    Closed,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation timeout must be a whole number of seconds, got {0:?}")]
    InvalidTimeout(Duration),
}

pub type PoolResult<T> = Result<T, PoolError>;

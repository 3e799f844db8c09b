//! Connection related processing: validation, reset, provisioning and disposal

use crate::config::{ConnectionDefaults, TxIsolation};
use crate::connection::Connection;
use crate::errors::{ConnectionError, PoolError, PoolResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Apply the provisioning defaults to `conn`.
///
/// Stops at the first failure, so some settings may already be applied when
/// an error comes back.
pub(crate) fn apply_defaults<C: Connection>(
    conn: &mut C,
    defaults: &ConnectionDefaults,
) -> Result<(), ConnectionError> {
    conn.set_auto_commit(defaults.auto_commit)?;
    if let Some(read_only) = defaults.read_only {
        conn.set_read_only(read_only)?;
    }
    if defaults.isolation != TxIsolation::Undefined {
        conn.set_isolation(defaults.isolation)?;
    }
    if let Some(catalog) = &defaults.catalog {
        conn.set_catalog(catalog)?;
    }
    Ok(())
}

/// Ask the driver whether `conn` is usable within `timeout`.
///
/// A failing check counts as invalid. Only a timeout that is not a whole
/// number of seconds is reported as an error.
pub(crate) fn is_valid<C: Connection>(conn: &mut C, timeout: Duration) -> PoolResult<bool> {
    if timeout.subsec_nanos() != 0 {
        return Err(PoolError::InvalidTimeout(timeout));
    }
    match conn.is_valid(timeout.as_secs()) {
        Ok(valid) => Ok(valid),
        Err(e) => {
            debug!(error = %e, ?conn, "validation check failed");
            Ok(false)
        }
    }
}

/// Clear warnings and roll back any open transaction.
///
/// Both steps always run; returns `true` only if both succeed.
pub(crate) fn reset<C: Connection>(conn: &mut C) -> bool {
    let mut reset_ok = true;
    if let Err(e) = conn.clear_warnings() {
        reset_ok = false;
        warn!(error = %e, ?conn, "could not clear the warnings from connection");
    }
    let rolled_back = conn
        .auto_commit()
        .and_then(|auto_commit| if auto_commit { Ok(()) } else { conn.rollback() });
    if let Err(e) = rolled_back {
        reset_ok = false;
        warn!(error = %e, ?conn, "connection had auto-commit off but could not be rolled back");
    }
    reset_ok
}

/// Close `conn`, swallowing any failure
pub(crate) fn discard<C: Connection>(conn: &mut C) {
    if let Err(e) = conn.close() {
        debug!(error = %e, ?conn, "error while closing connection");
    }
}

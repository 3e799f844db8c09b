//! Bookkeeping wrapper around one physical connection

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_HOLDER_ID: AtomicU64 = AtomicU64::new(0);

/// Holds a connection plus the statistics the pool needs for idle handling.
///
/// A holder is owned by exactly one place at a time: the available set while
/// idle, or a [`PooledConnection`](crate::PooledConnection) while borrowed.
pub(crate) struct ConnectionHolder<C> {
    id: u64,
    connection: C,
    created_at: Instant,
    /// `None` while borrowed
    last_returned: Option<Instant>,
    times_borrowed: u64,
}

impl<C> ConnectionHolder<C> {
    pub fn new(connection: C) -> Self {
        let now = Instant::now();
        Self {
            id: NEXT_HOLDER_ID.fetch_add(1, Ordering::Relaxed),
            connection,
            created_at: now,
            last_returned: Some(now),
            times_borrowed: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn times_borrowed(&self) -> u64 {
        self.times_borrowed
    }

    pub fn set_borrowed(&mut self) {
        self.times_borrowed += 1;
        self.last_returned = None;
    }

    pub fn set_returned(&mut self) {
        self.last_returned = Some(Instant::now());
    }

    /// True when the holder sits in the pool and has done so for longer than `timeout`
    pub fn has_idle_connection(&self, timeout: Duration) -> bool {
        self.last_returned
            .is_some_and(|returned| returned.elapsed() > timeout)
    }
}

impl<C: fmt::Debug> fmt::Display for ConnectionHolder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "connection life [{:?}] times used [{}] connection [{:?}]",
            self.created_at.elapsed(),
            self.times_borrowed,
            self.connection
        )
    }
}

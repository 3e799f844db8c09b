//! Concurrent set of idle connections

use crate::holder::ConnectionHolder;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Holders currently idle in the pool, keyed by holder id.
///
/// Insert and remove are safe from any thread without outside locking.
/// Iteration order carries no meaning. Each entry sits behind its own mutex
/// so connections only need to be `Send`.
pub(crate) struct AvailableSet<C> {
    holders: DashMap<u64, Mutex<ConnectionHolder<C>>>,
}

impl<C> AvailableSet<C> {
    pub fn new() -> Self {
        Self {
            holders: DashMap::new(),
        }
    }

    pub fn push(&self, holder: ConnectionHolder<C>) {
        self.holders.insert(holder.id(), Mutex::new(holder));
    }

    /// Take any idle holder out of the set
    pub fn pop(&self) -> Option<ConnectionHolder<C>> {
        loop {
            // the shard guard must be gone before removing
            let id = self.holders.iter().next().map(|entry| *entry.key())?;
            if let Some((_, holder)) = self.holders.remove(&id) {
                return Some(holder.into_inner());
            }
            // another thread took it first
        }
    }

    /// Take a specific holder out of the set, if it is still there
    pub fn remove(&self, id: u64) -> Option<ConnectionHolder<C>> {
        self.holders.remove(&id).map(|(_, holder)| holder.into_inner())
    }

    /// Ids of the holders idle for longer than `timeout`, oldest created first
    pub fn idle_oldest_first(&self, timeout: Duration) -> Vec<u64> {
        let mut idle: Vec<(Instant, u64)> = self
            .holders
            .iter()
            .filter_map(|entry| {
                let holder = entry.value().lock();
                holder
                    .has_idle_connection(timeout)
                    .then(|| (holder.created_at(), *entry.key()))
            })
            .collect();
        idle.sort_unstable();
        idle.into_iter().map(|(_, id)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

impl<C> Default for AvailableSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

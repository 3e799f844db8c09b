//! Idle connection eviction: the mark and sweep pass and its scheduling

use crate::config::PoolConfig;
use crate::connection::Connection;
use crate::pool::{Permit, PoolInner};
use crate::processor;

use crossbeam::channel::{self, Sender};
use std::sync::Weak;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const WORKER_THREAD_NAME: &str = "idle-connections-collector";

impl<C: Connection> PoolInner<C> {
    /// Close idle connections down to `min_idle`, oldest created first.
    ///
    /// Acts only when at least `max_idle` connections are idle. Runs hold
    /// the pool lock, so they never interleave with each other or with
    /// reconfigure and shutdown. Returns how many connections were closed.
    pub(crate) fn collect_idle(&self) -> usize {
        let _lifecycle = self.lifecycle.lock();
        if self.is_shut_down() {
            return 0;
        }
        let started = Instant::now();
        let config = self.config();

        // a fully borrowed pool has nothing worth sweeping
        if !self.sem.try_acquire() {
            debug!(pool = %self.name, "no permit available, skipping idle connection collection");
            return 0;
        }
        let _permit = Permit::new(&self.sem);

        debug!(pool = %self.name, "running idle connection collector");
        let idle = self.available.idle_oldest_first(config.idle_timeout);
        let removed = if idle.len() >= config.max_idle {
            self.sweep(&config, &idle, idle.len() - config.min_idle)
        } else {
            0
        };

        debug!(
            pool = %self.name,
            idle = idle.len(),
            removed,
            elapsed = ?started.elapsed(),
            "idle connection collection finished"
        );
        removed
    }

    fn sweep(&self, config: &PoolConfig, idle: &[u64], to_remove: usize) -> usize {
        let mut removed = 0;
        for &id in idle {
            if removed == to_remove {
                break;
            }
            if self.evict_if_idle(config, id) {
                removed += 1;
            }
        }
        removed
    }

    /// Close a marked holder if it is still in the pool and still idle.
    /// A holder used since the mark goes back untouched.
    pub(crate) fn evict_if_idle(&self, config: &PoolConfig, id: u64) -> bool {
        let Some(mut holder) = self.available.remove(id) else {
            // borrowed since the mark
            return false;
        };
        if !holder.has_idle_connection(config.idle_timeout) {
            self.available.push(holder);
            return false;
        }
        processor::discard(holder.connection_mut());
        self.metrics.increment_evicted();
        debug!(pool = %self.name, connection = %holder, "removed idle connection from pool");
        true
    }
}

/// Background worker running the idle collector at a fixed interval.
///
/// The worker only holds a weak reference to the pool and exits when the
/// pool is dropped or [`stop`](Self::stop) is called.
pub(crate) struct EvictionScheduler {
    stop: Sender<()>,
}

impl EvictionScheduler {
    /// Spawn the periodic worker; `None` if the thread could not be started
    pub fn start<C: Connection>(pool: Weak<PoolInner<C>>, interval: Duration) -> Option<Self> {
        let (stop, stopped) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                loop {
                    channel::select! {
                        recv(stopped) -> _ => break,
                        recv(ticker) -> _ => match pool.upgrade() {
                            Some(pool) => {
                                pool.collect_idle();
                            }
                            None => break,
                        },
                    }
                }
            });

        match spawned {
            Ok(_) => Some(Self { stop }),
            Err(e) => {
                warn!(error = %e, "could not start the idle connection collector");
                None
            }
        }
    }

    /// Run the collector once after `delay` on its own thread
    pub fn run_once_after<C: Connection>(pool: Weak<PoolInner<C>>, delay: Duration) {
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let _ = channel::after(delay).recv();
                if let Some(pool) = pool.upgrade() {
                    pool.collect_idle();
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not schedule an idle connection collection");
        }
    }

    /// Stop the worker without waiting for it.
    ///
    /// Joining is avoided because a run in progress may be blocked on the
    /// pool lock held by the caller.
    pub fn stop(self) {
        drop(self.stop);
    }
}

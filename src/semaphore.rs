//! Counting semaphore whose total number of permits can change at runtime

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Bound for each attempt a shrinking resize makes to reclaim permits
const SHRINK_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(20);

struct State {
    permits: usize,
    size: usize,
    /// Tickets of blocked acquirers, only used in fair mode
    waiters: VecDeque<u64>,
    next_ticket: u64,
}

/// Capacity bounding primitive of the pool.
///
/// `size` is the configured capacity; `permits` is what is currently free.
/// Permits held by callers never exceed `size`, including while a resize is
/// in progress.
pub(crate) struct ResizeableSemaphore {
    state: Mutex<State>,
    cond: Condvar,
    resize_lock: Mutex<()>,
    fair: bool,
}

impl ResizeableSemaphore {
    pub fn new(size: usize, fair: bool) -> Self {
        Self {
            state: Mutex::new(State {
                permits: size,
                size,
                waiters: VecDeque::new(),
                next_ticket: 0,
            }),
            cond: Condvar::new(),
            resize_lock: Mutex::new(()),
            fair,
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    pub fn try_acquire(&self) -> bool {
        self.acquire_many_for(1, Duration::ZERO)
    }

    /// Wait up to `timeout` for one permit
    pub fn acquire_for(&self, timeout: Duration) -> bool {
        self.acquire_many_for(1, timeout)
    }

    /// Wait up to `timeout` for `n` permits, taken all at once or not at all
    pub fn acquire_many_for(&self, n: usize, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if self.can_take(&state, n, None) {
            state.permits -= n;
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        // An unrepresentable deadline means "wait forever"
        let deadline = Instant::now().checked_add(timeout);
        let ticket = if self.fair {
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.waiters.push_back(ticket);
            Some(ticket)
        } else {
            None
        };

        loop {
            let timed_out = match deadline {
                Some(deadline) => self.cond.wait_until(&mut state, deadline).timed_out(),
                None => {
                    self.cond.wait(&mut state);
                    false
                }
            };
            if self.can_take(&state, n, ticket) {
                state.permits -= n;
                if ticket.is_some() {
                    state.waiters.pop_front();
                    // the next in line may be satisfiable as well
                    self.cond.notify_all();
                }
                return true;
            }
            if timed_out {
                if let Some(ticket) = ticket {
                    state.waiters.retain(|t| *t != ticket);
                    self.cond.notify_all();
                }
                return false;
            }
        }
    }

    fn can_take(&self, state: &State, n: usize, ticket: Option<u64>) -> bool {
        if state.permits < n {
            return false;
        }
        if !self.fair {
            return true;
        }
        match ticket {
            None => state.waiters.is_empty(),
            Some(ticket) => state.waiters.front() == Some(&ticket),
        }
    }

    pub fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        self.cond.notify_all();
    }

    /// Take every currently free permit, returning how many were taken
    pub fn drain_permits(&self) -> usize {
        let mut state = self.state.lock();
        std::mem::take(&mut state.permits)
    }

    /// Change the capacity, returning the size actually reached.
    ///
    /// Growing always succeeds. Shrinking only removes permits it can reclaim
    /// within a short bounded wait, so the result may stay above `new_size`
    /// while connections are borrowed.
    pub fn resize(&self, new_size: usize) -> usize {
        let _resizing = self.resize_lock.lock();
        let size = self.size();

        if new_size > size {
            let delta = new_size - size;
            let mut state = self.state.lock();
            state.size += delta;
            state.permits += delta;
            self.cond.notify_all();
        } else if new_size < size {
            let mut reclaimed = size - new_size;
            while reclaimed != 0 && !self.acquire_many_for(reclaimed, SHRINK_ATTEMPT_TIMEOUT) {
                reclaimed -= 1;
            }
            self.state.lock().size -= reclaimed;
        }

        self.size()
    }

    #[cfg(test)]
    fn queued_waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn wait_for_queue(sem: &ResizeableSemaphore, len: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while sem.queued_waiters() != len && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(sem.queued_waiters(), len);
    }

    #[test]
    fn size_equals_available_plus_acquired_permits() {
        let sem = ResizeableSemaphore::new(10, false);
        assert!(sem.try_acquire());
        assert_eq!(sem.available_permits(), 9);
        assert_eq!(sem.size(), 10);
    }

    #[test]
    fn a_semaphore_always_can_grow() {
        let sem = ResizeableSemaphore::new(10, false);
        assert!(sem.try_acquire());
        assert_eq!(sem.resize(20), 20);
        assert_eq!(sem.available_permits(), 19);
    }

    #[test]
    fn a_semaphore_can_shrink() {
        let sem = ResizeableSemaphore::new(10, false);
        assert!(sem.try_acquire());
        assert_eq!(sem.resize(5), 5);
        assert_eq!(sem.available_permits(), 4);
    }

    #[test]
    fn size_cannot_drop_below_acquired_permits() {
        let sem = ResizeableSemaphore::new(4, false);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert_eq!(sem.resize(1), 2);
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn cannot_shrink_when_all_permits_are_acquired() {
        let sem = ResizeableSemaphore::new(2, false);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert_eq!(sem.resize(1), 2);
    }

    #[test]
    fn resizing_to_current_size_does_nothing() {
        let sem = ResizeableSemaphore::new(4, false);
        assert_eq!(sem.resize(4), 4);
        assert_eq!(sem.resize(4), 4);
        assert_eq!(sem.available_permits(), 4);
    }

    #[test]
    fn acquire_times_out_when_exhausted() {
        let sem = ResizeableSemaphore::new(1, false);
        assert!(sem.acquire_for(Duration::from_millis(5)));
        let started = Instant::now();
        assert!(!sem.acquire_for(Duration::from_millis(5)));
        assert!(started.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn release_wakes_a_blocked_acquirer() {
        let sem = Arc::new(ResizeableSemaphore::new(1, false));
        assert!(sem.try_acquire());

        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire_for(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(10));
        sem.release();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn growing_wakes_a_blocked_acquirer() {
        let sem = Arc::new(ResizeableSemaphore::new(0, false));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire_for(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(10));
        assert_eq!(sem.resize(1), 1);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn drain_takes_every_free_permit() {
        let sem = ResizeableSemaphore::new(5, false);
        assert!(sem.try_acquire());
        assert_eq!(sem.drain_permits(), 4);
        assert_eq!(sem.available_permits(), 0);
        assert_eq!(sem.size(), 5);
    }

    #[test]
    fn fair_mode_serves_waiters_in_order() {
        let sem = Arc::new(ResizeableSemaphore::new(2, true));
        assert!(sem.acquire_many_for(2, Duration::ZERO));

        let head = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire_many_for(2, Duration::from_secs(5)))
        };
        wait_for_queue(&sem, 1);

        sem.release();
        // one permit is free, but the queued waiter comes first
        assert!(!sem.try_acquire());
        sem.release();
        assert!(head.join().unwrap());
        wait_for_queue(&sem, 0);
    }

    #[test]
    fn timed_out_fair_waiter_leaves_the_queue() {
        let sem = ResizeableSemaphore::new(1, true);
        assert!(sem.try_acquire());
        assert!(!sem.acquire_for(Duration::from_millis(5)));
        assert_eq!(sem.queued_waiters(), 0);
        sem.release();
        assert!(sem.try_acquire());
    }
}

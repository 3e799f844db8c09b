//! Scripted in-memory connection used by the pool's unit tests

use crate::config::TxIsolation;
use crate::connection::Connection;
use crate::errors::ConnectionError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Shared script and call log for every connection a test factory creates
#[derive(Debug)]
pub(crate) struct Probe {
    pub created: AtomicUsize,
    pub validations: AtomicUsize,
    pub clear_warnings: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub auto_commit_calls: AtomicUsize,
    closed: Mutex<Vec<usize>>,
    /// Answers for upcoming validity checks, `valid` once exhausted
    validity_script: Mutex<VecDeque<bool>>,
    valid: AtomicBool,
    /// Number of upcoming `set_auto_commit` calls that fail
    provisioning_failures: AtomicUsize,
    fail_clear_warnings: AtomicBool,
    /// Milliseconds `clear_warnings` sleeps before answering
    clear_warnings_delay_ms: AtomicU64,
    fail_create: AtomicBool,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created: AtomicUsize::new(0),
            validations: AtomicUsize::new(0),
            clear_warnings: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
            auto_commit_calls: AtomicUsize::new(0),
            closed: Mutex::new(Vec::new()),
            validity_script: Mutex::new(VecDeque::new()),
            valid: AtomicBool::new(true),
            provisioning_failures: AtomicUsize::new(0),
            fail_clear_warnings: AtomicBool::new(false),
            clear_warnings_delay_ms: AtomicU64::new(0),
            fail_create: AtomicBool::new(false),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> Vec<usize> {
        self.closed.lock().clone()
    }

    pub fn always_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    pub fn script_validity(&self, answers: &[bool]) {
        self.validity_script.lock().extend(answers.iter().copied());
    }

    pub fn fail_provisioning(&self, times: usize) {
        self.provisioning_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_clear_warnings(&self, fail: bool) {
        self.fail_clear_warnings.store(fail, Ordering::SeqCst);
    }

    pub fn slow_clear_warnings(&self, delay: Duration) {
        self.clear_warnings_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// A factory handing out connections numbered from 1
    pub fn factory(
        self: &Arc<Self>,
    ) -> impl Fn() -> Result<FakeConnection, ConnectionError> + Send + Sync + 'static {
        let probe = Arc::clone(self);
        move || {
            if probe.fail_create.load(Ordering::SeqCst) {
                return Err(ConnectionError::new("connection refused"));
            }
            let id = probe.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(FakeConnection {
                id,
                auto_commit: true,
                probe: Arc::clone(&probe),
            })
        }
    }
}

#[derive(Debug)]
pub(crate) struct FakeConnection {
    pub id: usize,
    auto_commit: bool,
    probe: Arc<Probe>,
}

impl Connection for FakeConnection {
    fn is_valid(&mut self, _timeout_secs: u64) -> Result<bool, ConnectionError> {
        self.probe.validations.fetch_add(1, Ordering::SeqCst);
        let scripted = self.probe.validity_script.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.probe.valid.load(Ordering::SeqCst)))
    }

    fn clear_warnings(&mut self) -> Result<(), ConnectionError> {
        self.probe.clear_warnings.fetch_add(1, Ordering::SeqCst);
        let delay = self.probe.clear_warnings_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        if self.probe.fail_clear_warnings.load(Ordering::SeqCst) {
            return Err(ConnectionError::new("could not clear warnings"));
        }
        Ok(())
    }

    fn auto_commit(&mut self) -> Result<bool, ConnectionError> {
        Ok(self.auto_commit)
    }

    fn rollback(&mut self) -> Result<(), ConnectionError> {
        self.probe.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), ConnectionError> {
        self.probe.auto_commit_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .probe
            .provisioning_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ConnectionError::new("error setting auto-commit"));
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn set_read_only(&mut self, _read_only: bool) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn set_isolation(&mut self, _isolation: TxIsolation) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn set_catalog(&mut self, _catalog: &str) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        self.probe.closed.lock().push(self.id);
        Ok(())
    }
}

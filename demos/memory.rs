//! In-memory connection shared by the demos

use esox_connpool::{Connection, ConnectionError, TxIsolation};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug)]
pub struct MemoryConnection {
    pub id: usize,
    auto_commit: bool,
    isolation: TxIsolation,
    catalog: Option<String>,
}

impl MemoryConnection {
    pub fn open() -> Result<Self, ConnectionError> {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        println!("   Opening connection #{id}");
        Ok(Self {
            id,
            auto_commit: true,
            isolation: TxIsolation::Undefined,
            catalog: None,
        })
    }

    pub fn describe(&self) -> String {
        format!(
            "#{} (auto_commit={}, isolation={:?}, catalog={:?})",
            self.id, self.auto_commit, self.isolation, self.catalog
        )
    }
}

impl Connection for MemoryConnection {
    fn is_valid(&mut self, _timeout_secs: u64) -> Result<bool, ConnectionError> {
        Ok(true)
    }

    fn clear_warnings(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn auto_commit(&mut self) -> Result<bool, ConnectionError> {
        Ok(self.auto_commit)
    }

    fn rollback(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), ConnectionError> {
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn set_read_only(&mut self, _read_only: bool) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn set_isolation(&mut self, isolation: TxIsolation) -> Result<(), ConnectionError> {
        self.isolation = isolation;
        Ok(())
    }

    fn set_catalog(&mut self, catalog: &str) -> Result<(), ConnectionError> {
        self.catalog = Some(catalog.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        println!("   Closing connection #{}", self.id);
        Ok(())
    }
}

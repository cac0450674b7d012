//! # Account Locks
//!
//! One writer at a time per account. Writers to different accounts never
//! wait on each other; readers take no lock at all.
//!
//! ```text
//! pay(A)  ──► lock(A) ──► load A ──► core op on copy ──► save A ──► unlock(A)
//! pay(A)  ──► lock(A) ··· waits ································► load A ...
//! edit(B) ──► lock(B) ──► load B ──► ...                  (runs in parallel)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Registry of per-account async mutexes.
///
/// An entry lives only while someone holds or waits for it, so ids that
/// never load (unknown, other tenant) leave nothing behind.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    inner: Registry,
}

impl AccountLocks {
    pub fn new() -> Self {
        AccountLocks::default()
    }

    /// Waits for exclusive write access to `account_id`.
    pub async fn acquire(&self, account_id: &str) -> AccountGuard {
        let lock = {
            let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            registry
                .entry(account_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        AccountGuard {
            account_id: account_id.to_string(),
            guard: Some(lock.lock_owned().await),
            registry: self.inner.clone(),
        }
    }

    /// Number of accounts currently locked or waited on.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write access to one account. Released on drop.
#[derive(Debug)]
pub struct AccountGuard {
    account_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        // Registry first: no one can clone the entry while we check it.
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        self.guard.take();
        let idle = registry
            .get(&self.account_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            registry.remove(&self.account_id);
        }
    }
}

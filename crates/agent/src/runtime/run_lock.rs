//! Per-store run lock.
//!
//! Only one run may execute against a history store at a time. A trigger
//! arriving while a run is in flight waits for it (queue depth = 1); a
//! further trigger is rejected with [`Error::RunBusy`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use td_domain::error::{Error, Result};

struct RunSlot {
    sem: Arc<Semaphore>,
    waiting: AtomicUsize,
}

/// Manages run locks keyed by store identity.
pub struct RunLockMap {
    slots: Mutex<HashMap<String, Arc<RunSlot>>>,
}

impl Default for RunLockMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of a run; releases the lock on drop.
pub struct RunPermit {
    _permit: OwnedSemaphorePermit,
}

/// Decrements the waiter count even if the waiting future is dropped.
struct WaiterGuard<'a>(&'a AtomicUsize);

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RunLockMap {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for `store`.
    pub async fn acquire(&self, store: &str) -> Result<RunPermit> {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(store.to_owned())
                .or_insert_with(|| {
                    Arc::new(RunSlot {
                        sem: Arc::new(Semaphore::new(1)),
                        waiting: AtomicUsize::new(0),
                    })
                })
                .clone()
        };

        if let Ok(permit) = slot.sem.clone().try_acquire_owned() {
            return Ok(RunPermit { _permit: permit });
        }

        if slot.waiting.fetch_add(1, Ordering::SeqCst) >= 1 {
            slot.waiting.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::RunBusy { store: store.to_owned() });
        }
        let _waiter = WaiterGuard(&slot.waiting);

        tracing::debug!(store, "run in progress, waiting for the lock");
        let permit = slot
            .sem
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Other("run lock closed".into()))?;
        Ok(RunPermit { _permit: permit })
    }

    /// Number of tracked stores.
    pub fn store_count(&self) -> usize {
        self.slots.lock().len()
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// One mutex per record id, so read-modify-write cycles on the same record
/// run one at a time while different records proceed in parallel.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `id`. The slot is released even
    /// when `f` unwinds.
    pub fn with_lock<R>(&self, id: Uuid, f: impl FnOnce() -> R) -> R {
        let lease = self.lease(id);
        let _guard = lock_ignoring_poison(&lease.slot);
        f()
    }

    fn lease(&self, id: Uuid) -> SlotLease<'_> {
        let mut slots = lock_ignoring_poison(&self.slots);
        let slot = slots.entry(id).or_default().clone();
        SlotLease {
            locks: self,
            id,
            slot,
        }
    }

    pub fn tracked(&self) -> usize {
        lock_ignoring_poison(&self.slots).len()
    }
}

/// Keeps a slot alive while it is locked or waited on. Declared before the
/// mutex guard in `with_lock`, so it drops after the guard.
struct SlotLease<'a> {
    locks: &'a KeyedLocks,
    id: Uuid,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        let mut slots = lock_ignoring_poison(&self.locks.slots);
        // The table and this lease are the only holders: nobody is waiting.
        if slots
            .get(&self.id)
            .is_some_and(|entry| Arc::strong_count(entry) == 2)
        {
            slots.remove(&self.id);
        }
    }
}

// The guarded data is `()`, so a panic in another holder leaves nothing inconsistent.
fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::storage::{Record, Repository};

/// In-process repository. Reads hand out clones, so it behaves like a remote
/// store: a stale snapshot written back overwrites newer data.
#[derive(Debug)]
pub struct MemoryRepository<T> {
    records: RwLock<HashMap<Uuid, T>>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, T>>> {
        self.records
            .read()
            .map_err(|_| LedgerError::persistence(format!("{} store lock poisoned", T::KIND)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, T>>> {
        self.records
            .write()
            .map_err(|_| LedgerError::persistence(format!("{} store lock poisoned", T::KIND)))
    }
}

impl<T: Record> Repository<T> for MemoryRepository<T> {
    fn get(&self, id: Uuid) -> Result<Option<T>> {
        Ok(self.read()?.get(&id).cloned())
    }

    fn save(&self, record: &T) -> Result<()> {
        self.write()?.insert(record.id(), record.clone());
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.write()?.remove(&id).is_some())
    }

    fn list(&self) -> Result<Vec<T>> {
        Ok(self.read()?.values().cloned().collect())
    }
}

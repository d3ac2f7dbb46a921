//! Persistence seam: whole-record repositories and a document store.
//!
//! Repositories read and write complete records; there is no field-level
//! patching. Callers serialize mutations per record id, see
//! [`KeyedLocks`](crate::core::locks::KeyedLocks).

pub mod documents;
pub mod json_backend;
pub mod memory;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::domain::{Document, DocumentUpload, Expense, Identifiable, Project};
use crate::errors::{LedgerError, Result};

pub use documents::LocalDocumentStore;
pub use json_backend::JsonRepository;
pub use memory::MemoryRepository;

/// A record type a repository can hold.
pub trait Record: Identifiable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Directory / table name.
    const COLLECTION: &'static str;
    /// Human label used in `NotFound` errors.
    const KIND: &'static str;
}

impl Record for Expense {
    const COLLECTION: &'static str = "expenses";
    const KIND: &'static str = "Expense";
}

impl Record for Project {
    const COLLECTION: &'static str = "projects";
    const KIND: &'static str = "Project";
}

/// Abstraction over backends that persist whole records by id.
pub trait Repository<T: Record>: Send + Sync {
    fn get(&self, id: Uuid) -> Result<Option<T>>;
    fn save(&self, record: &T) -> Result<()>;
    /// Returns whether a record was removed.
    fn delete(&self, id: Uuid) -> Result<bool>;
    fn list(&self) -> Result<Vec<T>>;

    fn require(&self, id: Uuid) -> Result<T> {
        self.get(id)?
            .ok_or(LedgerError::NotFound { kind: T::KIND, id })
    }
}

/// Stores uploaded files and hands back their descriptors.
pub trait DocumentStore: Send + Sync {
    fn store(&self, upload: &DocumentUpload) -> Result<Document>;
    fn remove(&self, document: &Document) -> Result<()>;
}

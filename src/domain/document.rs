use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

/// Opaque attachment stored by a [`DocumentStore`](crate::storage::DocumentStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Uuid,
}

impl Identifiable for Document {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Raw file handed to the document store.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub name: String,
    pub file_type: String,
    pub bytes: Vec<u8>,
    pub uploaded_by: Uuid,
}

impl DocumentUpload {
    pub fn new(
        name: impl Into<String>,
        file_type: impl Into<String>,
        bytes: Vec<u8>,
        uploaded_by: Uuid,
    ) -> Self {
        Self {
            name: name.into(),
            file_type: file_type.into(),
            bytes,
            uploaded_by,
        }
    }
}

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Document, DocumentUpload};
use crate::errors::{LedgerError, Result};
use crate::storage::DocumentStore;
use crate::utils::ensure_dir;

const FILE_URL_PREFIX: &str = "file://";

/// Keeps uploads on the local filesystem and returns `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    dir: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: &Path) -> Result<Self> {
        let dir = root.join("documents");
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let path = PathBuf::from(url.strip_prefix(FILE_URL_PREFIX)?);
        path.starts_with(&self.dir).then_some(path)
    }
}

impl DocumentStore for LocalDocumentStore {
    fn store(&self, upload: &DocumentUpload) -> Result<Document> {
        if upload.bytes.is_empty() {
            return Err(LedgerError::validation(format!(
                "document `{}` is empty",
                upload.name
            )));
        }
        let id = Uuid::new_v4();
        let path = self
            .dir
            .join(format!("{}-{}", id, canonical_file_name(&upload.name)));
        fs::write(&path, &upload.bytes)?;
        info!(document = %id, name = %upload.name, bytes = upload.bytes.len(), "document stored");
        Ok(Document {
            id,
            name: upload.name.clone(),
            file_url: format!("{}{}", FILE_URL_PREFIX, path.display()),
            file_type: upload.file_type.clone(),
            file_size: upload.bytes.len() as u64,
            uploaded_at: Utc::now(),
            uploaded_by: upload.uploaded_by,
        })
    }

    fn remove(&self, document: &Document) -> Result<()> {
        let not_found = || LedgerError::NotFound {
            kind: "Document",
            id: document.id,
        };
        let path = self.path_for_url(&document.file_url).ok_or_else(not_found)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(not_found()),
            Err(err) => Err(err.into()),
        }
    }
}

fn canonical_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '.' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "document".into()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn store_then_remove() {
        let temp = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp.path()).unwrap();
        let upload = DocumentUpload::new("Invoice #12.pdf", "application/pdf", b"%PDF".to_vec(), Uuid::new_v4());

        let document = store.store(&upload).unwrap();
        assert_eq!(document.file_size, 4);
        assert!(document.file_url.starts_with("file://"));
        assert!(document.file_url.ends_with("invoice__12.pdf"));

        store.remove(&document).unwrap();
        assert!(matches!(
            store.remove(&document),
            Err(LedgerError::NotFound { kind: "Document", .. })
        ));
    }

    #[test]
    fn empty_upload_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp.path()).unwrap();
        let upload = DocumentUpload::new("blank.txt", "text/plain", Vec::new(), Uuid::new_v4());
        assert!(matches!(store.store(&upload), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn foreign_urls_are_never_deleted() {
        let temp = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp.path()).unwrap();
        let outside = Document {
            id: Uuid::new_v4(),
            name: "passwd".into(),
            file_url: "file:///etc/passwd".into(),
            file_type: "text/plain".into(),
            file_size: 1,
            uploaded_at: Utc::now(),
            uploaded_by: Uuid::new_v4(),
        };
        assert!(store.remove(&outside).is_err());
    }
}

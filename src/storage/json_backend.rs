use std::{
    fs::{self, File},
    io::{self, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use tracing::debug;
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::storage::{Record, Repository};
use crate::utils::ensure_dir;

const RECORD_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// One pretty-printed JSON file per record under `<root>/<collection>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonRepository<T> {
    dir: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> JsonRepository<T> {
    pub fn new(root: &Path) -> Result<Self> {
        let dir = root.join(T::COLLECTION);
        ensure_dir(&dir)?;
        Ok(Self {
            dir,
            _record: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }
}

impl<T: Record> Repository<T> for JsonRepository<T> {
    fn get(&self, id: Uuid) -> Result<Option<T>> {
        let path = self.record_path(id);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, record: &T) -> Result<()> {
        let path = self.record_path(record.id());
        save_record_to_path(record, &path)?;
        debug!(kind = T::KIND, id = %record.id(), path = %path.display(), "record saved");
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Result<Vec<T>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        paths
            .iter()
            .map(|path| load_record_from_path(path))
            .collect()
    }
}

pub fn save_record_to_path<T: Record>(record: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_record_from_path<T: Record>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| {
        LedgerError::persistence(format!("{} is not a valid {}: {}", path.display(), T::KIND, err))
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Money;
    use crate::domain::{Expense, ExpenseType, NewExpense};
    use crate::ledger::lifecycle;
    use chrono::Utc;
    use tempfile::TempDir;

    fn repo_with_temp_dir() -> (JsonRepository<Expense>, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let repo = JsonRepository::new(temp.path()).expect("json repository");
        (repo, temp)
    }

    fn sample() -> Expense {
        let form = NewExpense::office(ExpenseType::Office, Money::from_units(80), "Ink", Uuid::new_v4());
        lifecycle::create(form, Utc::now()).unwrap()
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (repo, _guard) = repo_with_temp_dir();
        let expense = sample();
        repo.save(&expense).expect("save expense");
        let loaded = repo.get(expense.id).expect("load expense");
        assert_eq!(loaded, Some(expense));
    }

    #[test]
    fn missing_record_is_none_and_delete_reports_absence() {
        let (repo, _guard) = repo_with_temp_dir();
        assert!(repo.get(Uuid::new_v4()).unwrap().is_none());
        assert!(!repo.delete(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn list_skips_foreign_files() {
        let (repo, _guard) = repo_with_temp_dir();
        repo.save(&sample()).unwrap();
        repo.save(&sample()).unwrap();
        fs::write(repo.dir().join("notes.txt"), "ignore me").unwrap();
        assert_eq!(repo.list().unwrap().len(), 2);
        assert!(!repo.record_path(Uuid::nil()).with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_record_is_a_persistence_error() {
        let (repo, _guard) = repo_with_temp_dir();
        let id = Uuid::new_v4();
        fs::write(repo.record_path(id), "{ not json").unwrap();
        let err = repo.get(id).unwrap_err();
        assert!(matches!(err, LedgerError::Persistence { .. }));
    }
}

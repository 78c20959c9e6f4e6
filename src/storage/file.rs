//! JSON-file storage area

use super::traits::{StoragePort, StorageError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Atomically write data to a file using write-to-temp + fsync + rename.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

type Entries = BTreeMap<String, String>;

/// Storage area persisted as a single JSON object on disk.
///
/// Nothing is cached: every read loads the file, and every mutation is a
/// read-modify-write under the lock followed by an atomic rewrite. Several
/// handles (or processes) on the same file therefore see each other's
/// commits, and a write never resurrects keys another handle removed.
/// A missing file reads as an empty area.
pub struct FileStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStorage {
    /// Open the area at `path`, failing early if the file exists but does not
    /// hold a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self {
            path: path.into(),
            lock: RwLock::new(()),
        };
        let entries = store.load()?;
        debug!("Opened storage file {:?} ({} keys)", store.path, entries.len());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&self, entries: &Entries) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(entries)?;
        atomic_write(&self.path, &data)
    }

    /// Apply `change` to the current on-disk contents and write the result
    /// back if `change` reports a modification.
    fn update<T>(
        &self,
        change: impl FnOnce(&mut Entries) -> (T, bool),
    ) -> Result<T, StorageError> {
        let _guard = self.lock.write();
        let mut entries = self.load()?;
        let (out, modified) = change(&mut entries);
        if modified {
            self.flush(&entries)?;
        }
        Ok(out)
    }
}

impl StoragePort for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.read();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            let previous = entries.insert(key.to_string(), value.to_string());
            ((), previous.as_deref() != Some(value))
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| ((), entries.remove(key).is_some()))
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock.read();
        Ok(self.load()?.into_keys().collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.update(|entries| {
            let had_keys = !entries.is_empty();
            entries.clear();
            ((), had_keys)
        })
    }

    fn remove_prefixed(&self, prefix: &str) -> Result<usize, StorageError> {
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|k, _| !k.starts_with(prefix));
            let removed = before - entries.len();
            (removed, removed > 0)
        })
    }
}

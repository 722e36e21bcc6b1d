//! Durable key-value slot holding the serialized watchlist.
//!
//! `KeyValueStore` is the injected storage seam; `FileStore` keeps one file
//! per key on disk and `MemoryStore` is an in-process double.
//! `PersistentWatchlistStore` owns the single `cities` key and always writes
//! the whole collection.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{error::StoreError, model::WatchlistEntry};

/// Key under which the watchlist is persisted.
pub const WATCHLIST_KEY: &str = "cities";

/// Minimal get/set interface over a durable string slot.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { key: key.to_string(), source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io { key: key.to_string(), source };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        let path = self.path_for(key);
        let tmp = temp_path(&path);
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;

        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Process-local store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access for tests that seed or inspect the slot.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.lock().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.slots.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Serialization target/source for the watchlist.
#[derive(Debug, Clone)]
pub struct PersistentWatchlistStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PersistentWatchlistStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Absent slot reads as an empty list; malformed content is `Corrupt`.
    pub fn read(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        let Some(raw) = self.backend.get(WATCHLIST_KEY)? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw)
            .map_err(|source| StoreError::Corrupt { key: WATCHLIST_KEY.to_string(), source })
    }

    /// Replace the stored collection.
    pub fn write(&self, entries: &[WatchlistEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_string(entries).map_err(StoreError::Serialize)?;
        self.backend.set(WATCHLIST_KEY, &json)
    }

    /// [`write`](Self::write) on the blocking pool, for callers on a runtime thread.
    pub async fn write_off_thread(&self, entries: Vec<WatchlistEntry>) -> Result<(), StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.write(&entries))
            .await
            .map_err(|e| StoreError::Io {
                key: WATCHLIST_KEY.to_string(),
                source: std::io::Error::other(e),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CityId;

    fn entry(id: u64, name: &str) -> WatchlistEntry {
        WatchlistEntry {
            id: CityId(id),
            city_name: name.into(),
            country: "FR".into(),
            state: String::new(),
            description: "nuageux".into(),
            icon: "04d".into(),
            current_temp_c: 8,
            feels_like_c: 6,
            min_temp_c: 5,
            max_temp_c: 10,
            last_updated: "01/02/24 10:00".into(),
        }
    }

    #[test]
    fn absent_slot_reads_empty() {
        let store = PersistentWatchlistStore::new(Arc::new(MemoryStore::new()));
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn malformed_slot_is_reported_as_corrupt() {
        let backend = MemoryStore::new();
        backend.set(WATCHLIST_KEY, "{not json").unwrap();

        let store = PersistentWatchlistStore::new(Arc::new(backend));
        let err = store.read().unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn write_replaces_whole_collection() {
        let backend = MemoryStore::new();
        let store = PersistentWatchlistStore::new(Arc::new(backend.clone()));

        store.write(&[entry(1, "Paris"), entry(2, "Lyon")]).unwrap();
        store.write(&[entry(2, "Lyon")]).unwrap();

        let read = store.read().unwrap();
        assert_eq!(read, vec![entry(2, "Lyon")]);
        assert!(backend.raw(WATCHLIST_KEY).unwrap().starts_with('['));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = PersistentWatchlistStore::new(Arc::new(FileStore::new(dir.path())));
        first.write(&[entry(3, "Évry")]).unwrap();

        let second = PersistentWatchlistStore::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(second.read().unwrap(), vec![entry(3, "Évry")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn off_thread_write_reaches_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentWatchlistStore::new(Arc::new(FileStore::new(dir.path().join("data"))));

        store.write_off_thread(vec![entry(4, "Nantes")]).await.unwrap();

        assert_eq!(store.read().unwrap(), vec![entry(4, "Nantes")]);
    }

    #[test]
    fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("not-yet-created"));
        assert_eq!(store.get(WATCHLIST_KEY).unwrap(), None);
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, warn};
use watchlist_models::Collection;
use watchlist_remote::{Observers, Subscription};
use crate::error::StoreError;

/// Fixed key of the serialized collection blob.
pub const WATCHLIST_KEY: &str = "watchlist";
/// Key of the migration record.
pub const MIGRATION_FLAGS_KEY: &str = "migration_flags";

/// Durable string storage underneath the local cache.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key. Writes go to a temp file first and are renamed into place,
/// so readers never observe a partially written value.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, value)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values().remove(key);
        Ok(())
    }
}

/// Per-device record used to decide whether guest data should be offered for migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFlags {
    #[serde(default)]
    pub guest_warning_shown: bool,
    #[serde(default)]
    pub has_guest_data: bool,
}

/// Local copy of the current identity's collection.
///
/// Reads never fail: a missing or unreadable blob is an empty collection. Writes update the
/// in-process snapshot, persist it, then notify subscribers with the new collection.
/// A persistence failure is logged and does not undo the in-process write.
pub struct LocalCacheStore {
    backend: Box<dyn KeyValueStore>,
    snapshot: Mutex<Option<Collection>>,
    observers: Observers<Collection>,
}

impl LocalCacheStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            snapshot: Mutex::new(None),
            observers: Observers::new(),
        }
    }

    /// File-backed store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(Box::new(FileKeyValueStore::new(dir)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryKeyValueStore::new()))
    }

    fn snapshot(&self) -> MutexGuard<'_, Option<Collection>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read(&self) -> Collection {
        let mut snapshot = self.snapshot();
        if let Some(collection) = snapshot.as_ref() {
            return collection.clone();
        }
        let collection = self.load();
        *snapshot = Some(collection.clone());
        collection
    }

    fn load(&self) -> Collection {
        let content = match self.backend.get(WATCHLIST_KEY) {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!("Local cache miss: no stored watchlist");
                return Collection::empty();
            }
            Err(e) => {
                warn!("Failed to read local watchlist: {}. Treating as empty.", e);
                return Collection::empty();
            }
        };

        match serde_json::from_str::<Collection>(&content) {
            Ok(collection) => {
                debug!("Local cache hit: loaded {} items", collection.len());
                collection
            }
            Err(e) => {
                warn!("Local watchlist corruption detected: {}. Treating as empty.", e);
                Collection::empty()
            }
        }
    }

    pub fn write(&self, collection: &Collection) {
        *self.snapshot() = Some(collection.clone());

        match serde_json::to_string(collection) {
            Ok(json) => {
                if let Err(e) = self.backend.put(WATCHLIST_KEY, &json) {
                    error!("Failed to persist local watchlist ({} items): {}", collection.len(), e);
                } else {
                    debug!("Local watchlist saved ({} items)", collection.len());
                }
            }
            Err(e) => error!("Failed to serialize local watchlist: {}", e),
        }

        self.observers.notify(collection);
    }

    pub fn clear(&self) {
        self.write(&Collection::empty());
    }

    /// Registers a callback fired after every write with the new collection.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Collection) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn read_flags(&self) -> MigrationFlags {
        match self.backend.get(MIGRATION_FLAGS_KEY) {
            Ok(Some(content)) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Migration flags unreadable: {}. Using defaults.", e);
                MigrationFlags::default()
            }),
            Ok(None) => MigrationFlags::default(),
            Err(e) => {
                warn!("Failed to read migration flags: {}", e);
                MigrationFlags::default()
            }
        }
    }

    pub fn write_flags(&self, flags: &MigrationFlags) {
        let result = serde_json::to_string(flags)
            .map_err(StoreError::from)
            .and_then(|json| self.backend.put(MIGRATION_FLAGS_KEY, &json));
        if let Err(e) = result {
            error!("Failed to persist migration flags: {}", e);
        }
    }

    pub fn clear_flags(&self) {
        if let Err(e) = self.backend.remove(MIGRATION_FLAGS_KEY) {
            error!("Failed to clear migration flags: {}", e);
        }
    }
}

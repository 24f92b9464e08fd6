use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use watchlist_models::{Identity, ItemKey, ItemPatch, WatchItem};
use crate::error::{RemoteError, Result};
use crate::subscription::{Observers, Subscription};
use crate::traits::{IdentityCallback, RemoteMediaRepository, SessionOracle};

/// In-process keyed table with failure injection. Rows are kept per user id in insertion order.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<HashMap<String, Vec<WatchItem>>>,
    rejected_inserts: Mutex<HashSet<ItemKey>>,
    reject_writes: AtomicBool,
    fail_reads: AtomicBool,
    write_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds rows for a user, bypassing failure injection.
    pub fn with_items(self, user_id: &str, items: Vec<WatchItem>) -> Self {
        lock(&self.tables).insert(user_id.to_string(), items);
        self
    }

    /// Every insert of `key` fails with `RemoteError::Rejected`.
    pub fn reject_insert(&self, key: ItemKey) {
        lock(&self.rejected_inserts).insert(key);
    }

    /// Every insert, update and delete fails while set.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// `list_all` fails while set.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self, user_id: &str) -> Vec<WatchItem> {
        lock(&self.tables).get(user_id).cloned().unwrap_or_default()
    }

    /// Number of write attempts (successful or not).
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn begin_write(&self, operation: &str) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected(format!("{} refused", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteMediaRepository for MemoryRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_all(&self, identity: &Identity) -> Result<Vec<WatchItem>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::Http {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.rows(&identity.user_id))
    }

    async fn insert(&self, identity: &Identity, item: &WatchItem) -> Result<WatchItem> {
        self.begin_write("insert")?;
        let key = item.key();
        if lock(&self.rejected_inserts).contains(&key) {
            return Err(RemoteError::Rejected(format!("insert of {} refused", key)));
        }

        let mut tables = lock(&self.tables);
        let rows = tables.entry(identity.user_id.clone()).or_default();
        if rows.iter().any(|row| row.key() == key) {
            return Err(RemoteError::DuplicateKey(key));
        }
        rows.push(item.clone());
        Ok(item.clone())
    }

    async fn update(&self, identity: &Identity, key: &ItemKey, patch: &ItemPatch) -> Result<WatchItem> {
        self.begin_write("update")?;
        let mut tables = lock(&self.tables);
        let row = tables
            .get_mut(&identity.user_id)
            .and_then(|rows| rows.iter_mut().find(|row| row.key() == *key))
            .ok_or(RemoteError::NotFound(*key))?;
        row.apply(patch);
        Ok(row.clone())
    }

    async fn delete(&self, identity: &Identity, key: &ItemKey) -> Result<()> {
        self.begin_write("delete")?;
        if let Some(rows) = lock(&self.tables).get_mut(&identity.user_id) {
            rows.retain(|row| row.key() != *key);
        }
        Ok(())
    }
}

/// Session oracle holding the identity in memory.
#[derive(Default)]
pub struct MemorySession {
    identity: Mutex<Option<Identity>>,
    fail: AtomicBool,
    observers: Observers<Option<Identity>>,
}

impl MemorySession {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
            ..Self::default()
        }
    }

    /// Replaces the identity and fires change callbacks.
    pub fn set_identity(&self, identity: Option<Identity>) {
        *lock(&self.identity) = identity.clone();
        self.observers.notify(&identity);
    }

    /// `current_identity` fails while set.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionOracle for MemorySession {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Session("session provider unavailable".to_string()));
        }
        Ok(lock(&self.identity).clone())
    }

    fn on_identity_change(&self, callback: IdentityCallback) -> Subscription {
        self.observers.subscribe(move |identity| callback(identity))
    }
}

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};
use watchlist_models::{Collection, Identity, ItemKey, ItemPatch, MediaKind, Progress, WatchItem, WatchStatus};
use watchlist_remote::{RemoteError, RemoteMediaRepository, Subscription};
use crate::error::SyncError;
use crate::local_store::LocalCacheStore;

/// Why a mutation was skipped without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftFailure {
    /// The key already exists in some partition.
    DuplicateItem,
    /// The key is absent from every partition.
    ItemNotFound,
    /// Progress was requested for a movie.
    NotSeries,
}

impl fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftFailure::DuplicateItem => f.write_str("item is already in the watchlist"),
            SoftFailure::ItemNotFound => f.write_str("item is not in the watchlist"),
            SoftFailure::NotSeries => f.write_str("progress only applies to series"),
        }
    }
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    Skipped(SoftFailure),
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SyncOutcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// Local cache replaced with this many remote items.
    Hydrated { items: usize },
    /// Guest session; nothing to fetch.
    Skipped,
}

/// Single entry point for watchlist reads and writes.
///
/// Writes go to the remote repository first when an identity is active and are applied to the
/// local cache only after the remote step succeeds, so the cache never holds data the remote
/// store rejected. Guests write to the local cache only.
pub struct SyncCoordinator {
    store: Arc<LocalCacheStore>,
    remote: Arc<dyn RemoteMediaRepository>,
    identity: Mutex<Option<Identity>>,
}

impl SyncCoordinator {
    pub fn new(store: Arc<LocalCacheStore>, remote: Arc<dyn RemoteMediaRepository>) -> Self {
        Self {
            store,
            remote,
            identity: Mutex::new(None),
        }
    }

    fn identity(&self) -> MutexGuard<'_, Option<Identity>> {
        self.identity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.identity().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Records a login/logout transition. Does not move data: callers follow up with
    /// `hydrate_from_remote` (login) or `clear` (logout).
    pub fn switch_identity(&self, identity: Option<Identity>) {
        let mut current = self.identity();
        match (current.as_ref(), identity.as_ref()) {
            (None, Some(next)) => info!(operation = "switch_identity", user_id = %next.user_id, "Signed in"),
            (Some(prev), None) => info!(operation = "switch_identity", user_id = %prev.user_id, "Signed out"),
            (Some(prev), Some(next)) if prev.user_id != next.user_id => info!(
                operation = "switch_identity",
                from = %prev.user_id,
                to = %next.user_id,
                "Switched account"
            ),
            _ => debug!(operation = "switch_identity", "Identity unchanged"),
        }
        *current = identity;
    }

    fn remote_failed(operation: &'static str, key: ItemKey, source: RemoteError) -> SyncError {
        warn!(
            operation = operation,
            key = %key,
            status = "error",
            error = %source,
            "Remote write failed, local cache left unchanged"
        );
        SyncError::RemoteWriteFailed { operation, key, source }
    }

    #[instrument(skip(self, item), fields(key = %item.key()))]
    pub async fn add_item(&self, item: WatchItem) -> Result<SyncOutcome, SyncError> {
        let key = item.key();
        // Duplicates short-circuit before any network call
        if self.store.read().contains(&key) {
            warn!(operation = "add_item", key = %key, "Item already in watchlist, skipping");
            return Ok(SyncOutcome::Skipped(SoftFailure::DuplicateItem));
        }

        match self.current_identity() {
            Some(identity) => {
                self.remote
                    .insert(&identity, &item)
                    .await
                    .map_err(|e| Self::remote_failed("add_item", key, e))?;
            }
            None => self.mark_guest_data(),
        }

        let mut collection = self.store.read();
        if !collection.insert(item) {
            warn!(operation = "add_item", key = %key, "Item appeared locally during remote write, skipping");
            return Ok(SyncOutcome::Skipped(SoftFailure::DuplicateItem));
        }
        self.store.write(&collection);
        debug!(operation = "add_item", key = %key, status = "ok", "Item added");
        Ok(SyncOutcome::Applied)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, key: ItemKey) -> Result<SyncOutcome, SyncError> {
        if let Some(identity) = self.current_identity() {
            self.remote
                .delete(&identity, &key)
                .await
                .map_err(|e| Self::remote_failed("remove_item", key, e))?;
        }

        let mut collection = self.store.read();
        if collection.remove(&key).is_some() {
            self.store.write(&collection);
            debug!(operation = "remove_item", key = %key, status = "ok", "Item removed");
        } else {
            debug!(operation = "remove_item", key = %key, "Item not in local cache, nothing to remove");
        }
        Ok(SyncOutcome::Applied)
    }

    #[instrument(skip(self))]
    pub async fn change_status(&self, key: ItemKey, status: WatchStatus) -> Result<SyncOutcome, SyncError> {
        if !self.store.read().contains(&key) {
            warn!(operation = "change_status", key = %key, "Item not found in local cache");
            return Ok(SyncOutcome::Skipped(SoftFailure::ItemNotFound));
        }

        if let Some(identity) = self.current_identity() {
            self.remote
                .update(&identity, &key, &ItemPatch::status(status))
                .await
                .map_err(|e| Self::remote_failed("change_status", key, e))?;
        }

        let mut collection = self.store.read();
        if !collection.move_to(&key, status) {
            warn!(operation = "change_status", key = %key, "Item disappeared from local cache during remote write");
            return Ok(SyncOutcome::Skipped(SoftFailure::ItemNotFound));
        }
        self.store.write(&collection);
        debug!(operation = "change_status", key = %key, status = %status, "Item moved");
        Ok(SyncOutcome::Applied)
    }

    /// Records series progress. Zero season/episode values are clamped to 1.
    #[instrument(skip(self))]
    pub async fn update_progress(&self, key: ItemKey, season: u32, episode: u32) -> Result<SyncOutcome, SyncError> {
        let kind = match self.store.read().find(&key) {
            Some(item) => item.kind(),
            None => {
                warn!(operation = "update_progress", key = %key, "Item not found in local cache");
                return Ok(SyncOutcome::Skipped(SoftFailure::ItemNotFound));
            }
        };
        if kind != MediaKind::Series {
            warn!(operation = "update_progress", key = %key, "Progress only applies to series, ignoring");
            return Ok(SyncOutcome::Skipped(SoftFailure::NotSeries));
        }

        let progress = Progress::new(season, episode);
        if let Some(identity) = self.current_identity() {
            self.remote
                .update(&identity, &key, &ItemPatch::progress(progress))
                .await
                .map_err(|e| Self::remote_failed("update_progress", key, e))?;
        }

        let mut collection = self.store.read();
        match collection.find_mut(&key) {
            Some(item) => {
                item.set_progress(progress);
            }
            None => {
                warn!(operation = "update_progress", key = %key, "Item disappeared from local cache during remote write");
                return Ok(SyncOutcome::Skipped(SoftFailure::ItemNotFound));
            }
        }
        self.store.write(&collection);
        debug!(operation = "update_progress", key = %key, progress = %progress, "Progress updated");
        Ok(SyncOutcome::Applied)
    }

    pub fn query_by_status(&self, status: WatchStatus) -> Vec<WatchItem> {
        self.store.read().partition(status).to_vec()
    }

    pub fn query_status_of(&self, key: &ItemKey) -> Option<WatchStatus> {
        self.store.read().status_of(key)
    }

    pub fn collection(&self) -> Collection {
        self.store.read()
    }

    /// Replaces the local cache with the remote collection. A no-op for guests.
    #[instrument(skip(self))]
    pub async fn hydrate_from_remote(&self) -> Result<HydrateOutcome, SyncError> {
        let identity = match self.current_identity() {
            Some(identity) => identity,
            None => {
                debug!(operation = "hydrate", "Guest session, skipping hydration");
                return Ok(HydrateOutcome::Skipped);
            }
        };

        let items = self.remote.list_all(&identity).await.map_err(|e| {
            warn!(operation = "hydrate", status = "error", error = %e, "Failed to fetch remote watchlist");
            SyncError::RemoteReadFailed(e)
        })?;

        let collection = Collection::from_items(items);
        let count = collection.len();
        self.store.write(&collection);
        info!(
            operation = "hydrate",
            source = self.remote.name(),
            items = count,
            "Local cache replaced from remote"
        );
        Ok(HydrateOutcome::Hydrated { items: count })
    }

    pub fn clear(&self) {
        self.store.clear();
        info!(operation = "clear", "Local cache cleared");
    }

    pub fn on_collection_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Collection) + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    fn mark_guest_data(&self) {
        let mut flags = self.store.read_flags();
        if !flags.has_guest_data {
            flags.has_guest_data = true;
            self.store.write_flags(&flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchlist_remote::MemoryRepository;

    fn guest_coordinator() -> SyncCoordinator {
        SyncCoordinator::new(Arc::new(LocalCacheStore::in_memory()), Arc::new(MemoryRepository::new()))
    }

    #[tokio::test]
    async fn test_guest_add_sets_guest_flag() {
        let store = Arc::new(LocalCacheStore::in_memory());
        let coordinator = SyncCoordinator::new(Arc::clone(&store), Arc::new(MemoryRepository::new()));
        assert!(!store.read_flags().has_guest_data);

        let outcome = coordinator
            .add_item(WatchItem::movie(1, "A", WatchStatus::Want))
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Applied);
        assert!(store.read_flags().has_guest_data);
    }

    #[tokio::test]
    async fn test_same_status_move_keeps_position() {
        let coordinator = guest_coordinator();
        for id in 1..=3 {
            let _ = coordinator.add_item(WatchItem::movie(id, "M", WatchStatus::Want)).await.unwrap();
        }
        let outcome = coordinator.change_status(ItemKey::movie(1), WatchStatus::Want).await.unwrap();
        assert!(outcome.is_applied());

        let ids: Vec<i64> = coordinator
            .query_by_status(WatchStatus::Want)
            .iter()
            .map(|item| item.external_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_progress_missing_item() {
        let coordinator = guest_coordinator();
        let outcome = coordinator.update_progress(ItemKey::series(9), 1, 2).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Skipped(SoftFailure::ItemNotFound));
    }

    #[tokio::test]
    async fn test_switch_identity_toggles_authentication() {
        let coordinator = guest_coordinator();
        assert!(!coordinator.is_authenticated());
        coordinator.switch_identity(Some(Identity::new("user-1", "token")));
        assert!(coordinator.is_authenticated());
        coordinator.switch_identity(None);
        assert!(coordinator.current_identity().is_none());
    }
}

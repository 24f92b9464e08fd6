use std::sync::Arc;
use tracing::{debug, error, info, warn};
use watchlist_remote::RemoteMediaRepository;
use crate::local_store::LocalCacheStore;
use crate::sync::SyncCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDecision {
    Migrate,
    Discard,
}

/// Decision point shown to the user when guest data exists at login.
pub trait MigrationPrompt: Send + Sync {
    fn offer_migration(&self, count: usize) -> MigrationDecision;
}

/// A fixed answer, for non-interactive callers.
impl MigrationPrompt for MigrationDecision {
    fn offer_migration(&self, _count: usize) -> MigrationDecision {
        *self
    }
}

/// Best-effort transfer of a guest collection into a freshly signed-in account.
///
/// Each item is inserted on its own; failures are logged and counted as not migrated.
/// With an identity active, every outcome (migrate, discard, nothing left to move)
/// ends by rebuilding the local cache from the remote store, which drops the items
/// that never made it across.
pub struct MigrationProtocol {
    coordinator: Arc<SyncCoordinator>,
    store: Arc<LocalCacheStore>,
    remote: Arc<dyn RemoteMediaRepository>,
}

impl MigrationProtocol {
    pub fn new(
        coordinator: Arc<SyncCoordinator>,
        store: Arc<LocalCacheStore>,
        remote: Arc<dyn RemoteMediaRepository>,
    ) -> Self {
        Self { coordinator, store, remote }
    }

    pub fn has_guest_data(&self) -> bool {
        self.store.read_flags().has_guest_data
    }

    /// True once per device: a guest with local data who has not been warned yet that
    /// the data lives only on this device.
    pub fn should_warn_guest(&self) -> bool {
        let flags = self.store.read_flags();
        !self.coordinator.is_authenticated() && flags.has_guest_data && !flags.guest_warning_shown
    }

    pub fn mark_guest_warning_shown(&self) {
        let mut flags = self.store.read_flags();
        if !flags.guest_warning_shown {
            flags.guest_warning_shown = true;
            self.store.write_flags(&flags);
        }
    }

    /// Returns how many guest items reached the remote store. Never fails.
    ///
    /// Without the guest flag this is a no-op and the cache is left alone.
    pub async fn migrate_guest_data(&self, prompt: &dyn MigrationPrompt) -> usize {
        if !self.has_guest_data() {
            debug!(operation = "migrate", "No guest data flagged, nothing to migrate");
            return 0;
        }

        let identity = match self.coordinator.current_identity() {
            Some(identity) => identity,
            None => {
                warn!(operation = "migrate", "Migration requires a signed-in account, skipping");
                return 0;
            }
        };

        let items = self.store.read().into_items();
        let total = items.len();
        if total == 0 {
            debug!(operation = "migrate", "Guest collection is empty");
            self.store.clear_flags();
            self.refresh().await;
            return 0;
        }

        if prompt.offer_migration(total) == MigrationDecision::Discard {
            self.store.clear();
            self.store.clear_flags();
            info!(operation = "migrate", discarded = total, "Guest data discarded");
            self.refresh().await;
            return 0;
        }

        info!(operation = "migrate", user_id = %identity.user_id, items = total, "Migrating guest data");
        let mut migrated = 0;
        for item in &items {
            match self.remote.insert(&identity, item).await {
                Ok(_) => migrated += 1,
                Err(e) => warn!(
                    operation = "migrate",
                    key = %item.key(),
                    status = "error",
                    error = %e,
                    "Failed to migrate item"
                ),
            }
        }

        self.refresh().await;
        self.store.clear_flags();

        info!(
            operation = "migrate",
            migrated = migrated,
            failed = total - migrated,
            "Guest data migration finished"
        );
        migrated
    }

    async fn refresh(&self) {
        if let Err(e) = self.coordinator.hydrate_from_remote().await {
            error!(operation = "migrate", error = %e, "Failed to refresh local cache after migration");
        }
    }
}

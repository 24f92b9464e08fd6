use async_trait::async_trait;
use watchlist_models::{Identity, ItemKey, ItemPatch, WatchItem};
use crate::error::Result;
use crate::subscription::Subscription;

/// Authenticated CRUD over watchlist rows keyed by (user, external id, kind).
#[async_trait]
pub trait RemoteMediaRepository: Send + Sync {
    // Repository metadata
    fn name(&self) -> &str;

    /// Every row owned by `identity`, oldest first.
    async fn list_all(&self, identity: &Identity) -> Result<Vec<WatchItem>>;

    /// Fails with `RemoteError::DuplicateKey` if the key already exists for this user.
    async fn insert(&self, identity: &Identity, item: &WatchItem) -> Result<WatchItem>;

    /// Fails with `RemoteError::NotFound` if no row matches.
    async fn update(&self, identity: &Identity, key: &ItemKey, patch: &ItemPatch) -> Result<WatchItem>;

    /// Idempotent: deleting a missing row succeeds.
    async fn delete(&self, identity: &Identity, key: &ItemKey) -> Result<()>;
}

pub type IdentityCallback = Box<dyn Fn(&Option<Identity>) + Send + Sync>;

/// Reports the active remote identity. `None` means the device is in guest mode.
#[async_trait]
pub trait SessionOracle: Send + Sync {
    async fn current_identity(&self) -> Result<Option<Identity>>;

    /// Fires with the new identity (or `None`) after every login/logout.
    fn on_identity_change(&self, callback: IdentityCallback) -> Subscription;
}

use async_trait::async_trait;
use watchlist_models::{Identity, ItemKey, ItemPatch, WatchItem};
use crate::error::{RemoteError, Result};
use crate::traits::RemoteMediaRepository;

/// Stand-in used when no remote store is configured. Every call fails,
/// so a stale stored session cannot silently write only to the local cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRepository;

fn unavailable() -> RemoteError {
    RemoteError::Unavailable("no [remote] section in config.toml".to_string())
}

#[async_trait]
impl RemoteMediaRepository for OfflineRepository {
    fn name(&self) -> &str {
        "offline"
    }

    async fn list_all(&self, _identity: &Identity) -> Result<Vec<WatchItem>> {
        Err(unavailable())
    }

    async fn insert(&self, _identity: &Identity, _item: &WatchItem) -> Result<WatchItem> {
        Err(unavailable())
    }

    async fn update(&self, _identity: &Identity, _key: &ItemKey, _patch: &ItemPatch) -> Result<WatchItem> {
        Err(unavailable())
    }

    async fn delete(&self, _identity: &Identity, _key: &ItemKey) -> Result<()> {
        Err(unavailable())
    }
}

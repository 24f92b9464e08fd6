use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;
use watchlist_config::SessionStore;
use watchlist_models::Identity;
use crate::error::{RemoteError, Result};
use crate::subscription::{Observers, Subscription};
use crate::traits::{IdentityCallback, SessionOracle};

/// Session oracle backed by the on-disk session file.
///
/// `login` and `logout` persist the change before firing identity-change callbacks,
/// so a callback that re-reads `current_identity` sees the new state.
pub struct StoredSession {
    store: Mutex<SessionStore>,
    observers: Observers<Option<Identity>>,
}

impl StoredSession {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let mut store = SessionStore::new(path);
        store.load()?;
        Ok(Self {
            store: Mutex::new(store),
            observers: Observers::new(),
        })
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn login(&self, identity: Identity) -> anyhow::Result<()> {
        {
            let mut store = self.store();
            store.set_identity(&identity);
            store.save()?;
        }
        info!(operation = "login", user_id = %identity.user_id, "Session stored");
        self.observers.notify(&Some(identity));
        Ok(())
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        {
            let mut store = self.store();
            store.clear_identity();
            store.save()?;
        }
        info!(operation = "logout", "Session cleared");
        self.observers.notify(&None);
        Ok(())
    }
}

#[async_trait]
impl SessionOracle for StoredSession {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        let mut store = self.store();
        store
            .load()
            .map_err(|e| RemoteError::Session(format!("Failed to read session file: {}", e)))?;
        Ok(store.identity())
    }

    fn on_identity_change(&self, callback: IdentityCallback) -> Subscription {
        self.observers.subscribe(move |identity| callback(identity))
    }
}

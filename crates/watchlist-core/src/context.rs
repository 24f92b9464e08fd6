use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};
use watchlist_config::{Config, PathManager};
use watchlist_remote::{OfflineRepository, RemoteMediaRepository, RestRepository, SessionOracle, StoredSession};
use crate::bootstrap::{BootstrapSequencer, InitGate};
use crate::local_store::LocalCacheStore;
use crate::migration::MigrationProtocol;
use crate::sync::SyncCoordinator;

/// Everything one process needs, wired once by the entry point and passed by reference.
pub struct AppContext {
    pub store: Arc<LocalCacheStore>,
    pub remote: Arc<dyn RemoteMediaRepository>,
    pub session: Arc<dyn SessionOracle>,
    pub gate: Arc<InitGate>,
    pub coordinator: Arc<SyncCoordinator>,
    pub migration: Arc<MigrationProtocol>,
    pub bootstrap: BootstrapSequencer,
}

impl AppContext {
    pub fn new(
        store: Arc<LocalCacheStore>,
        remote: Arc<dyn RemoteMediaRepository>,
        session: Arc<dyn SessionOracle>,
    ) -> Self {
        let gate = Arc::new(InitGate::new());
        let coordinator = Arc::new(SyncCoordinator::new(Arc::clone(&store), Arc::clone(&remote)));
        let migration = Arc::new(MigrationProtocol::new(
            Arc::clone(&coordinator),
            Arc::clone(&store),
            Arc::clone(&remote),
        ));
        let bootstrap = BootstrapSequencer::new(
            Arc::clone(&coordinator),
            Arc::clone(&session),
            Arc::clone(&migration),
            Arc::clone(&gate),
        );

        Self {
            store,
            remote,
            session,
            gate,
            coordinator,
            migration,
            bootstrap,
        }
    }

    /// Builds the on-disk context. The stored session is also returned concretely so the
    /// caller can log in and out.
    pub fn open(config: &Config, paths: &PathManager) -> Result<(Self, Arc<StoredSession>)> {
        paths.ensure_directories()?;
        let store = Arc::new(LocalCacheStore::open(&paths.store_dir())?);

        let remote: Arc<dyn RemoteMediaRepository> = match &config.remote {
            Some(remote_config) if config.is_remote_configured() => {
                debug!(url = %remote_config.url, table = %remote_config.table, "Using remote store");
                Arc::new(RestRepository::new(remote_config)?)
            }
            Some(_) => {
                warn!("Remote store configuration is invalid, running offline");
                Arc::new(OfflineRepository)
            }
            None => Arc::new(OfflineRepository),
        };

        let session = Arc::new(StoredSession::open(paths.session_file())?);
        let context = Self::new(store, remote, session.clone());
        Ok((context, session))
    }
}

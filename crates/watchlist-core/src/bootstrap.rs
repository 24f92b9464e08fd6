use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use watchlist_models::Identity;
use watchlist_remote::{Observers, SessionOracle, Subscription};
use crate::error::{BootstrapError, SyncError};
use crate::migration::{MigrationDecision, MigrationPrompt, MigrationProtocol};
use crate::sync::SyncCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    NotStarted,
    Pending { auth_resolved: bool, data_hydrated: bool },
    Initialized,
}

#[derive(Debug, Default)]
struct GateFlags {
    started: bool,
    auth_resolved: bool,
    data_hydrated: bool,
}

impl GateFlags {
    fn initialized(&self) -> bool {
        self.auth_resolved && self.data_hydrated
    }
}

/// Two readiness flags combined with AND. Each flag only moves false -> true until `reset`.
/// Subscribers hear about the transition to initialized exactly once per cycle.
#[derive(Default)]
pub struct InitGate {
    flags: Mutex<GateFlags>,
    observers: Observers<()>,
}

impl InitGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn flags(&self) -> MutexGuard<'_, GateFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> InitState {
        let flags = self.flags();
        if flags.initialized() {
            InitState::Initialized
        } else if !flags.started {
            InitState::NotStarted
        } else {
            InitState::Pending {
                auth_resolved: flags.auth_resolved,
                data_hydrated: flags.data_hydrated,
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.flags().initialized()
    }

    /// Leaves `NotStarted`; both flags stay false.
    pub fn begin(&self) {
        self.flags().started = true;
    }

    /// Returns true if the flag changed.
    pub fn mark_auth_resolved(&self) -> bool {
        self.mark(|flags| &mut flags.auth_resolved)
    }

    /// Returns true if the flag changed.
    pub fn mark_data_hydrated(&self) -> bool {
        self.mark(|flags| &mut flags.data_hydrated)
    }

    fn mark(&self, select: impl FnOnce(&mut GateFlags) -> &mut bool) -> bool {
        let became_initialized = {
            let mut flags = self.flags();
            flags.started = true;
            let flag = select(&mut *flags);
            if *flag {
                return false;
            }
            *flag = true;
            flags.initialized()
        };

        if became_initialized {
            debug!("App initialized");
            self.observers.notify(&());
        }
        true
    }

    pub fn reset(&self) {
        *self.flags() = GateFlags::default();
    }

    pub fn on_initialized<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.subscribe(move |_| callback())
    }
}

/// What a login/logout transition did to the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityTransition {
    /// Signed in; `migrated` guest items reached the account.
    SignedIn { migrated: usize },
    SignedOut,
}

/// Runs the start-up sequence and identity transitions, driving the [`InitGate`].
pub struct BootstrapSequencer {
    coordinator: Arc<SyncCoordinator>,
    session: Arc<dyn SessionOracle>,
    migration: Arc<MigrationProtocol>,
    gate: Arc<InitGate>,
}

impl BootstrapSequencer {
    pub fn new(
        coordinator: Arc<SyncCoordinator>,
        session: Arc<dyn SessionOracle>,
        migration: Arc<MigrationProtocol>,
        gate: Arc<InitGate>,
    ) -> Self {
        Self { coordinator, session, migration, gate }
    }

    pub fn gate(&self) -> &Arc<InitGate> {
        &self.gate
    }

    /// Resolve session, hydrate when signed in, then open the gate.
    ///
    /// Guest data still flagged under a signed-in session is migrated before the
    /// account is loaded, so it is never overwritten unseen.
    ///
    /// Any failure still opens the gate so the UI shows the best-effort local state
    /// instead of waiting forever.
    pub async fn run(&self) -> Option<Identity> {
        self.gate.begin();
        match self.try_run().await {
            Ok(identity) => identity,
            Err(e) => {
                error!(operation = "bootstrap", status = "error", error = %e, "Bootstrap failed, continuing with local data");
                self.gate.mark_auth_resolved();
                self.gate.mark_data_hydrated();
                self.coordinator.current_identity()
            }
        }
    }

    async fn try_run(&self) -> Result<Option<Identity>, BootstrapError> {
        let identity = self.session.current_identity().await?;
        self.coordinator.switch_identity(identity.clone());
        self.gate.mark_auth_resolved();

        if identity.is_some() {
            if self.migration.has_guest_data() {
                // Signed in without a login transition on this device
                warn!(operation = "bootstrap", "Guest data still pending for this session, migrating it first");
            }
            self.load_account(&MigrationDecision::Migrate).await?;
        } else {
            debug!(operation = "bootstrap", "Guest mode, using local cache as-is");
        }
        self.gate.mark_data_hydrated();
        Ok(identity)
    }

    /// Brings the signed-in account into the local cache. Flagged guest data goes
    /// through the migration, which re-hydrates on its own; otherwise hydrate directly.
    async fn load_account(&self, prompt: &dyn MigrationPrompt) -> Result<usize, SyncError> {
        if self.migration.has_guest_data() {
            Ok(self.migration.migrate_guest_data(prompt).await)
        } else {
            self.coordinator.hydrate_from_remote().await.map(|_| 0)
        }
    }

    /// Applies a login or logout that the session oracle reported.
    ///
    /// Login always ends with the account loaded: flagged guest data is migrated
    /// (or discarded) and the cache re-hydrated, otherwise it hydrates directly.
    /// Logout clears the local cache and re-runs the bootstrap from a reset gate.
    pub async fn handle_identity_change(
        &self,
        identity: Option<Identity>,
        prompt: &dyn MigrationPrompt,
    ) -> IdentityTransition {
        match identity {
            Some(identity) => {
                self.coordinator.switch_identity(Some(identity));
                let migrated = match self.load_account(prompt).await {
                    Ok(migrated) => migrated,
                    Err(e) => {
                        warn!(operation = "login", error = %e, "Failed to hydrate after sign-in");
                        0
                    }
                };
                self.gate.mark_auth_resolved();
                self.gate.mark_data_hydrated();
                IdentityTransition::SignedIn { migrated }
            }
            None => {
                self.coordinator.switch_identity(None);
                self.coordinator.clear();
                self.gate.reset();
                self.run().await;
                info!(operation = "logout", "Local cache cleared after sign-out");
                IdentityTransition::SignedOut
            }
        }
    }

    /// Forwards session identity changes into a channel so they can be handled in async context.
    pub fn follow_session(&self) -> (Subscription, mpsc::UnboundedReceiver<Option<Identity>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.session.on_identity_change(Box::new(move |identity| {
            // The receiver may already be gone during shutdown
            let _ = tx.send(identity.clone());
        }));
        (subscription, rx)
    }
}

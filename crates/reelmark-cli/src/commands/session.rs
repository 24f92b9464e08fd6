use super::prompts::{self, TerminalMigrationPrompt};
use super::{bootstrap, warn_guest_once};
use crate::output::Output;
use color_eyre::Result;
use serde_json::json;
use watchlist_config::{Config, PathManager};
use watchlist_core::{AppContext, HydrateOutcome, IdentityTransition, MigrationDecision, MigrationPrompt};
use watchlist_models::Identity;
use watchlist_remote::StoredSession;

/// How `login` resolves the migration decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationChoice {
    Ask,
    Fixed(MigrationDecision),
}

impl MigrationChoice {
    pub fn from_flags(migrate: bool, discard: bool) -> Self {
        match (migrate, discard) {
            (true, _) => MigrationChoice::Fixed(MigrationDecision::Migrate),
            (false, true) => MigrationChoice::Fixed(MigrationDecision::Discard),
            (false, false) => MigrationChoice::Ask,
        }
    }
}

impl MigrationPrompt for MigrationChoice {
    fn offer_migration(&self, count: usize) -> MigrationDecision {
        match self {
            MigrationChoice::Ask => TerminalMigrationPrompt.offer_migration(count),
            MigrationChoice::Fixed(decision) => *decision,
        }
    }
}

/// Applies identity changes the session fired since `follow_session` was set up.
async fn apply_session_changes(
    context: &AppContext,
    changes: &mut tokio::sync::mpsc::UnboundedReceiver<Option<Identity>>,
    prompt: &dyn MigrationPrompt,
) -> Option<IdentityTransition> {
    let mut last = None;
    while let Ok(change) = changes.try_recv() {
        last = Some(context.bootstrap.handle_identity_change(change, prompt).await);
    }
    last
}

pub async fn run_login(
    config: &Config,
    path_manager: &PathManager,
    user_id: String,
    email: Option<String>,
    token: Option<String>,
    choice: MigrationChoice,
    output: &Output,
) -> Result<()> {
    if !config.is_remote_configured() {
        output.error("No remote store configured");
        output.info("Run 'reelmark config set-remote' first.");
        return Err(color_eyre::eyre::eyre!("Cannot sign in without a remote store"));
    }

    let token = match token {
        Some(token) => token,
        None => prompts::prompt_secret("Access token")?,
    };
    let mut identity = Identity::new(user_id, token);
    if let Some(email) = email {
        identity = identity.with_email(email);
    }

    let (context, session) = bootstrap(config, path_manager).await?;
    let (subscription, mut changes) = context.bootstrap.follow_session();
    session
        .login(identity.clone())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to store session: {}", e))?;
    let transition = apply_session_changes(&context, &mut changes, &choice).await;
    subscription.unsubscribe();

    match transition {
        Some(IdentityTransition::SignedIn { migrated }) => {
            output.success(format!("Signed in as {}", identity));
            if migrated > 0 {
                output.success(format!("Moved {} title(s) from this device into your account", migrated));
            }
            output.json(&json!({
                "user_id": identity.user_id,
                "migrated": migrated,
                "items": context.coordinator.collection().len(),
            }));
        }
        _ => output.warn("Session stored but the sign-in was not applied"),
    }
    Ok(())
}

/// Logs out through the session and applies the transition, which clears the
/// account's local cache and re-runs the bootstrap as a guest.
pub async fn sign_out(context: &AppContext, session: &StoredSession) -> Result<()> {
    let (subscription, mut changes) = context.bootstrap.follow_session();
    let result = session.logout();
    if result.is_ok() {
        apply_session_changes(context, &mut changes, &MigrationDecision::Migrate).await;
    }
    subscription.unsubscribe();
    result.map_err(|e| color_eyre::eyre::eyre!("Failed to clear session: {}", e))
}

pub async fn run_logout(config: &Config, path_manager: &PathManager, output: &Output) -> Result<()> {
    let (context, session) = bootstrap(config, path_manager).await?;
    if !context.coordinator.is_authenticated() {
        output.info("Not signed in");
        return Ok(());
    }

    sign_out(&context, &session).await?;
    output.success("Signed out. The local watchlist copy was cleared.");
    Ok(())
}

pub async fn run_sync(config: &Config, path_manager: &PathManager, output: &Output) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;
    match context.coordinator.hydrate_from_remote().await {
        Ok(HydrateOutcome::Hydrated { items }) => {
            output.success(format!("Local watchlist refreshed from your account ({} items)", items));
            Ok(())
        }
        Ok(HydrateOutcome::Skipped) => {
            output.info("Not signed in, the watchlist on this device is the only copy");
            warn_guest_once(&context, output);
            Ok(())
        }
        Err(e) => {
            output.error(format!("Failed to refresh watchlist: {}", e));
            Err(color_eyre::eyre::eyre!(e))
        }
    }
}

pub mod clear;
pub mod config;
pub mod prompts;
pub mod session;
pub mod watchlist;

use crate::output::Output;
use color_eyre::Result;
use std::sync::Arc;
use watchlist_config::{Config, PathManager};
use watchlist_core::AppContext;
use watchlist_remote::StoredSession;

/// Builds the context and runs the bootstrap sequence, which every command needs
/// before touching the watchlist.
pub async fn bootstrap(config: &Config, path_manager: &PathManager) -> Result<(AppContext, Arc<StoredSession>)> {
    let (context, session) = AppContext::open(config, path_manager)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to open local store: {}", e))?;

    let identity = context.bootstrap.run().await;
    match &identity {
        Some(identity) => tracing::debug!(user_id = %identity.user_id, "Bootstrap finished"),
        None => tracing::debug!("Bootstrap finished in guest mode"),
    }
    Ok((context, session))
}

/// One-time notice that guest data only lives on this device.
pub fn warn_guest_once(context: &AppContext, output: &Output) {
    if context.migration.should_warn_guest() {
        output.warn("You are not signed in. Your watchlist is stored only on this device.");
        output.info("Run 'reelmark login <user-id>' to keep it in your account.");
        context.migration.mark_guest_warning_shown();
    }
}

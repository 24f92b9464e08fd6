use super::bootstrap;
use super::session::sign_out;
use crate::output::Output;
use color_eyre::Result;
use std::fs;
use watchlist_config::{Config, PathManager};

pub async fn run_clear(
    config: &Config,
    path_manager: &PathManager,
    all: bool,
    cache: bool,
    session: bool,
    output: &Output,
) -> Result<()> {
    if !(all || cache || session) {
        output.warn("No clear option specified. Use --cache, --session, or --all");
        output.info("\nExample: reelmark clear --cache");
        return Ok(());
    }

    if all || cache {
        clear_cache(config, path_manager, output).await?;
    }
    if all || session {
        clear_session(config, path_manager, output).await?;
    }
    Ok(())
}

async fn clear_cache(config: &Config, path_manager: &PathManager, output: &Output) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;

    let items = context.coordinator.collection().len();
    context.coordinator.clear();
    context.store.clear_flags();
    output.success(format!(
        "Cleared local watchlist ({} items): {}",
        items,
        path_manager.store_dir().display()
    ));
    if context.coordinator.is_authenticated() {
        output.info("Your account is untouched. Run 'reelmark sync' to restore the local copy.");
    }
    Ok(())
}

/// Signs out through the session before removing the file, so the account's
/// rows never stay behind in a cache that a guest would pick up.
async fn clear_session(config: &Config, path_manager: &PathManager, output: &Output) -> Result<()> {
    let (context, session) = bootstrap(config, path_manager).await?;
    if context.coordinator.is_authenticated() {
        sign_out(&context, &session).await?;
        output.info("Signed out and cleared the account's local copy");
    }

    let session_file = path_manager.session_file();
    if session_file.exists() {
        fs::remove_file(&session_file).map_err(|e| {
            color_eyre::eyre::eyre!("Failed to remove session file at {}: {}", session_file.display(), e)
        })?;
        output.success(format!("Cleared session: {}", session_file.display()));
    } else {
        output.info("No session file found to clear");
    }
    Ok(())
}

use color_eyre::Result;
use dialoguer::{Confirm, Input};
use std::io::IsTerminal;
use watchlist_core::{MigrationDecision, MigrationPrompt};

/// Prompt for a string value with optional default
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input_builder = Input::<String>::new().with_prompt(prompt).allow_empty(true);

    if let Some(default_value) = default {
        input_builder = input_builder.default(default_value.to_string());
    }

    input_builder
        .interact_text()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt for a secret without echoing it
pub fn prompt_secret(prompt: &str) -> Result<String> {
    let value = rpassword::prompt_password(format!("{}: ", prompt))
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read {}: {}", prompt.to_lowercase(), e))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(color_eyre::eyre::eyre!("{} cannot be empty", prompt));
    }
    Ok(value)
}

/// Prompt for yes/no with optional default
pub fn prompt_yes_no(prompt: &str, default: Option<bool>) -> Result<bool> {
    let mut confirm_builder = Confirm::new().with_prompt(prompt);

    if let Some(default_value) = default {
        confirm_builder = confirm_builder.default(default_value);
    }

    confirm_builder
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}

/// Asks on the terminal whether guest titles should move into the account.
///
/// Without a terminal, or when the prompt cannot be read, the titles are migrated
/// so nothing is lost silently.
pub struct TerminalMigrationPrompt;

impl MigrationPrompt for TerminalMigrationPrompt {
    fn offer_migration(&self, count: usize) -> MigrationDecision {
        if !std::io::stdin().is_terminal() {
            tracing::debug!(count = count, "No terminal attached, migrating guest data");
            return MigrationDecision::Migrate;
        }

        let question = format!(
            "{} title(s) were added on this device before signing in. Move them into your account?",
            count
        );
        match prompt_yes_no(&question, Some(true)) {
            Ok(true) => MigrationDecision::Migrate,
            Ok(false) => {
                let confirm = prompt_yes_no("Discard them permanently?", Some(false)).unwrap_or(false);
                if confirm {
                    MigrationDecision::Discard
                } else {
                    MigrationDecision::Migrate
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Migration prompt failed, migrating guest data");
                MigrationDecision::Migrate
            }
        }
    }
}

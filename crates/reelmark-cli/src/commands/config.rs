use super::prompts;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use watchlist_config::{Config, PathManager, RemoteConfig, SessionStore};

pub async fn run_config(cmd: ConfigCommands, path_manager: &PathManager, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, path_manager, output),
        ConfigCommands::SetRemote {
            url,
            api_key,
            table,
            timeout,
        } => set_remote(url, api_key, table, timeout, path_manager, output),
    }
}

fn load_config(path_manager: &PathManager) -> Result<Config> {
    let config_file = path_manager.config_file();
    Config::load_or_default(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

fn show_config(full: bool, path_manager: &PathManager, output: &Output) -> Result<()> {
    let config_file = path_manager.config_file();
    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Running in local-only mode. Use 'reelmark config set-remote' to connect an account store.");
        return Ok(());
    }
    let config = load_config(path_manager)?;

    let mut session = SessionStore::new(path_manager.session_file());
    session
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load session: {}", e))?;
    let identity = session.identity();

    let api_key = config.remote.as_ref().map(|remote| {
        if full {
            remote.api_key.clone()
        } else {
            mask_string(&remote.api_key)
        }
    });

    if !output.is_human() {
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "remote": config.remote.as_ref().map(|remote| json!({
                "url": remote.url,
                "api_key": api_key,
                "table": remote.table,
                "timeout_seconds": remote.timeout_seconds,
            })),
            "logging": {
                "level": config.logging.level,
                "file": config.logging.file.as_ref().map(|f| f.display().to_string()),
            },
            "signed_in_as": identity.as_ref().map(|identity| identity.user_id.clone()),
        }));
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Configuration").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(config_file.display().to_string()),
    ]);
    match &config.remote {
        Some(remote) => {
            let valid = if config.is_remote_configured() {
                "✓".green().to_string()
            } else {
                "✗".red().to_string()
            };
            table.add_row(vec![Cell::new("Remote store"), Cell::new(valid)]);
            table.add_row(vec![Cell::new("URL"), Cell::new(&remote.url)]);
            table.add_row(vec![Cell::new("API key"), Cell::new(api_key.unwrap_or_default())]);
            table.add_row(vec![Cell::new("Table"), Cell::new(&remote.table)]);
            table.add_row(vec![Cell::new("Timeout"), Cell::new(format!("{}s", remote.timeout_seconds))]);
        }
        None => {
            table.add_row(vec![Cell::new("Remote store"), Cell::new("not configured (local only)")]);
        }
    }
    table.add_row(vec![Cell::new("Log level"), Cell::new(&config.logging.level)]);
    if let Some(file) = &config.logging.file {
        table.add_row(vec![Cell::new("Log file"), Cell::new(file.display().to_string())]);
    }
    let signed_in = match (&identity, session.signed_in_at()) {
        (Some(identity), Some(at)) => format!("{} (since {})", identity, at.format("%Y-%m-%d")),
        (Some(identity), None) => identity.to_string(),
        (None, _) => "guest".to_string(),
    };
    table.add_row(vec![Cell::new("Signed in as"), Cell::new(signed_in)]);
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    output.info(table.to_string());
    Ok(())
}

fn set_remote(
    url: Option<String>,
    api_key: Option<String>,
    table: Option<String>,
    timeout: Option<u64>,
    path_manager: &PathManager,
    output: &Output,
) -> Result<()> {
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;
    let mut config = load_config(path_manager)?;
    let existing = config.remote.take();

    let url = match url {
        Some(url) => url,
        None => {
            let default = existing.as_ref().map(|remote| remote.url.as_str());
            prompts::prompt_string("Remote store URL", default)?
        }
    };
    let api_key = match (api_key, &existing) {
        (Some(api_key), _) => api_key,
        (None, Some(remote)) if !remote.api_key.is_empty() => remote.api_key.clone(),
        (None, _) => prompts::prompt_secret("API key")?,
    };

    let mut remote = RemoteConfig::new(url.trim().to_string(), api_key);
    if let Some(existing) = &existing {
        remote.table = existing.table.clone();
        remote.timeout_seconds = existing.timeout_seconds;
    }
    if let Some(table) = table {
        remote.table = table;
    }
    if let Some(timeout) = timeout {
        remote.timeout_seconds = timeout;
    }
    config.remote = Some(remote);

    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid remote configuration: {}", e))?;
    let config_file = path_manager.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))?;

    output.success(format!("Remote store saved to {}", config_file.display()));
    output.info("Run 'reelmark login <user-id>' to sign in.");
    Ok(())
}

fn mask_string(s: &str) -> String {
    if s.is_empty() || s == "YOUR_API_KEY" {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

use super::{bootstrap, warn_guest_once};
use crate::output::Output;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use watchlist_config::{Config, PathManager};
use watchlist_core::{SyncError, SyncOutcome};
use watchlist_models::{ItemKey, Media, MediaKind, WatchItem, WatchStatus};

#[allow(clippy::too_many_arguments)]
pub fn build_item(
    id: i64,
    title: String,
    kind: MediaKind,
    status: WatchStatus,
    year: Option<u32>,
    poster: Option<String>,
    rating: Option<f32>,
    overview: Option<String>,
) -> WatchItem {
    let mut item = match kind {
        MediaKind::Movie => WatchItem::movie(id, title, status),
        MediaKind::Series => WatchItem::series(id, title, status),
    };
    if let Some(year) = year {
        item = item.with_release_year(year);
    }
    if let Some(poster) = poster {
        item = item.with_poster(poster);
    }
    if let Some(rating) = rating {
        item = item.with_rating(rating);
    }
    if let Some(overview) = overview {
        item = item.with_overview(overview);
    }
    item
}

/// Turns a coordinator result into console output. Soft failures are warnings,
/// remote failures abort the command.
fn report(result: Result<SyncOutcome, SyncError>, key: ItemKey, done: &str, output: &Output) -> Result<()> {
    match result {
        Ok(SyncOutcome::Applied) => {
            output.success(format!("{} {}", done, key));
            Ok(())
        }
        Ok(SyncOutcome::Skipped(reason)) => {
            output.warn(format!("{}: {}", key, reason));
            Ok(())
        }
        Err(e) => {
            output.error(format!("{}", e));
            Err(color_eyre::eyre::eyre!(e))
        }
    }
}

pub async fn run_add(config: &Config, path_manager: &PathManager, item: WatchItem, output: &Output) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;
    let key = item.key();
    let title = item.title.clone();
    let result = context.coordinator.add_item(item).await;
    report(result, key, &format!("Added '{}' as", title), output)?;
    warn_guest_once(&context, output);
    Ok(())
}

pub async fn run_remove(config: &Config, path_manager: &PathManager, id: i64, kind: MediaKind, output: &Output) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;
    let key = ItemKey::new(id, kind);
    let result = context.coordinator.remove_item(key).await;
    report(result, key, "Removed", output)
}

pub async fn run_status(
    config: &Config,
    path_manager: &PathManager,
    id: i64,
    kind: MediaKind,
    status: WatchStatus,
    output: &Output,
) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;
    let key = ItemKey::new(id, kind);
    let result = context.coordinator.change_status(key, status).await;
    report(result, key, &format!("Moved to {}:", status.label()), output)
}

pub async fn run_progress(
    config: &Config,
    path_manager: &PathManager,
    id: i64,
    season: u32,
    episode: u32,
    output: &Output,
) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;
    let key = ItemKey::series(id);
    let result = context.coordinator.update_progress(key, season, episode).await;
    report(result, key, "Progress saved for", output)
}

pub async fn run_list(
    config: &Config,
    path_manager: &PathManager,
    status: Option<WatchStatus>,
    output: &Output,
) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;
    let statuses: Vec<WatchStatus> = match status {
        Some(status) => vec![status],
        None => WatchStatus::ALL.to_vec(),
    };

    if !output.is_human() {
        let mut data = serde_json::Map::new();
        for status in &statuses {
            data.insert(status.as_str().to_string(), json!(context.coordinator.query_by_status(*status)));
        }
        output.json(&serde_json::Value::Object(data));
        return Ok(());
    }

    let mut total = 0;
    for status in statuses {
        let items = context.coordinator.query_by_status(status);
        total += items.len();
        if items.is_empty() {
            continue;
        }
        output.info(format!("\n{} ({})", status.label().bright_cyan().bold(), items.len()));
        output.table(&item_table(&items), &json!(items));
    }

    if total == 0 {
        output.info("Your watchlist is empty. Add a title with 'reelmark add <id> <title>'.");
    }
    warn_guest_once(&context, output);
    Ok(())
}

pub async fn run_show(config: &Config, path_manager: &PathManager, id: i64, kind: MediaKind, output: &Output) -> Result<()> {
    let (context, _session) = bootstrap(config, path_manager).await?;
    let key = ItemKey::new(id, kind);
    let collection = context.coordinator.collection();
    let item = match collection.find(&key) {
        Some(item) => item,
        None => {
            output.warn(format!("{} is not in the watchlist", key));
            return Ok(());
        }
    };

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(&item.title).fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(key.to_string()),
    ]);
    table.add_row(vec![Cell::new("Status"), Cell::new(item.status.label())]);
    if let Some(year) = item.release_year {
        table.add_row(vec![Cell::new("Year"), Cell::new(year)]);
    }
    if let Some(rating) = item.rating {
        table.add_row(vec![Cell::new("Rating"), Cell::new(format!("{:.1}", rating))]);
    }
    match &item.media {
        Media::Movie { runtime } => {
            if let Some(runtime) = runtime {
                table.add_row(vec![Cell::new("Runtime"), Cell::new(format!("{} min", runtime))]);
            }
        }
        Media::Series {
            progress,
            season_count,
            episode_count,
        } => {
            let progress = progress.map(|p| p.to_string()).unwrap_or_else(|| "not started".to_string());
            table.add_row(vec![Cell::new("Progress"), Cell::new(progress)]);
            if let Some(seasons) = season_count {
                table.add_row(vec![Cell::new("Seasons"), Cell::new(seasons)]);
            }
            if let Some(episodes) = episode_count {
                table.add_row(vec![Cell::new("Episodes"), Cell::new(episodes)]);
            }
        }
    }
    table.add_row(vec![
        Cell::new("Added"),
        Cell::new(item.added_at.format("%Y-%m-%d %H:%M UTC").to_string()),
    ]);
    if let Some(overview) = &item.overview {
        table.add_row(vec![Cell::new("Overview"), Cell::new(overview)]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    output.table(&table, &json!(item));
    Ok(())
}

fn item_table(items: &[WatchItem]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Kind").add_attribute(Attribute::Bold),
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("Progress").add_attribute(Attribute::Bold),
    ]);
    for item in items {
        table.add_row(vec![
            Cell::new(item.external_id),
            Cell::new(&item.title),
            Cell::new(item.kind().as_str()),
            Cell::new(item.release_year.map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(item.progress().map(|p| p.to_string()).unwrap_or_default()),
        ]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

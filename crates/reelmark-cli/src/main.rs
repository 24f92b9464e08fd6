use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, session, watchlist};
use watchlist_config::{Config, PathManager};
use watchlist_models::{MediaKind, WatchStatus};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "reelmark")]
#[command(about = "Reelmark - A watchlist that works offline and follows you once you sign in")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a movie or series to the watchlist
    #[command(long_about = "Add a title to the watchlist. When signed in the item is written to your account first and only stored locally once the account accepts it.")]
    Add {
        /// TMDB id of the title
        id: i64,

        /// Title to display
        title: String,

        /// Media kind: movie or tv
        #[arg(long, default_value = "movie")]
        kind: MediaKind,

        /// Initial status: want, watching or completed
        #[arg(long, default_value = "want")]
        status: WatchStatus,

        /// Release year
        #[arg(long)]
        year: Option<u32>,

        /// Poster path
        #[arg(long)]
        poster: Option<String>,

        /// Rating shown next to the title
        #[arg(long)]
        rating: Option<f32>,

        /// Short synopsis
        #[arg(long)]
        overview: Option<String>,
    },
    /// Remove a title from the watchlist
    Remove {
        id: i64,

        #[arg(long, default_value = "movie")]
        kind: MediaKind,
    },
    /// Move a title to another status
    Status {
        id: i64,

        /// New status: want, watching or completed
        status: WatchStatus,

        #[arg(long, default_value = "movie")]
        kind: MediaKind,
    },
    /// Record season/episode progress for a series
    Progress {
        id: i64,
        season: u32,
        episode: u32,
    },
    /// List the watchlist, optionally a single status
    List {
        #[arg(long)]
        status: Option<WatchStatus>,
    },
    /// Show one title
    Show {
        id: i64,

        #[arg(long, default_value = "movie")]
        kind: MediaKind,
    },
    /// Refresh the local copy from your account
    Sync,
    /// Sign in and bring local data into the account
    #[command(long_about = "Store a session for the given account. If titles were added on this device before signing in you will be asked whether to move them into the account or discard them.")]
    Login {
        /// Account user id
        user_id: String,

        /// Account email
        #[arg(long)]
        email: Option<String>,

        /// Access token (if not provided, will prompt)
        #[arg(long)]
        token: Option<String>,

        /// Move local titles into the account without asking
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "discard")]
        migrate: bool,

        /// Discard local titles without asking
        #[arg(long, action = ArgAction::SetTrue)]
        discard: bool,
    },
    /// Sign out and clear the local copy
    Logout,
    /// Clear local data
    #[command(long_about = "Clear the local watchlist copy, the stored session, or both. Clearing the local copy does not touch your account. Clearing the session signs out first, which also drops the account's local copy.")]
    Clear {
        /// Clear the local watchlist and the session
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,

        /// Clear the local watchlist copy
        #[arg(long, action = ArgAction::SetTrue)]
        cache: bool,

        /// Sign out and remove the stored session
        #[arg(long, action = ArgAction::SetTrue)]
        session: bool,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks the API key)
    Show {
        /// Show the API key unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Configure the remote store
    #[command(long_about = "Point Reelmark at a PostgREST-compatible database. Without a remote store the watchlist stays on this device.")]
    SetRemote {
        /// Base URL, e.g. https://project.supabase.co
        #[arg(long)]
        url: Option<String>,

        /// API key (if not provided, will prompt)
        #[arg(long)]
        api_key: Option<String>,

        /// Table holding watchlist rows
        #[arg(long)]
        table: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let path_manager = PathManager::default();
    let app_config = Config::load_or_default(&path_manager.config_file())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load configuration: {}", e))?;

    logging::init_logging_with_file(cli.verbose, cli.quiet, &app_config.logging)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Add {
            id,
            title,
            kind,
            status,
            year,
            poster,
            rating,
            overview,
        } => {
            let item = watchlist::build_item(id, title, kind, status, year, poster, rating, overview);
            watchlist::run_add(&app_config, &path_manager, item, &output).await
        }
        Commands::Remove { id, kind } => watchlist::run_remove(&app_config, &path_manager, id, kind, &output).await,
        Commands::Status { id, status, kind } => {
            watchlist::run_status(&app_config, &path_manager, id, kind, status, &output).await
        }
        Commands::Progress { id, season, episode } => {
            watchlist::run_progress(&app_config, &path_manager, id, season, episode, &output).await
        }
        Commands::List { status } => watchlist::run_list(&app_config, &path_manager, status, &output).await,
        Commands::Show { id, kind } => watchlist::run_show(&app_config, &path_manager, id, kind, &output).await,
        Commands::Sync => session::run_sync(&app_config, &path_manager, &output).await,
        Commands::Login {
            user_id,
            email,
            token,
            migrate,
            discard,
        } => {
            let choice = session::MigrationChoice::from_flags(migrate, discard);
            session::run_login(&app_config, &path_manager, user_id, email, token, choice, &output).await
        }
        Commands::Logout => session::run_logout(&app_config, &path_manager, &output).await,
        Commands::Clear { all, cache, session } => {
            clear::run_clear(&app_config, &path_manager, all, cache, session, &output).await
        }
        Commands::Config { cmd } => config::run_config(cmd, &path_manager, &output).await,
    }
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use vitaquest::config::Config;
use vitaquest::db::GameDb;
use vitaquest::seed;
use vitaquest::server::{self, ApiState};

#[derive(Parser)]
#[command(name = "vitaquest")]
#[command(about = "VitaQuest - gamified wellness challenge engine")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.vitaquest/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Write a starter config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Load the challenge and achievement catalogs, optionally creating a user
    Seed {
        /// Username to create (prints its API token)
        #[arg(long)]
        user: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Init { force }) => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(Config::default_config_path);
            Config::write_default(&path, force)?;
            println!("Wrote config to {}", path.display());
        }
        Some(Commands::Seed { user }) => {
            let db = open_db(&config)?;
            let (challenges, achievements) = seed::seed_catalog(&db)?;
            info!(
                "[vitaquest] seeded {} challenges, {} achievements",
                challenges, achievements
            );
            if let Some(username) = user {
                let token = seed::ensure_user(&db, &username)?;
                println!("User '{username}' token: {token}");
            }
        }
        Some(Commands::Serve) | None => {
            let db = open_db(&config)?;
            let state = ApiState::new(&config, db);
            server::run(&config, state)?;
        }
    }

    Ok(())
}

fn open_db(config: &Config) -> Result<GameDb> {
    GameDb::open(&config.database_path())
}

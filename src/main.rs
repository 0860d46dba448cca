//! # Facility Registry CLI (`registry`)
//!
//! ## Usage
//!
//! ```bash
//! registry --config ./config/registry.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `registry init` | Create the SQLite database and run schema migrations |
//! | `registry serve` | Start the JSON HTTP API |
//! | `registry index-settings` | Print the search-index analyzer settings |
//! | `registry stats` | Print per-table record counts |
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use facility_registry::{config, migrate, search, server, stats};

/// Facility Registry: health-facility, community health unit and
/// administrative geography registry.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "registry",
    about = "Facility Registry: health facilities, community health units and approvals over a JSON API",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/registry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all registry tables. Running it
    /// again is safe.
    Init,

    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind` and serves every registry resource.
    Serve,

    /// Print the search-index analyzer settings as JSON.
    IndexSettings,

    /// Show record counts per table.
    Stats,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::IndexSettings => {
            search::print_index_settings(&cfg.search)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

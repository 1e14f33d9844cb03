//! Command-line interface for the LockHub backend.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lockhub_api::ServerState;
use lockhub_core::config;
use lockhub_storage::Database;

/// LockHub - store-and-forward backend for doorlock devices.
#[derive(Parser, Debug)]
#[command(name = "lockhub")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Database file path (overrides LOCKHUB_DATABASE_PATH).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web server.
    Serve {
        /// Host to bind to.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Open the database and apply pending migrations, then exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let database_path = args
        .database
        .unwrap_or_else(|| PathBuf::from(config::database_path()));

    match args.command {
        Command::Serve { host, port } => {
            let db = Database::open(&database_path).await?;

            let api_key = config::api_key();
            if api_key.is_none() {
                tracing::warn!("no API key configured; authentication is disabled");
            }

            let host = host.unwrap_or_else(config::host);
            let port = port.unwrap_or_else(config::port);
            let bind: SocketAddr = format!("{}:{}", host, port).parse()?;

            let state = ServerState::new(db, api_key);
            lockhub_api::run(bind, state).await
        }
        Command::Migrate => {
            // Migrations run as part of open.
            Database::open(&database_path).await?;
            tracing::info!(path = %database_path.display(), "migrations applied");
            Ok(())
        }
    }
}

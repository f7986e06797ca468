// ABOUTME: prdsmith command-line entry point
// ABOUTME: Parses arguments, initializes logging and starts the HTTP server

use clap::{Parser, Subcommand};
use prdsmith_cli::config::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prdsmith")]
#[command(about = "Turn product ideas into PRDs, diagrams and exportable documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
        /// SQLite database URL or path (overrides DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,prdsmith=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, database_url } => {
            let mut config = Config::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(database_url) = database_url {
                config.database_url = database_url;
            }
            prdsmith_cli::run_server(config).await
        }
    }
}

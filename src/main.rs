use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod core;
mod daemon;
mod ingest;
mod remote;

#[derive(Parser)]
#[command(name = "criteria-relay")]
#[command(author, version, about = "Criteria ingest and polling relay for a downstream rule evaluator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay daemon
    Daemon,

    /// Submit a criteria batch to the running daemon
    Submit {
        /// Read the JSON batch from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,

        /// Daemon base URL (defaults to the configured ingest address)
        #[arg(long)]
        url: Option<String>,
    },

    /// Show the daemon's polling status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Daemon base URL (defaults to the configured ingest address)
        #[arg(long)]
        url: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => {
            init_logging();
            daemon::run().await
        }
        Commands::Submit { file, url } => {
            init_logging();
            cli::submit::run(file, url).await
        }
        Commands::Status { json, url } => {
            init_logging();
            cli::status::run(json, url).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

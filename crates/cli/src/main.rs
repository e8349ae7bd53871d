//! Swarm Autoscaler CLI
//!
//! A command-line tool for inspecting the autoscaler daemon: overall
//! health and the per-service decisions of the last evaluation cycle.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{decisions, status};

/// Swarm Autoscaler CLI
#[derive(Parser)]
#[command(name = "sasctl")]
#[command(author, version, about = "CLI for the Swarm Autoscaler daemon", long_about = None)]
pub struct Cli {
    /// Daemon API URL (can also be set via SASCTL_API_URL env var)
    #[arg(long, env = "SASCTL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show daemon health and readiness
    Status,

    /// Show the last cycle's per-service scaling decisions
    Decisions,
}

async fn run(cli: Cli) -> Result<()> {
    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Status => status::show_status(&client, cli.format).await,
        Commands::Decisions => decisions::show_decisions(&client, cli.format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

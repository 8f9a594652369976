//! Siteline CLI - Inspect and drive the offline sync engine
//!
//! Field-device tooling: check sync state, force a cycle, watch in the
//! background, and inspect the queue, conflict log, and photo store.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_data_dir;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("siteline=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir);

    match cli.command {
        Commands::Status { json } => commands::status::run_status(json, &data_dir).await?,
        Commands::Sync => commands::sync::run_sync(&data_dir).await?,
        Commands::Watch => commands::watch::run_watch(&data_dir).await?,
        Commands::Queue { json } => commands::queue::run_queue(json, &data_dir).await?,
        Commands::Conflicts { limit, json } => {
            commands::conflicts::run_conflicts(limit, json, &data_dir).await?;
        }
        Commands::Images { status, json } => {
            commands::images::run_images(status, json, &data_dir).await?;
        }
        Commands::Purge { images_older_than } => {
            commands::purge::run_purge(images_older_than, &data_dir).await?;
        }
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

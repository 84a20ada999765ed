//! Till CLI - offline-first point of sale from the terminal
//!
//! Records are written to the local store first and reach the backend on
//! `till sync`.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::common::Context;
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

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "till=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = Context::new(cli.db_path, cli.api_url, cli.user);

    match cli.command {
        Commands::Put { entity, json } => {
            commands::put::run_put(entity.into(), json.as_deref(), &context).await?;
        }
        Commands::List { entity, json } => {
            commands::list::run_list(entity.into(), json, &context).await?;
        }
        Commands::Delete { entity, id } => {
            commands::delete::run_delete(entity.into(), &id, &context).await?;
        }
        Commands::Pending { json } => commands::pending::run_pending(json, &context).await?,
        Commands::Sync { command: None } => commands::sync::run_sync(&context).await?,
        Commands::Sync {
            command: Some(SyncCommands::Conflicts { limit, json }),
        } => commands::sync::run_sync_conflicts(limit, json, &context).await?,
        Commands::Search {
            entity,
            filters,
            json,
        } => commands::search::run_search(entity.into(), &filters, json, &context).await?,
        Commands::Owner => commands::owner::run_owner(&context).await?,
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

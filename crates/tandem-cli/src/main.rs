//! tandem CLI - offline-first todo list
//!
//! Edits land in the local database and queue up; `push`, `pull` and
//! `refresh` talk to the remote table.

mod cli;
mod commands;
mod error;
mod gateway;
mod reporter;


use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::resolve_db_path;
use crate::commands::complete::run_complete;
use crate::commands::completions::run_completions;
use crate::commands::conflicts::run_conflicts;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::queue::run_queue;
use crate::commands::sync::{run_pull, run_push, run_refresh};
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
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tandem=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = || resolve_db_path(cli.db_path.clone());

    match cli.command {
        Some(Commands::Add { text }) => run_add(&text, &db_path()?).await?,
        Some(Commands::List {
            limit,
            pending,
            json,
        }) => run_list(limit, pending, json, &db_path()?).await?,
        Some(Commands::Edit { id, text }) => run_edit(&id, &text, &db_path()?).await?,
        Some(Commands::Complete { id, undo }) => run_complete(&id, !undo, &db_path()?).await?,
        Some(Commands::Delete { id }) => run_delete(&id, &db_path()?).await?,
        Some(Commands::Push { resolve }) => run_push(resolve, &db_path()?).await?,
        Some(Commands::Pull { filter }) => run_pull(filter, &db_path()?).await?,
        Some(Commands::Refresh { resolve, filter }) => {
            run_refresh(resolve, filter, &db_path()?).await?;
        }
        Some(Commands::Queue { json }) => run_queue(json, &db_path()?).await?,
        Some(Commands::Conflicts { limit, json }) => {
            run_conflicts(limit, json, &db_path()?).await?;
        }
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            // Quick add: tandem "buy milk"
            if cli.text.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.text, &db_path()?).await?;
            }
        }
    }

    Ok(())
}

use std::env;
use std::path::Path;

use tandem_core::db::{Database, LibSqlOperationQueue};
use tandem_core::sync::{PushSummary, SyncOrchestrator, SyncSession};
use tandem_core::transport::{HttpTransport, PullQuery};
use tandem_core::util::normalize_text_option;
use tandem_core::TodoItem;

use crate::cli::ResolveStrategy;
use crate::commands::common::{default_config_path, load_sync_config, open_database};
use crate::error::CliError;
use crate::gateway::CliGateway;
use crate::reporter::ConsoleReporter;

type CliOrchestrator =
    SyncOrchestrator<HttpTransport<TodoItem>, LibSqlOperationQueue, CliGateway, ConsoleReporter>;

fn build_orchestrator(
    db: &Database,
    strategy: ResolveStrategy,
) -> Result<CliOrchestrator, CliError> {
    let config_path = default_config_path()?;
    let config = load_sync_config(&config_path, |key| env::var(key).ok())?;
    tracing::debug!("Syncing with {:?}", config.remote_url);

    let transport = HttpTransport::new(&config)?;
    let queue = LibSqlOperationQueue::new(db.connection().clone());
    Ok(SyncOrchestrator::new(
        SyncSession::new(transport, queue),
        CliGateway::for_strategy(strategy),
        ConsoleReporter,
    ))
}

pub fn pull_query(filter: Option<String>) -> PullQuery {
    normalize_text_option(filter).map_or_else(PullQuery::all, PullQuery::filtered)
}

pub fn format_failed_resolutions(summary: &PushSummary) -> Vec<String> {
    summary
        .failed
        .iter()
        .map(|failed| format!("Left queued: {} ({})", failed.record_id, failed.reason))
        .collect()
}

fn print_failed_resolutions(summary: &PushSummary) {
    for line in format_failed_resolutions(summary) {
        eprintln!("{line}");
    }
}

pub async fn run_push(strategy: ResolveStrategy, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let sync = build_orchestrator(&db, strategy)?;

    let summary = sync.push().await?;
    print_failed_resolutions(&summary);
    Ok(())
}

pub async fn run_pull(filter: Option<String>, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    // Pull never needs a decision.
    let sync = build_orchestrator(&db, ResolveStrategy::Skip)?;

    let merged = sync.pull(&pull_query(filter)).await?;
    println!("Pulled {merged} item(s)");
    Ok(())
}

pub async fn run_refresh(
    strategy: ResolveStrategy,
    filter: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let sync = build_orchestrator(&db, strategy)?;

    let summary = sync.refresh(&pull_query(filter)).await?;
    print_failed_resolutions(&summary.push);
    println!("Pulled {} item(s)", summary.pulled);
    Ok(())
}

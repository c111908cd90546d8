use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tandem_core::config::SyncConfig;
use tandem_core::db::{Database, LibSqlTodoRepository, TodoRepository};
use tandem_core::models::SyncConflict;
use tandem_core::{ItemId, PendingOperation, TodoItem};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";
const DB_PATH_ENV: &str = "TANDEM_DB_PATH";

#[derive(Debug, Serialize)]
pub struct TodoListItem {
    pub id: String,
    pub text: String,
    pub complete: bool,
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub position: i64,
    pub kind: String,
    pub id: String,
    pub preview: String,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub record_id: String,
    pub kind: String,
    pub status: String,
    pub resolution: String,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
}

pub async fn list_items(
    limit: usize,
    pending_only: bool,
    db_path: &Path,
) -> Result<Vec<TodoItem>, CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlTodoRepository::new(db.connection());
    let items = if pending_only {
        repo.list_pending(limit).await?
    } else {
        repo.list(limit).await?
    };
    Ok(items)
}

/// Find an item by exact id, then by unique id prefix
pub async fn resolve_item(query: &str, db: &Database) -> Result<TodoItem, CliError> {
    let repo = LibSqlTodoRepository::new(db.connection());

    if let Ok(item_id) = query.parse::<ItemId>() {
        if let Some(item) = repo.get(&item_id).await? {
            return Ok(item);
        }
    }

    let mut rows = db
        .connection()
        .query(
            "SELECT id
             FROM todo_items
             WHERE substr(id, 1, length(?)) = ?
             ORDER BY updated_at DESC
             LIMIT ?",
            libsql::params![query, query, 3i64],
        )
        .await?;

    let mut matching_ids = Vec::new();
    while let Some(row) = rows.next().await? {
        let id: String = row.get(0)?;
        matching_ids.push(id);
    }

    match matching_ids.len() {
        0 => Err(CliError::ItemNotFound(query.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<ItemId>()
                .map_err(|_| CliError::ItemNotFound(query.to_string()))?;
            repo.get(&resolved_id)
                .await?
                .ok_or_else(|| CliError::ItemNotFound(query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousItemId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_item_lines(items: &[TodoItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let mark = if item.complete { "x" } else { " " };
            let synced = if item.version.is_some() { "" } else { "  (local)" };
            format!(
                "[{mark}] {:<13}  {}{synced}",
                short_id(item.id.as_str()),
                item_preview(&item.text, 60)
            )
        })
        .collect()
}

pub fn item_to_list_item(item: &TodoItem) -> TodoListItem {
    TodoListItem {
        id: item.id.to_string(),
        text: item.text.clone(),
        complete: item.complete,
        version: item.version.clone(),
    }
}

pub fn operation_to_queue_item(operation: &PendingOperation<TodoItem>) -> QueueItem {
    QueueItem {
        position: operation.position,
        kind: operation.kind.to_string(),
        id: operation.record_id().to_string(),
        preview: item_preview(&operation.record.text, 60),
    }
}

pub fn format_queue_lines(operations: &[PendingOperation<TodoItem>]) -> Vec<String> {
    operations
        .iter()
        .map(|operation| {
            format!(
                "{:>4}  {:<6}  {:<13}  {}",
                operation.position,
                operation.kind,
                short_id(operation.record_id()),
                item_preview(&operation.record.text, 50)
            )
        })
        .collect()
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        record_id: conflict.record_id.clone(),
        kind: conflict.kind.clone(),
        status: conflict.status.clone(),
        resolution: conflict.resolution.clone(),
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<11}  {} {}  item={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.resolution,
                conflict.kind,
                conflict.status,
                conflict.record_id
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn item_preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn resolve_item_text(text_parts: &[String]) -> Result<String, CliError> {
    if let Some(text) = normalize_content(&text_parts.join(" ")) {
        return Ok(text);
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }

    if let Some(text) = capture_editor_input_with_initial("")? {
        return Ok(text);
    }

    Err(CliError::EmptyText)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_item_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyItemId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_item_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // EDITOR may carry arguments, e.g. `code --wait`
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };
            let status = Command::new(program).args(parts).arg(file_path).status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_item_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("tandem-item-{}-{now}.txt", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("tandem").join("tandem.db"))
        .ok_or_else(|| CliError::Config("failed to resolve data directory".into()))
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("tandem").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve config directory".into()))
}

/// Sync config from `path`, overridden by `lookup` (normally the environment)
pub fn load_sync_config(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SyncConfig, CliError> {
    let config = SyncConfig::load_from_path(path)?.with_overrides(lookup);
    if !config.is_configured() {
        return Err(CliError::SyncNotConfigured(path.display().to_string()));
    }
    Ok(config)
}

pub async fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path).await?)
}

use std::path::Path;

use tandem_core::db::{LibSqlTodoRepository, TodoRepository};

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_content, normalize_item_identifier,
    open_database, resolve_item,
};
use crate::error::CliError;

pub async fn run_edit(id: &str, text_parts: &[String], db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_item_identifier(id)?;
    let db = open_database(db_path).await?;
    let item = resolve_item(&normalized_id, &db).await?;

    let edited = match normalize_content(&text_parts.join(" ")) {
        Some(text) => text,
        None => capture_editor_input_with_initial(&item.text)?.ok_or(CliError::EmptyText)?,
    };

    if edited == item.text {
        println!("{}", item.id);
        return Ok(());
    }

    let repo = LibSqlTodoRepository::new(db.connection());
    let updated = repo.update_text(&item.id, &edited).await?;
    println!("{}", updated.id);
    Ok(())
}

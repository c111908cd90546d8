use std::path::Path;

use tandem_core::db::{LibSqlTodoRepository, TodoRepository};

use crate::commands::common::{open_database, resolve_item_text};
use crate::error::CliError;

pub async fn run_add(text_parts: &[String], db_path: &Path) -> Result<(), CliError> {
    let text = resolve_item_text(text_parts)?;

    let db = open_database(db_path).await?;
    let repo = LibSqlTodoRepository::new(db.connection());
    let item = repo.create(&text).await?;

    println!("{}", item.id);
    Ok(())
}

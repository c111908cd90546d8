use std::path::Path;

use tandem_core::db::{LibSqlTodoRepository, TodoRepository};

use crate::commands::common::{normalize_item_identifier, open_database, resolve_item};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_item_identifier(id)?;
    let db = open_database(db_path).await?;
    let repo = LibSqlTodoRepository::new(db.connection());
    let item = resolve_item(&normalized_id, &db).await?;

    repo.delete(&item.id).await?;
    println!("{}", item.id);
    Ok(())
}

use std::path::Path;

use tandem_core::db::{LibSqlTodoRepository, TodoRepository};

use crate::commands::common::{normalize_item_identifier, open_database, resolve_item};
use crate::error::CliError;

pub async fn run_complete(id: &str, complete: bool, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_item_identifier(id)?;
    let db = open_database(db_path).await?;
    let item = resolve_item(&normalized_id, &db).await?;

    if item.complete != complete {
        let repo = LibSqlTodoRepository::new(db.connection());
        repo.set_complete(&item.id, complete).await?;
    }
    println!("{}", item.id);
    Ok(())
}

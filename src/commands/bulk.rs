use std::path::Path;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{BoardSession, print_json};
use crate::config::Config;
use crate::error::Result;
use crate::tree::{RowKey, TreeScope, TreeView};
use crate::types::Id;

/// Set the status of the selected story rows. Non-story keys are accepted
/// and ignored.
pub async fn cmd_bulk_status(
    board_path: &Path,
    project: Id,
    sprint: Option<Id>,
    status: &str,
    keys: &[RowKey],
    json: bool,
) -> Result<()> {
    let config = Config::load()?;
    let board = BoardSession::open(board_path)?;
    let scope = TreeScope::project(project, config.page_size).with_sprint(sprint);
    let mut view = TreeView::new(board.client.clone(), scope);
    view.refresh().await;

    for key in keys {
        if view.tree().find(key).is_none() {
            eprintln!("{} {key} is not on this page", "skipping:".yellow());
            continue;
        }
        view.select(*key);
    }

    let outcome = view.bulk_set_status(status).await?;
    if outcome.success_count() > 0 {
        board.save(board_path)?;
    }

    if json {
        return print_json(&json!({
            "succeeded": outcome.succeeded,
            "failed": outcome.failed.iter().map(|(id, e)| json!({"id": id, "error": e})).collect::<Vec<_>>(),
        }));
    }
    println!(
        "{} updated, {} failed",
        outcome.success_count().to_string().green(),
        outcome.failure_count().to_string().red()
    );
    for (id, error) in &outcome.failed {
        println!("  requirement {id}: {error}");
    }
    Ok(())
}

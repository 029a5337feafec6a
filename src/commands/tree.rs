use std::path::PathBuf;

use owo_colors::OwoColorize;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{BoardSession, print_json};
use crate::config::Config;
use crate::display::{format_field, format_priority_colored, format_status_colored, format_tree_title};
use crate::error::Result;
use crate::tree::{RowKey, TreeRow, TreeScope, TreeView};
use crate::types::Id;

pub struct TreeOptions {
    pub board: PathBuf,
    pub project: Id,
    pub sprint: Option<Id>,
    pub category: Option<Id>,
    pub search: Option<String>,
    pub page: u32,
    pub expand: Vec<RowKey>,
    pub expand_all: bool,
    pub json: bool,
}

#[derive(Tabled)]
struct TreeTableRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Children")]
    children: String,
}

impl From<&TreeRow> for TreeTableRow {
    fn from(row: &TreeRow) -> Self {
        let field = |name: &str| row.record.get_field(name);
        Self {
            key: row.key.to_string(),
            number: row.record.number().to_string(),
            title: format_tree_title(row),
            status: field("status")
                .and_then(|v| v.as_choice().map(format_status_colored))
                .unwrap_or_default(),
            priority: field("priority")
                .and_then(|v| v.as_choice().map(format_priority_colored))
                .unwrap_or_default(),
            assignee: format_field(field("assignee").as_ref()),
            children: if row.has_children {
                format!(
                    "{} ({}t/{}b)",
                    row.counts.children_count, row.counts.tasks_count, row.counts.bugs_count
                )
            } else {
                String::new()
            },
        }
    }
}

/// Render the requirement tree of a project.
pub async fn cmd_tree(options: TreeOptions) -> Result<()> {
    let config = Config::load()?;
    let board = BoardSession::open(&options.board)?;
    board.session.remember_project(options.project);

    let scope = TreeScope {
        project_id: options.project,
        sprint_id: options.sprint,
        category_id: options.category,
        search: options.search,
        page: options.page.max(1),
        page_size: config.page_size,
    };
    let mut view = TreeView::new(board.client.clone(), scope);
    let report = view.refresh().await;
    for (kind, message) in &report.failures {
        eprintln!("{} {kind} collection unavailable: {message}", "warning:".yellow());
    }

    if options.expand_all {
        view.toggle_expand_all();
    }
    for key in options.expand {
        view.expand(key);
    }
    let rows = view.rows();

    if options.json {
        return print_json(&json!({
            "total": view.total(),
            "page": view.scope().page,
            "page_size": view.scope().page_size,
            "rows": rows.iter().map(|r| json!({
                "key": r.key,
                "level": r.level,
                "number": r.record.number(),
                "title": r.record.title(),
                "counts": r.counts,
                "expanded": r.expanded,
            })).collect::<Vec<_>>(),
        }));
    }

    if rows.is_empty() {
        println!("No requirements found.");
        return Ok(());
    }
    let table_rows: Vec<TreeTableRow> = rows.iter().map(TreeTableRow::from).collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    let scope = view.scope();
    let pages = view.total().div_ceil(scope.page_size.max(1) as usize).max(1);
    println!("\n{} requirement(s), page {}/{pages}", view.total(), scope.page);
    Ok(())
}

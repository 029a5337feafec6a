use std::path::Path;

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{BoardSession, print_json};
use crate::config::Config;
use crate::display::{format_field, format_status_colored, format_tabs, kind_label};
use crate::error::Result;
use crate::panel::{DetailPanel, TabData, TabState};
use crate::registry::schema;
use crate::store::RemoteStore;
use crate::tree::category_path;
use crate::types::{EntityKind, Id};

#[derive(Tabled)]
struct RelatedRow {
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Who")]
    who: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Change")]
    change: String,
}

/// Show one entity the way the detail panel presents it.
pub async fn cmd_show(board: &Path, kind: EntityKind, id: Id, tab: Option<&str>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let board = BoardSession::open(board)?;
    let panel = DetailPanel::new(board.client.clone(), config.panel);

    panel.open(kind, id).await?;
    panel.load_badges().await?;
    if let Some(tab) = tab {
        panel.select_tab(tab).await?;
    }
    let view = panel.view()?;

    if json {
        return print_json(&view);
    }

    let status = view
        .fields
        .get("status")
        .and_then(|v| v.as_choice())
        .map(format_status_colored)
        .unwrap_or_default();
    println!(
        "{} {} {} {}",
        kind_label(kind).bold(),
        view.number.as_deref().unwrap_or("").cyan(),
        status,
        view.title.as_deref().unwrap_or("")
    );
    println!("{}\n", format_tabs(&view.tabs, view.active_tab));

    match panel.tab(view.active_tab) {
        TabState::Loaded(TabData::Records(records)) if records.is_empty() => {
            println!("Nothing linked.");
        }
        TabState::Loaded(TabData::Records(records)) => {
            let rows: Vec<RelatedRow> = records
                .iter()
                .map(|r| RelatedRow {
                    number: r.number().to_string(),
                    title: r.title().to_string(),
                    status: format_field(r.get_field("status").as_ref()),
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        TabState::Loaded(TabData::History(entries)) => {
            let rows: Vec<HistoryRow> = entries
                .iter()
                .map(|e| HistoryRow {
                    when: e.changed_at.strftime("%Y-%m-%d %H:%M").to_string(),
                    who: e.changed_by.clone(),
                    field: e.field.clone(),
                    change: format!(
                        "{} -> {}",
                        e.old_value.as_deref().unwrap_or("-"),
                        e.new_value.as_deref().unwrap_or("-")
                    ),
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        TabState::Failed(message) => eprintln!("{} {message}", "tab unavailable:".red()),
        TabState::NotLoaded | TabState::Loaded(TabData::Detail) => {
            let category = match view.fields.get("category").and_then(|v| v.as_ref_id()) {
                Some(category_id) => {
                    let project_id = panel.record().map(|r| r.project_id()).unwrap_or_default();
                    let categories = board.store.fetch_categories(project_id).await?;
                    Some(category_path(&categories, category_id).join(" / "))
                }
                None => None,
            };
            for spec in schema(kind).fields {
                let value = match (&category, spec.name) {
                    (Some(path), "category") if !path.is_empty() => path.clone(),
                    _ => format_field(view.fields.get(spec.name)),
                };
                println!("{:>16}  {}", spec.label.dimmed(), value);
            }
        }
    }
    Ok(())
}

use owo_colors::OwoColorize;

use crate::entity::FieldValue;
use crate::panel::{Badge, TabView};
use crate::tree::TreeRow;
use crate::types::EntityKind;

/// Status badge coloured by how far along the lifecycle it is.
pub fn format_status_colored(status: &str) -> String {
    let badge = format!("[{status}]");
    match status {
        "draft" | "new" | "todo" | "not_executed" | "planning" => badge.yellow().to_string(),
        "approved" | "confirmed" | "reopened" => badge.magenta().to_string(),
        "in_progress" | "active" => badge.cyan().to_string(),
        "completed" | "done" | "resolved" | "closed" | "passed" => badge.green().to_string(),
        "failed" => badge.red().to_string(),
        "cancelled" => badge.dimmed().to_string(),
        _ => badge,
    }
}

pub fn format_priority_colored(priority: &str) -> String {
    match priority {
        "critical" | "high" => priority.red().to_string(),
        "medium" => priority.yellow().to_string(),
        _ => priority.to_string(),
    }
}

/// Row title with indentation and an expand marker.
pub fn format_tree_title(row: &TreeRow) -> String {
    let marker = match (row.has_children, row.expanded) {
        (false, _) => " ",
        (true, false) => "▸",
        (true, true) => "▾",
    };
    format!("{}{marker} {}", "  ".repeat(row.level), row.record.title())
}

pub fn format_field(value: Option<&FieldValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Tab strip, e.g. `Detail | Tasks (2) | Defects (?)`.
pub fn format_tabs(tabs: &[TabView], active: &str) -> String {
    tabs.iter()
        .map(|tab| {
            let label = match &tab.badge {
                Some(Badge::Count(n)) if *n > 0 => format!("{} ({n})", tab.label),
                Some(Badge::Failed) => format!("{} (?)", tab.label),
                _ => tab.label.to_string(),
            };
            if tab.key == active {
                label.bold().underline().to_string()
            } else {
                label
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn kind_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Requirement => "Requirement",
        EntityKind::Task => "Task",
        EntityKind::Defect => "Defect",
        EntityKind::TestCase => "Test case",
        EntityKind::Sprint => "Sprint",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_is_plain() {
        assert_eq!(format_status_colored("weird"), "[weird]");
    }

    #[test]
    fn test_format_field_empty() {
        assert_eq!(format_field(None), "-");
        assert_eq!(format_field(Some(&FieldValue::Ref(None))), "-");
    }

    #[test]
    fn test_tabs_hide_zero_badges() {
        let tabs = vec![
            TabView {
                key: "detail",
                label: "Detail",
                badge: None,
            },
            TabView {
                key: "tasks",
                label: "Tasks",
                badge: Some(Badge::Count(0)),
            },
            TabView {
                key: "defects",
                label: "Defects",
                badge: Some(Badge::Count(3)),
            },
        ];
        let strip = format_tabs(&tabs, "none");
        assert_eq!(strip, "Detail | Tasks | Defects (3)");
    }
}

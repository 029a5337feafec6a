//! Pointer interaction routing for the tree table.

use crate::tree::RowKey;

/// Result from handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleResult {
    /// Event was handled, stop processing
    Handled,
    /// Event was not handled, continue to next handler
    #[default]
    NotHandled,
}

impl HandleResult {
    pub fn is_handled(self) -> bool {
        matches!(self, HandleResult::Handled)
    }
}

/// What a click inside the tree table landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// The row body; opens the detail panel.
    Row(RowKey),
    /// The row's selection checkbox.
    Checkbox(RowKey),
    /// The expand/collapse affordance.
    Expander(RowKey),
    /// An inline editor cell inside the row.
    Cell { key: RowKey, field: String },
}

impl ClickTarget {
    pub fn key(&self) -> RowKey {
        match self {
            ClickTarget::Row(key)
            | ClickTarget::Checkbox(key)
            | ClickTarget::Expander(key)
            | ClickTarget::Cell { key, .. } => *key,
        }
    }
}

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{DeskError, Result};
use crate::types::Id;

use super::row::{RowKey, RowKind};

/// Row selection across kinds. Only story rows are eligible for bulk
/// operations; other selected rows are carried but ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSelection(BTreeSet<RowKey>);

impl BulkSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, key: RowKey) -> bool {
        if self.0.remove(&key) {
            false
        } else {
            self.0.insert(key);
            true
        }
    }

    pub fn select(&mut self, key: RowKey) {
        self.0.insert(key);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &BTreeSet<RowKey> {
        &self.0
    }

    /// Drop keys that no longer exist after a refetch.
    pub fn retain_existing(&mut self, existing: &BTreeSet<RowKey>) {
        self.0.retain(|k| existing.contains(k));
    }

    /// Ids of the selected story rows, ascending.
    pub fn eligible_ids(&self) -> Vec<Id> {
        self.0
            .iter()
            .filter(|k| k.kind == RowKind::Story)
            .map(|k| k.id)
            .collect()
    }

    /// Like [`eligible_ids`](Self::eligible_ids), but an empty result is a
    /// "nothing selected" error.
    pub fn require_eligible(&self) -> Result<Vec<Id>> {
        let ids = self.eligible_ids();
        if ids.is_empty() {
            tracing::warn!(selected = self.0.len(), "bulk operation with no story rows selected");
            return Err(DeskError::NothingSelected);
        }
        Ok(ids)
    }
}

/// Aggregate result of a bulk operation. Partial success is a valid outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<Id>,
    pub failed: Vec<(Id, String)>,
}

impl BulkOutcome {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

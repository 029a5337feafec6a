//! Remote store contract.
//!
//! Everything the core reads or writes goes through [`RemoteStore`]. The
//! transport behind it is not our concern; [`memory::InMemoryStore`] is the
//! implementation used by the CLI and the tests.

pub mod invalidation;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::entity::{Category, EntityRecord, FieldMap, FieldValue, HistoryEntry};
use crate::error::{DeskError, Result};
use crate::types::{EntityKind, Id};

pub use invalidation::{Invalidation, InvalidationBus, InvalidationReceiver, ScopeKey};
pub use memory::{Board, Fault, InMemoryStore};

/// Predicate and paging for a collection fetch.
///
/// On tasks and defects, `sprint_id` also matches through the owning
/// requirement, so a sprint-scoped tree can fetch all three collections with
/// the same filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// 1-based page number. Ignored when `page_size` is `None`.
    #[serde(default = "first_page")]
    pub page: u32,
    /// `None` fetches every match in one go (relation tabs, tree children).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

fn first_page() -> u32 {
    1
}

impl CollectionFilter {
    pub fn project(project_id: Id) -> Self {
        Self {
            project_id: Some(project_id),
            page: first_page(),
            ..Default::default()
        }
    }

    pub fn with_sprint(mut self, sprint_id: Option<Id>) -> Self {
        self.sprint_id = sprint_id;
        self
    }

    pub fn with_category(mut self, category_id: Option<Id>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn paged(mut self, page: u32, page_size: u32) -> Self {
        self.page = page.max(1);
        self.page_size = Some(page_size);
        self
    }

    /// Filter selecting entities whose `field` reference points at `id`.
    pub fn by_reference(field: &str, id: Id) -> Result<Self> {
        let mut filter = Self {
            page: first_page(),
            ..Default::default()
        };
        let slot = match field {
            "requirement" => &mut filter.requirement_id,
            "task" => &mut filter.task_id,
            "test_case" => &mut filter.test_case_id,
            "sprint" => &mut filter.sprint_id,
            "category" => &mut filter.category_id,
            _ => {
                return Err(DeskError::Other(format!(
                    "cannot filter collections by '{field}'"
                )));
            }
        };
        *slot = Some(id);
        Ok(filter)
    }
}

/// One page of a collection plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Asynchronous access to remote entity state.
///
/// `mutate_entity` replaces exactly the supplied fields and leaves every other
/// field untouched.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_collection(
        &self,
        kind: EntityKind,
        filter: &CollectionFilter,
    ) -> Result<Page<EntityRecord>>;

    async fn fetch_entity(&self, kind: EntityKind, id: Id) -> Result<EntityRecord>;

    async fn mutate_entity(&self, kind: EntityKind, id: Id, fields: &FieldMap)
    -> Result<EntityRecord>;

    async fn create_entity(
        &self,
        kind: EntityKind,
        project_id: Id,
        fields: &FieldMap,
    ) -> Result<EntityRecord>;

    /// Delete an entity, returning its last state.
    async fn delete_entity(&self, kind: EntityKind, id: Id) -> Result<EntityRecord>;

    /// Field change log, newest first.
    async fn fetch_history(&self, kind: EntityKind, id: Id) -> Result<Vec<HistoryEntry>>;

    async fn fetch_categories(&self, project_id: Id) -> Result<Vec<Category>>;

    /// Point `field` of `(kind, id)` at `target`.
    async fn link_entity(
        &self,
        kind: EntityKind,
        id: Id,
        field: &str,
        target: Id,
    ) -> Result<EntityRecord> {
        let fields = FieldMap::single(field, FieldValue::Ref(Some(target)));
        self.mutate_entity(kind, id, &fields).await
    }

    /// Clear reference `field` of `(kind, id)`.
    async fn unlink_entity(&self, kind: EntityKind, id: Id, field: &str) -> Result<EntityRecord> {
        let fields = FieldMap::single(field, FieldValue::Ref(None));
        self.mutate_entity(kind, id, &fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_reference() {
        let filter = CollectionFilter::by_reference("task", 9).unwrap();
        assert_eq!(filter.task_id, Some(9));
        assert_eq!(filter.page_size, None);
        assert!(CollectionFilter::by_reference("assignee", 1).is_err());
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let filter = CollectionFilter::project(1).with_search(Some("  ".to_string()));
        assert_eq!(filter.search, None);
    }

    #[test]
    fn test_paged_floors_page_at_one() {
        let filter = CollectionFilter::project(1).paged(0, 20);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, Some(20));
    }
}

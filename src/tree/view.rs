//! Tree table controller.
//!
//! [`TreeView`] owns everything the requirement table shows: the fetched
//! collections, the composed tree, the expansion and selection sets and the
//! inline editors of visible cells. Clicks are routed here; writes go through
//! the [`MutationClient`], and the view refetches once an invalidation for
//! one of its collections arrives.

use std::future::Future;

use futures::future::join_all;

use crate::entity::{Defect, EntityRecord, FieldMap, FieldValue, Requirement, Task};
use crate::error::{DeskError, Result};
use crate::inline_edit::InlineFieldEditor;
use crate::interaction::ClickTarget;
use crate::mutation::MutationClient;
use crate::registry::schema;
use crate::store::{CollectionFilter, InvalidationReceiver, Page};
use crate::types::{EntityKind, Id, Priority, RequirementStatus};

use super::composer::{ExpansionSet, Tree, TreeInput, compose};
use super::row::{RowKey, TreeRow};
use super::selection::{BulkOutcome, BulkSelection};

/// Which slice of the project the table shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeScope {
    pub project_id: Id,
    pub sprint_id: Option<Id>,
    pub category_id: Option<Id>,
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl TreeScope {
    pub fn project(project_id: Id, page_size: u32) -> Self {
        Self {
            project_id,
            sprint_id: None,
            category_id: None,
            search: None,
            page: 1,
            page_size,
        }
    }

    pub fn with_sprint(mut self, sprint_id: Option<Id>) -> Self {
        self.sprint_id = sprint_id;
        self
    }

    pub fn is_sprint_scoped(&self) -> bool {
        self.sprint_id.is_some()
    }

    fn requirement_filter(&self) -> CollectionFilter {
        CollectionFilter::project(self.project_id)
            .with_sprint(self.sprint_id)
            .with_category(self.category_id)
            .with_search(self.search.clone())
            .paged(self.page, self.page_size)
    }

    fn child_filter(&self) -> CollectionFilter {
        CollectionFilter::project(self.project_id).with_sprint(self.sprint_id)
    }
}

/// Fetch state of one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection<T> {
    NotLoaded,
    Loaded { items: Vec<T>, total: usize },
    Failed(String),
}

impl<T> Collection<T> {
    /// Loaded items; empty when not loaded or failed.
    pub fn items(&self) -> &[T] {
        match self {
            Collection::Loaded { items, .. } => items,
            Collection::NotLoaded | Collection::Failed(_) => &[],
        }
    }

    pub fn total(&self) -> usize {
        match self {
            Collection::Loaded { total, .. } => *total,
            Collection::NotLoaded | Collection::Failed(_) => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Collection::Failed(_))
    }
}

/// Fetch failures of one refresh. The tree still renders without the
/// affected subtrees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub failures: Vec<(EntityKind, String)>,
}

impl RefreshReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    OpenPanel { kind: EntityKind, id: Id },
    SelectionToggled { key: RowKey, selected: bool },
    ExpansionToggled { key: RowKey, expanded: bool },
    /// Consumed by an inline editor; nothing else reacted.
    HandledByEditor,
    Ignored,
}

pub struct TreeView {
    client: MutationClient,
    invalidations: InvalidationReceiver,
    scope: TreeScope,
    requirements: Collection<Requirement>,
    tasks: Collection<Task>,
    defects: Collection<Defect>,
    tree: Tree,
    expanded: ExpansionSet,
    selection: BulkSelection,
    editors: Vec<InlineFieldEditor>,
    stale: bool,
}

impl TreeView {
    pub fn new(client: MutationClient, scope: TreeScope) -> Self {
        let invalidations = client.subscribe();
        Self {
            client,
            invalidations,
            scope,
            requirements: Collection::NotLoaded,
            tasks: Collection::NotLoaded,
            defects: Collection::NotLoaded,
            tree: Tree::default(),
            expanded: ExpansionSet::new(),
            selection: BulkSelection::new(),
            editors: Vec::new(),
            stale: true,
        }
    }

    pub fn scope(&self) -> &TreeScope {
        &self.scope
    }

    /// Change the governing filter. Selection does not carry over.
    pub fn set_scope(&mut self, scope: TreeScope) {
        if scope != self.scope {
            self.scope = scope;
            self.selection.clear();
            self.stale = true;
        }
    }

    pub fn set_page(&mut self, page: u32) {
        let scope = TreeScope {
            page: page.max(1),
            ..self.scope.clone()
        };
        self.set_scope(scope);
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn expanded(&self) -> &ExpansionSet {
        &self.expanded
    }

    pub fn selection(&self) -> &BulkSelection {
        &self.selection
    }

    pub fn requirements(&self) -> &Collection<Requirement> {
        &self.requirements
    }

    pub fn tasks(&self) -> &Collection<Task> {
        &self.tasks
    }

    pub fn defects(&self) -> &Collection<Defect> {
        &self.defects
    }

    /// Total requirements matching the scope, across pages.
    pub fn total(&self) -> usize {
        self.requirements.total()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Refetch the collections and recompose.
    ///
    /// In a sprint-scoped view the three collections are fetched
    /// concurrently. A failed fetch leaves its collection `Failed` and the
    /// subtrees it feeds empty.
    pub async fn refresh(&mut self) -> RefreshReport {
        let store = self.client.store().clone();
        let req_filter = self.scope.requirement_filter();
        let mut report = RefreshReport::default();

        if self.scope.is_sprint_scoped() {
            let child_filter = self.scope.child_filter();
            let (reqs, tasks, defects) = futures::join!(
                store.fetch_collection(EntityKind::Requirement, &req_filter),
                store.fetch_collection(EntityKind::Task, &child_filter),
                store.fetch_collection(EntityKind::Defect, &child_filter),
            );
            self.requirements = settle(EntityKind::Requirement, reqs, into_requirement, &mut report);
            self.tasks = settle(EntityKind::Task, tasks, into_task, &mut report);
            self.defects = settle(EntityKind::Defect, defects, into_defect, &mut report);
        } else {
            let reqs = store
                .fetch_collection(EntityKind::Requirement, &req_filter)
                .await;
            self.requirements = settle(EntityKind::Requirement, reqs, into_requirement, &mut report);
            self.tasks = Collection::NotLoaded;
            self.defects = Collection::NotLoaded;
        }

        self.recompose();
        self.stale = false;
        report
    }

    fn recompose(&mut self) {
        self.tree = compose(TreeInput {
            requirements: self.requirements.items(),
            tasks: self.tasks.items(),
            defects: self.defects.items(),
            sprint_scoped: self.scope.is_sprint_scoped(),
        });
        let existing = self.tree.all_keys();
        self.selection.retain_existing(&existing);
        self.editors.retain(|e| existing.contains(&e.key()));
        for editor in &self.editors {
            if let Some(node) = self.tree.find(&editor.key()) {
                editor.sync_from(&node.record);
            }
        }
    }

    /// Drain pending invalidations; returns whether a refetch is due.
    pub fn poll_invalidations(&mut self) -> bool {
        let project_id = self.scope.project_id;
        let touched = self.invalidations.drain().iter().any(|inv| {
            [EntityKind::Requirement, EntityKind::Task, EntityKind::Defect]
                .into_iter()
                .any(|kind| inv.touches_project(kind, project_id))
        });
        if touched {
            tracing::debug!(project_id, "tree invalidated");
            self.stale = true;
        }
        self.stale
    }

    /// Visible rows under the current expansion set.
    pub fn rows(&self) -> Vec<TreeRow> {
        self.tree.rows(&self.expanded, self.selection.keys())
    }

    pub fn toggle_expand(&mut self, key: RowKey) {
        self.expanded.toggle(key);
    }

    /// Expand `key` without collapsing it if it is already open.
    pub fn expand(&mut self, key: RowKey) {
        self.expanded.expand(key);
    }

    pub fn toggle_expand_all(&mut self) {
        self.expanded.toggle_all(&self.tree);
    }

    pub fn toggle_selection(&mut self, key: RowKey) -> bool {
        self.selection.toggle(key)
    }

    pub fn select(&mut self, key: RowKey) {
        self.selection.select(key);
    }

    /// Select every story row of the current page.
    pub fn select_all_stories(&mut self) {
        for root in &self.tree.roots {
            self.selection.select(root.key);
        }
    }

    /// Ordered requirement ids of the current page, for sequence navigation.
    pub fn requirement_ids(&self) -> Vec<Id> {
        self.requirements.items().iter().map(|r| r.id).collect()
    }

    /// The editor for one cell, created on first use.
    pub fn editor(&mut self, key: RowKey, field: &str) -> Result<InlineFieldEditor> {
        if let Some(editor) = self
            .editors
            .iter()
            .find(|e| e.key() == key && e.field() == field)
        {
            return Ok(editor.clone());
        }
        let node = self
            .tree
            .find(&key)
            .ok_or_else(|| DeskError::InvalidRowKey(key.to_string()))?;
        let editor = InlineFieldEditor::for_record(self.client.clone(), key, &node.record, field)?;
        self.editors.push(editor.clone());
        Ok(editor)
    }

    /// Route a click. Editor cells swallow their clicks, so one click only
    /// ever affects one target.
    pub fn handle_click(&mut self, target: ClickTarget) -> ClickOutcome {
        if let ClickTarget::Cell { key, field } = &target {
            return match self.editor(*key, field) {
                Ok(editor) if editor.handle_click(&target).is_handled() => {
                    ClickOutcome::HandledByEditor
                }
                Ok(_) => ClickOutcome::Ignored,
                Err(e) => {
                    tracing::debug!("no editor for {key}.{field}: {e}");
                    ClickOutcome::Ignored
                }
            };
        }

        let key = target.key();
        let Some(node) = self.tree.find(&key) else {
            return ClickOutcome::Ignored;
        };
        let has_children = !node.children.is_empty();

        match target {
            ClickTarget::Checkbox(key) => ClickOutcome::SelectionToggled {
                key,
                selected: self.selection.toggle(key),
            },
            ClickTarget::Expander(key) if has_children => {
                self.expanded.toggle(key);
                ClickOutcome::ExpansionToggled {
                    key,
                    expanded: self.expanded.contains(&key),
                }
            }
            ClickTarget::Expander(_) => ClickOutcome::Ignored,
            ClickTarget::Row(key) => ClickOutcome::OpenPanel {
                kind: key.entity_kind(),
                id: key.id,
            },
            ClickTarget::Cell { .. } => ClickOutcome::Ignored,
        }
    }

    /// Set the status of every selected story.
    pub async fn bulk_set_status(&mut self, status: &str) -> Result<BulkOutcome> {
        self.selection.require_eligible()?;
        let value = schema(EntityKind::Requirement)
            .require_field("status")?
            .parse_value(status)?;
        self.bulk_mutate(FieldMap::single("status", value)).await
    }

    /// Move every selected story to `sprint_id` (or out of any sprint).
    pub async fn bulk_move_sprint(&mut self, sprint_id: Option<Id>) -> Result<BulkOutcome> {
        self.bulk_mutate(FieldMap::single("sprint", FieldValue::Ref(sprint_id)))
            .await
    }

    pub async fn bulk_delete(&mut self) -> Result<BulkOutcome> {
        let client = self.client.clone();
        self.run_bulk(move |id| {
            let client = client.clone();
            async move { client.delete(EntityKind::Requirement, id).await }
        })
        .await
    }

    async fn bulk_mutate(&mut self, fields: FieldMap) -> Result<BulkOutcome> {
        let client = self.client.clone();
        self.run_bulk(move |id| {
            let client = client.clone();
            let fields = fields.clone();
            async move { client.mutate(EntityKind::Requirement, id, &fields).await }
        })
        .await
    }

    /// Apply `op` to each eligible id. Items succeed or fail independently.
    async fn run_bulk<F, Fut>(&mut self, op: F) -> Result<BulkOutcome>
    where
        F: Fn(Id) -> Fut,
        Fut: Future<Output = Result<EntityRecord>>,
    {
        let ids = self.selection.require_eligible()?;
        let results = join_all(ids.iter().map(|id| op(*id))).await;

        let mut outcome = BulkOutcome::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(_) => outcome.succeeded.push(id),
                Err(e) => {
                    tracing::warn!("bulk operation on requirement {id} failed: {e}");
                    outcome.failed.push((id, e.to_string()));
                }
            }
        }
        if outcome.success_count() > 0 {
            self.selection.clear();
        }
        Ok(outcome)
    }

    /// Create a draft requirement in the current scope.
    pub async fn quick_create(&mut self, title: &str) -> Result<Requirement> {
        let mut fields = FieldMap::new();
        fields.insert("title", FieldValue::text(title.trim()));
        fields.insert("status", FieldValue::choice(RequirementStatus::Draft));
        fields.insert("priority", FieldValue::choice(Priority::Medium));
        if let Some(sprint_id) = self.scope.sprint_id {
            fields.insert("sprint", FieldValue::Ref(Some(sprint_id)));
        }
        if let Some(category_id) = self.scope.category_id {
            fields.insert("category", FieldValue::Ref(Some(category_id)));
        }
        schema(EntityKind::Requirement).validate_required(&fields)?;

        self.client
            .create(EntityKind::Requirement, self.scope.project_id, &fields)
            .await?
            .into_requirement()
    }
}

fn settle<T>(
    kind: EntityKind,
    result: Result<Page<EntityRecord>>,
    convert: fn(EntityRecord) -> Option<T>,
    report: &mut RefreshReport,
) -> Collection<T> {
    match result {
        Ok(page) => Collection::Loaded {
            total: page.total,
            items: page.items.into_iter().filter_map(convert).collect(),
        },
        Err(e) => {
            tracing::warn!("{kind} collection unavailable, rendering empty: {e}");
            report.failures.push((kind, e.to_string()));
            Collection::Failed(e.to_string())
        }
    }
}

fn into_requirement(record: EntityRecord) -> Option<Requirement> {
    record.into_requirement().ok()
}

fn into_task(record: EntityRecord) -> Option<Task> {
    record.into_task().ok()
}

fn into_defect(record: EntityRecord) -> Option<Defect> {
    record.into_defect().ok()
}

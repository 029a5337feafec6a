//! In-memory [`RemoteStore`] backed by `DashMap`s.
//!
//! Behaves like the tracker backend: newest-updated-first ordering, page
//! slicing, free-text search, denormalized child id lists, per-field history
//! and generated display numbers. Boards can be loaded from and saved to YAML.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use jiff::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{CollectionFilter, Page, RemoteStore};
use crate::config::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::entity::{
    Category, Defect, EntityRecord, FieldMap, FieldValue, HistoryEntry, Requirement, Sprint, Task,
    TestCase,
};
use crate::error::{DeskError, Result};
use crate::registry::{RefTarget, ValueKind, schema};
use crate::session::SessionHandle;
use crate::types::{EntityKind, Id};

/// A failure to inject into the next matching store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Fetch(EntityKind),
    Mutation(EntityKind),
}

/// Serializable snapshot of a whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sprints: Vec<Sprint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defects: Vec<Defect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

pub struct InMemoryStore {
    session: SessionHandle,
    records: DashMap<(EntityKind, Id), EntityRecord>,
    categories: DashMap<Id, Category>,
    history: DashMap<(EntityKind, Id), Vec<HistoryEntry>>,
    next_id: AtomicU64,
    faults: Mutex<Vec<(Fault, String)>>,
}

impl InMemoryStore {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            records: DashMap::new(),
            categories: DashMap::new(),
            history: DashMap::new(),
            next_id: AtomicU64::new(1),
            faults: Mutex::new(Vec::new()),
        }
    }

    pub fn from_board(board: Board, session: SessionHandle) -> Self {
        let store = Self::new(session);
        let Board {
            sprints,
            requirements,
            tasks,
            defects,
            test_cases,
            categories,
        } = board;

        let records = sprints
            .into_iter()
            .map(EntityRecord::Sprint)
            .chain(requirements.into_iter().map(EntityRecord::Requirement))
            .chain(tasks.into_iter().map(EntityRecord::Task))
            .chain(defects.into_iter().map(EntityRecord::Defect))
            .chain(test_cases.into_iter().map(EntityRecord::TestCase));
        for record in records {
            store.insert(record);
        }
        for category in categories {
            store.insert_category(category);
        }
        store.fill_missing_numbers();
        store
    }

    pub fn load(path: &Path, session: SessionHandle) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read board at {}: {}", path.display(), e),
            ))
        })?;
        let board: Board = serde_yaml_ng::from_str(&content)?;
        Ok(Self::from_board(board, session))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(&self.to_board())?;
        std::fs::write(path, content).map_err(|e| {
            DeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write board at {}: {}", path.display(), e),
            ))
        })?;
        Ok(())
    }

    pub fn to_board(&self) -> Board {
        let mut records: Vec<EntityRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by_key(|r| (r.kind(), r.id()));

        let mut board = Board::default();
        for record in records {
            match record {
                EntityRecord::Sprint(s) => board.sprints.push(s),
                EntityRecord::Requirement(r) => board.requirements.push(r),
                EntityRecord::Task(t) => board.tasks.push(t),
                EntityRecord::Defect(d) => board.defects.push(d),
                EntityRecord::TestCase(c) => board.test_cases.push(c),
            }
        }
        board.categories = self.categories.iter().map(|e| e.value().clone()).collect();
        board.categories.sort_by_key(|c| c.id);
        board
    }

    /// Insert or replace a record as-is. Derived id lists are dropped.
    pub fn insert(&self, mut record: EntityRecord) {
        match &mut record {
            EntityRecord::Requirement(r) => {
                r.task_ids.clear();
                r.defect_ids.clear();
            }
            EntityRecord::Task(t) => t.defect_ids.clear(),
            EntityRecord::TestCase(c) => c.defect_ids.clear(),
            EntityRecord::Defect(_) | EntityRecord::Sprint(_) => {}
        }
        self.next_id.fetch_max(record.id() + 1, Ordering::SeqCst);
        self.records.insert((record.kind(), record.id()), record);
    }

    pub fn insert_category(&self, category: Category) {
        self.next_id.fetch_max(category.id + 1, Ordering::SeqCst);
        self.categories.insert(category.id, category);
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.records.iter().filter(|e| e.key().0 == kind).count()
    }

    /// Make the next matching call fail with `message`.
    pub fn fail_next(&self, fault: Fault, message: &str) {
        self.faults.lock().push((fault, message.to_string()));
    }

    fn take_fault(&self, fault: Fault) -> Option<String> {
        let mut faults = self.faults.lock();
        let pos = faults.iter().position(|(f, _)| *f == fault)?;
        Some(faults.remove(pos).1)
    }

    fn raw(&self, kind: EntityKind, id: Id) -> Option<EntityRecord> {
        self.records.get(&(kind, id)).map(|r| r.value().clone())
    }

    fn exists(&self, kind: EntityKind, id: Id) -> bool {
        self.records.contains_key(&(kind, id))
    }

    /// Ids of `kind` records satisfying `pred`, ascending.
    fn ids_where(&self, kind: EntityKind, pred: impl Fn(&EntityRecord) -> bool) -> Vec<Id> {
        let mut ids: Vec<Id> = self
            .records
            .iter()
            .filter(|e| e.key().0 == kind && pred(e.value()))
            .map(|e| e.key().1)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Fill in the denormalized child lists.
    fn hydrate(&self, mut record: EntityRecord) -> EntityRecord {
        match &mut record {
            EntityRecord::Requirement(r) => {
                let id = r.id;
                r.task_ids = self.ids_where(EntityKind::Task, |t| {
                    t.as_task().is_some_and(|t| t.requirement_id == Some(id))
                });
                r.defect_ids = self.ids_where(EntityKind::Defect, |d| {
                    d.as_defect()
                        .is_some_and(|d| d.requirement_id == Some(id) && d.task_id.is_none())
                });
            }
            EntityRecord::Task(t) => {
                let id = t.id;
                t.defect_ids = self.ids_where(EntityKind::Defect, |d| {
                    d.as_defect().is_some_and(|d| d.task_id == Some(id))
                });
            }
            EntityRecord::TestCase(c) => {
                let id = c.id;
                c.defect_ids = self.ids_where(EntityKind::Defect, |d| {
                    d.as_defect().is_some_and(|d| d.test_case_id == Some(id))
                });
            }
            EntityRecord::Defect(_) | EntityRecord::Sprint(_) => {}
        }
        record
    }

    fn requirement_sprint(&self, requirement_id: Option<Id>) -> Option<Id> {
        let id = requirement_id?;
        self.records
            .get(&(EntityKind::Requirement, id))
            .and_then(|r| r.as_requirement().and_then(|r| r.sprint_id))
    }

    fn task_requirement(&self, task_id: Option<Id>) -> Option<Id> {
        let id = task_id?;
        self.records
            .get(&(EntityKind::Task, id))
            .and_then(|t| t.as_task().and_then(|t| t.requirement_id))
    }

    fn in_sprint(&self, record: &EntityRecord, sprint_id: Id) -> bool {
        let sprint = Some(sprint_id);
        match record {
            EntityRecord::Task(t) => self.requirement_sprint(t.requirement_id) == sprint,
            EntityRecord::Defect(d) => {
                d.sprint_id == sprint
                    || self.requirement_sprint(d.requirement_id) == sprint
                    || self.requirement_sprint(self.task_requirement(d.task_id)) == sprint
            }
            EntityRecord::Sprint(s) => s.id == sprint_id,
            other => reference(other, "sprint") == sprint,
        }
    }

    fn matches(&self, record: &EntityRecord, filter: &CollectionFilter) -> bool {
        if filter.project_id.is_some_and(|p| record.project_id() != p) {
            return false;
        }
        let by_reference = [
            ("requirement", filter.requirement_id),
            ("task", filter.task_id),
            ("test_case", filter.test_case_id),
            ("category", filter.category_id),
        ];
        for (field, wanted) in by_reference {
            if wanted.is_some() && reference(record, field) != wanted {
                return false;
            }
        }
        if let Some(status) = &filter.status {
            let current = record.get_field("status");
            if current.as_ref().and_then(|v| v.as_choice()) != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(search) = &filter.search
            && !matches_search(record, search)
        {
            return false;
        }
        match filter.sprint_id {
            Some(sprint_id) => self.in_sprint(record, sprint_id),
            None => true,
        }
    }

    fn require_writer(&self) -> Result<String> {
        self.session.require_user().map(|u| u.name)
    }

    /// Referenced entities must exist.
    fn check_references(&self, kind: EntityKind, fields: &FieldMap) -> Result<()> {
        let schema = schema(kind);
        for (name, value) in fields.iter() {
            let Some(spec) = schema.field(name) else {
                continue;
            };
            let Some(target) = value.as_ref_id() else {
                continue;
            };
            let found = match spec.value {
                ValueKind::Ref(RefTarget::Entity(target_kind)) => {
                    self.exists(target_kind, target).then_some(()).ok_or(target_kind.to_string())
                }
                ValueKind::Ref(RefTarget::Sprint) => self
                    .exists(EntityKind::Sprint, target)
                    .then_some(())
                    .ok_or("sprint".to_string()),
                ValueKind::Ref(RefTarget::Category) => self
                    .categories
                    .contains_key(&target)
                    .then_some(())
                    .ok_or("category".to_string()),
                _ => Ok(()),
            };
            if let Err(what) = found {
                return Err(DeskError::Rejected(format!("{what} {target} not found")));
            }
        }
        Ok(())
    }

    fn next_number(&self, kind: EntityKind, project_id: Id) -> String {
        let prefix = kind.number_prefix();
        let highest = self
            .records
            .iter()
            .filter(|e| e.key().0 == kind && e.value().project_id() == project_id)
            .filter_map(|e| {
                e.value()
                    .number()
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .and_then(|n| n.parse::<u64>().ok())
            })
            .max()
            .unwrap_or(0);
        format!("{prefix}-{:03}", highest + 1)
    }

    fn fill_missing_numbers(&self) {
        let mut missing: Vec<(EntityKind, Id)> = self
            .records
            .iter()
            .filter(|e| e.key().0 != EntityKind::Sprint && e.value().number().is_empty())
            .map(|e| *e.key())
            .collect();
        missing.sort();
        for key in missing {
            let Some(project_id) = self.records.get(&key).map(|r| r.project_id()) else {
                continue;
            };
            let number = self.next_number(key.0, project_id);
            if let Some(mut record) = self.records.get_mut(&key) {
                record.set_number(number);
            }
        }
    }

    /// Append one entry per changed field. Returns false if nothing changed.
    fn record_history(
        &self,
        before: &EntityRecord,
        fields: &FieldMap,
        user: &str,
        at: Timestamp,
    ) -> bool {
        let entries: Vec<HistoryEntry> = fields
            .iter()
            .filter_map(|(name, value)| {
                let old = before.get_field(name);
                (old.as_ref() != Some(value)).then(|| HistoryEntry {
                    field: name.to_string(),
                    old_value: old.as_ref().and_then(history_text),
                    new_value: history_text(value),
                    changed_by: user.to_string(),
                    changed_at: at,
                })
            })
            .collect();
        let changed = !entries.is_empty();
        if changed {
            self.history
                .entry((before.kind(), before.id()))
                .or_default()
                .extend(entries);
        }
        changed
    }

    fn blank(kind: EntityKind, id: Id, project_id: Id) -> EntityRecord {
        match kind {
            EntityKind::Requirement => EntityRecord::Requirement(Requirement::new(id, project_id, "")),
            EntityKind::Task => EntityRecord::Task(Task::new(id, project_id, "")),
            EntityKind::Defect => EntityRecord::Defect(Defect::new(id, project_id, "")),
            EntityKind::TestCase => EntityRecord::TestCase(TestCase::new(id, project_id, "")),
            EntityKind::Sprint => EntityRecord::Sprint(Sprint::new(id, project_id, "")),
        }
    }

    /// Clear every reference to a deleted entity.
    fn detach(&self, kind: EntityKind, id: Id) {
        let field = match kind {
            EntityKind::Requirement => "requirement",
            EntityKind::Task => "task",
            EntityKind::TestCase => "test_case",
            EntityKind::Sprint => "sprint",
            EntityKind::Defect => return,
        };
        for mut entry in self.records.iter_mut() {
            let record = entry.value_mut();
            if reference(record, field) == Some(id)
                && let Err(e) = record.set_field(field, FieldValue::Ref(None))
            {
                tracing::warn!("failed to detach {} {}: {e}", record.kind(), record.id());
            }
        }
    }
}

fn reference(record: &EntityRecord, field: &str) -> Option<Id> {
    record.get_field(field).and_then(|v| v.as_ref_id())
}

fn matches_search(record: &EntityRecord, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let description = match record.get_field("description") {
        Some(FieldValue::Text(text)) => text,
        _ => String::new(),
    };
    [record.number(), record.title(), description.as_str()]
        .iter()
        .any(|hay| hay.to_lowercase().contains(&needle))
}

fn history_text(value: &FieldValue) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryStore {
    async fn fetch_collection(
        &self,
        kind: EntityKind,
        filter: &CollectionFilter,
    ) -> Result<Page<EntityRecord>> {
        tracing::debug!(%kind, ?filter, "fetch collection");
        if let Some(message) = self.take_fault(Fault::Fetch(kind)) {
            return Err(DeskError::Fetch { kind, message });
        }

        let candidates: Vec<EntityRecord> = self
            .records
            .iter()
            .filter(|e| e.key().0 == kind)
            .map(|e| e.value().clone())
            .collect();
        let mut items: Vec<EntityRecord> = candidates
            .into_iter()
            .filter(|r| self.matches(r, filter))
            .collect();
        items.sort_by(|a, b| {
            b.updated_at()
                .cmp(&a.updated_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let total = items.len();
        if let Some(size) = filter.page_size {
            let size = size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE) as usize;
            let start = (filter.page.max(1) as usize - 1) * size;
            items = items.into_iter().skip(start).take(size).collect();
        }

        Ok(Page {
            items: items.into_iter().map(|r| self.hydrate(r)).collect(),
            total,
        })
    }

    async fn fetch_entity(&self, kind: EntityKind, id: Id) -> Result<EntityRecord> {
        tracing::debug!(%kind, id, "fetch entity");
        if let Some(message) = self.take_fault(Fault::Fetch(kind)) {
            return Err(DeskError::Fetch { kind, message });
        }
        let record = self.raw(kind, id).ok_or(DeskError::NotFound { kind, id })?;
        Ok(self.hydrate(record))
    }

    async fn mutate_entity(
        &self,
        kind: EntityKind,
        id: Id,
        fields: &FieldMap,
    ) -> Result<EntityRecord> {
        let user = self.require_writer()?;
        if let Some(message) = self.take_fault(Fault::Mutation(kind)) {
            return Err(DeskError::Mutation { kind, id, message });
        }
        let before = self.raw(kind, id).ok_or(DeskError::NotFound { kind, id })?;

        let rejected = |e: DeskError| DeskError::Mutation {
            kind,
            id,
            message: e.to_string(),
        };
        schema(kind).validate(fields, false).map_err(rejected)?;
        self.check_references(kind, fields).map_err(rejected)?;

        let mut after = before.clone();
        after.apply_fields(fields).map_err(rejected)?;

        let now = Timestamp::now();
        if self.record_history(&before, fields, &user, now) {
            after.touch(now);
            self.records.insert((kind, id), after.clone());
        }
        Ok(self.hydrate(after))
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        project_id: Id,
        fields: &FieldMap,
    ) -> Result<EntityRecord> {
        self.require_writer()?;
        if let Some(message) = self.take_fault(Fault::Mutation(kind)) {
            return Err(DeskError::Rejected(message));
        }
        let rejected = |e: DeskError| DeskError::Rejected(e.to_string());
        schema(kind).validate_required(fields).map_err(rejected)?;
        self.check_references(kind, fields).map_err(rejected)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut record = Self::blank(kind, id, project_id);
        record.apply_fields(fields).map_err(rejected)?;
        record.set_number(self.next_number(kind, project_id));
        record.stamp_created(Timestamp::now());

        tracing::debug!(%kind, id, number = record.number(), "created");
        self.records.insert((kind, id), record.clone());
        Ok(self.hydrate(record))
    }

    async fn delete_entity(&self, kind: EntityKind, id: Id) -> Result<EntityRecord> {
        self.require_writer()?;
        if let Some(message) = self.take_fault(Fault::Mutation(kind)) {
            return Err(DeskError::Mutation { kind, id, message });
        }
        let (_, record) = self
            .records
            .remove(&(kind, id))
            .ok_or(DeskError::NotFound { kind, id })?;
        self.history.remove(&(kind, id));
        self.detach(kind, id);
        Ok(record)
    }

    async fn fetch_history(&self, kind: EntityKind, id: Id) -> Result<Vec<HistoryEntry>> {
        if let Some(message) = self.take_fault(Fault::Fetch(kind)) {
            return Err(DeskError::Fetch { kind, message });
        }
        if !self.exists(kind, id) {
            return Err(DeskError::NotFound { kind, id });
        }
        let mut entries = self
            .history
            .get(&(kind, id))
            .map(|h| h.value().clone())
            .unwrap_or_default();
        entries.reverse();
        Ok(entries)
    }

    async fn fetch_categories(&self, project_id: Id) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| c.project_id == project_id)
            .map(|c| c.value().clone())
            .collect();
        categories.sort_by_key(|c| (c.order, c.id));
        Ok(categories)
    }
}

//! Per-cell inline editors.
//!
//! An [`InlineFieldEditor`] owns one field of one tree row. A change issues a
//! single scoped mutation; the cell only ever shows values that came back from
//! the store. Concurrent changes are neither blocked nor queued: the response
//! that arrives last decides what the cell shows.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::entity::{EntityRecord, FieldMap, FieldValue};
use crate::error::{DeskError, Result};
use crate::interaction::{ClickTarget, HandleResult};
use crate::mutation::MutationClient;
use crate::registry::{FieldSpec, schema};
use crate::tree::RowKey;
use crate::types::Id;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CellState {
    shown: FieldValue,
    in_flight: usize,
    open: bool,
    last_error: Option<String>,
}

#[derive(Clone)]
pub struct InlineFieldEditor {
    client: MutationClient,
    key: RowKey,
    id: Id,
    spec: &'static FieldSpec,
    state: Arc<Mutex<CellState>>,
}

impl InlineFieldEditor {
    pub fn for_record(
        client: MutationClient,
        key: RowKey,
        record: &EntityRecord,
        field: &str,
    ) -> Result<Self> {
        let kind = record.kind();
        let spec = schema(kind).require_field(field)?;
        if !spec.inline {
            return Err(DeskError::Validation(format!(
                "{} is not editable inline on a {kind}",
                spec.label
            )));
        }
        let shown = record.get_field(field).ok_or_else(|| DeskError::UnknownField {
            kind,
            field: field.to_string(),
        })?;
        Ok(Self {
            client,
            key,
            id: record.id(),
            spec,
            state: Arc::new(Mutex::new(CellState {
                shown,
                in_flight: 0,
                open: false,
                last_error: None,
            })),
        })
    }

    pub fn key(&self) -> RowKey {
        self.key
    }

    pub fn field(&self) -> &'static str {
        self.spec.name
    }

    /// The value the cell currently shows.
    pub fn value(&self) -> FieldValue {
        self.state.lock().shown.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().in_flight > 0
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Claim clicks on this cell so they never reach the row or checkbox.
    pub fn handle_click(&self, target: &ClickTarget) -> HandleResult {
        match target {
            ClickTarget::Cell { key, field } if *key == self.key && field == self.spec.name => {
                let mut state = self.state.lock();
                state.open = !state.open;
                HandleResult::Handled
            }
            _ => HandleResult::NotHandled,
        }
    }

    /// Parse `raw` against the field's shape and submit it.
    pub async fn change_str(&self, raw: &str) -> Result<EntityRecord> {
        let value = self.spec.parse_value(raw)?;
        self.change(value).await
    }

    /// Submit `value`. Invalid values are rejected before any request.
    pub async fn change(&self, value: FieldValue) -> Result<EntityRecord> {
        self.spec.validate(&value)?;
        {
            let mut state = self.state.lock();
            state.in_flight += 1;
            state.open = false;
        }

        let kind = self.key.entity_kind();
        let fields = FieldMap::single(self.spec.name, value);
        let result = self.client.mutate(kind, self.id, &fields).await;

        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        match &result {
            Ok(record) => {
                if let Some(value) = record.get_field(self.spec.name) {
                    state.shown = value;
                }
                state.last_error = None;
            }
            Err(e) => state.last_error = Some(e.to_string()),
        }
        result
    }

    /// Adopt a value from a refetched row, unless a change is in flight.
    pub fn sync_from(&self, record: &EntityRecord) {
        let mut state = self.state.lock();
        if state.in_flight == 0
            && let Some(value) = record.get_field(self.spec.name)
        {
            state.shown = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Defect, Requirement, Task};
    use crate::session::{SessionHandle, User};
    use crate::store::{Fault, InMemoryStore, InvalidationBus};
    use crate::types::EntityKind;

    fn setup() -> (MutationClient, Arc<InMemoryStore>) {
        let session = SessionHandle::signed_in(
            User {
                id: 1,
                name: "alice".to_string(),
            },
            "token",
        );
        let store = Arc::new(InMemoryStore::new(session));
        store.insert(EntityRecord::Requirement(Requirement::new(1, 10, "Login")));
        store.insert(EntityRecord::Task(Task::new(2, 10, "Form")));
        store.insert(EntityRecord::Defect(Defect::new(3, 10, "Crash")));
        (MutationClient::new(store.clone(), InvalidationBus::new()), store)
    }

    fn record(store: &InMemoryStore, kind: EntityKind, id: Id) -> EntityRecord {
        futures::executor::block_on(crate::store::RemoteStore::fetch_entity(store, kind, id))
            .unwrap()
    }

    #[tokio::test]
    async fn test_change_updates_cell_and_invalidates() {
        let (client, store) = setup();
        let mut rx = client.subscribe();
        let editor = InlineFieldEditor::for_record(
            client,
            RowKey::story_bug(3),
            &record(&store, EntityKind::Defect, 3),
            "severity",
        )
        .unwrap();

        editor.change_str("critical").await.unwrap();
        assert_eq!(editor.value(), FieldValue::choice("critical"));
        assert!(!editor.is_pending());
        assert_eq!(rx.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_change_keeps_previous_value() {
        let (client, store) = setup();
        let editor = InlineFieldEditor::for_record(
            client,
            RowKey::task(2),
            &record(&store, EntityKind::Task, 2),
            "status",
        )
        .unwrap();

        store.fail_next(Fault::Mutation(EntityKind::Task), "permission denied");
        assert!(editor.change_str("done").await.is_err());
        assert_eq!(editor.value(), FieldValue::choice("todo"));
        assert!(editor.last_error().unwrap().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_invalid_value_never_reaches_store() {
        let (client, store) = setup();
        let mut rx = client.subscribe();
        let editor = InlineFieldEditor::for_record(
            client,
            RowKey::story(1),
            &record(&store, EntityKind::Requirement, 1),
            "status",
        )
        .unwrap();

        let err = editor.change_str("resolved").await.unwrap_err();
        assert!(err.is_validation());
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_only_inline_fields_get_editors() {
        let (client, store) = setup();
        let req = record(&store, EntityKind::Requirement, 1);
        assert!(InlineFieldEditor::for_record(client.clone(), RowKey::story(1), &req, "title").is_err());
        assert!(InlineFieldEditor::for_record(client, RowKey::story(1), &req, "sprint").is_ok());
    }

    #[test]
    fn test_cell_click_is_consumed() {
        let (client, store) = setup();
        let key = RowKey::story(1);
        let editor = InlineFieldEditor::for_record(
            client,
            key,
            &record(&store, EntityKind::Requirement, 1),
            "priority",
        )
        .unwrap();

        let cell = ClickTarget::Cell {
            key,
            field: "priority".to_string(),
        };
        assert!(editor.handle_click(&cell).is_handled());
        assert!(editor.is_open());
        assert!(!editor.handle_click(&ClickTarget::Row(key)).is_handled());
        assert!(!editor.handle_click(&ClickTarget::Checkbox(key)).is_handled());
    }
}

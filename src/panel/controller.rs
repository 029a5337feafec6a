//! Detail panel controller.
//!
//! One [`DetailPanel`] serves every entity kind; the tab list and the
//! editable fields come from the kind's [`EntitySchema`]. The panel state sits
//! behind a shared mutex so completions of in-flight requests can land after
//! the caller has moved on. Every completion is tagged with the open token it
//! was issued under and is dropped if the panel was closed or re-targeted in
//! the meantime.
//!
//! [`EntitySchema`]: crate::registry::EntitySchema

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::PanelConfig;
use crate::entity::{EntityRecord, FieldMap, FieldValue, HistoryEntry};
use crate::error::{DeskError, Result};
use crate::mutation::MutationClient;
use crate::registry::{TabContent, TabSpec, schema};
use crate::store::{CollectionFilter, InvalidationReceiver};
use crate::types::{EntityKind, Id};

/// Edit-mode state machine.
///
/// `Viewing -> Editing -> Saving -> Viewing`, or back to `Editing` when the
/// save is rejected. `snapshot` is taken once on entry to `Editing` and is
/// what cancel restores.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PanelMode {
    #[default]
    Viewing,
    Editing { snapshot: FieldMap, draft: FieldMap },
    Saving { snapshot: FieldMap, draft: FieldMap },
}

impl PanelMode {
    pub fn name(&self) -> &'static str {
        match self {
            PanelMode::Viewing => "viewing",
            PanelMode::Editing { .. } => "editing",
            PanelMode::Saving { .. } => "saving",
        }
    }

    fn draft(&self) -> Option<&FieldMap> {
        match self {
            PanelMode::Viewing => None,
            PanelMode::Editing { draft, .. } | PanelMode::Saving { draft, .. } => Some(draft),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum PanelWidth {
    /// Fixed width in pixels.
    Compressed(u32),
    /// Share of the viewport, in percent.
    Expanded(u8),
}

/// Loaded content of one tab.
#[derive(Debug, Clone, PartialEq)]
pub enum TabData {
    Detail,
    History(Vec<HistoryEntry>),
    Records(Vec<EntityRecord>),
}

impl TabData {
    fn count(&self) -> Option<usize> {
        match self {
            TabData::Detail => None,
            TabData::History(entries) => Some(entries.len()),
            TabData::Records(records) => Some(records.len()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TabState {
    #[default]
    NotLoaded,
    Loaded(TabData),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    #[default]
    Pending,
    Count(usize),
    Failed,
}

#[derive(Debug, Default)]
struct PanelState {
    token: u64,
    target: Option<(EntityKind, Id)>,
    record: Option<EntityRecord>,
    load_error: Option<String>,
    mode: PanelMode,
    active_tab: &'static str,
    tabs: BTreeMap<&'static str, TabState>,
    badges: BTreeMap<&'static str, Badge>,
    expanded: bool,
    stale: bool,
    last_error: Option<String>,
}

impl PanelState {
    fn reset_content(&mut self) {
        self.record = None;
        self.load_error = None;
        self.mode = PanelMode::Viewing;
        self.active_tab = "detail";
        self.tabs.clear();
        self.badges.clear();
        self.stale = false;
        self.last_error = None;
    }
}

/// Render-ready snapshot of the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub kind: EntityKind,
    pub id: Id,
    pub number: Option<String>,
    pub title: Option<String>,
    pub mode: &'static str,
    pub active_tab: &'static str,
    pub tabs: Vec<TabView>,
    pub width: PanelWidth,
    pub fields: FieldMap,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabView {
    pub key: &'static str,
    pub label: &'static str,
    pub badge: Option<Badge>,
}

pub struct DetailPanel {
    client: MutationClient,
    config: PanelConfig,
    invalidations: Mutex<InvalidationReceiver>,
    state: Arc<Mutex<PanelState>>,
}

impl DetailPanel {
    pub fn new(client: MutationClient, config: PanelConfig) -> Self {
        let invalidations = Mutex::new(client.subscribe());
        Self {
            client,
            config,
            invalidations,
            state: Arc::new(Mutex::new(PanelState::default())),
        }
    }

    pub fn target(&self) -> Option<(EntityKind, Id)> {
        self.state.lock().target
    }

    pub fn is_open(&self) -> bool {
        self.target().is_some()
    }

    pub fn record(&self) -> Option<EntityRecord> {
        self.state.lock().record.clone()
    }

    pub fn mode(&self) -> PanelMode {
        self.state.lock().mode.clone()
    }

    pub fn active_tab(&self) -> &'static str {
        self.state.lock().active_tab
    }

    pub fn tab(&self, key: &str) -> TabState {
        self.state.lock().tabs.get(key).cloned().unwrap_or_default()
    }

    pub fn badge(&self, key: &str) -> Option<Badge> {
        self.state.lock().badges.get(key).cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Open the panel on an entity and load it. Width starts compressed.
    pub async fn open(&self, kind: EntityKind, id: Id) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.token += 1;
            state.target = Some((kind, id));
            state.expanded = false;
            state.reset_content();
        }
        self.load().await
    }

    /// Point the open panel at another entity of the same kind, as the
    /// sequence navigator does. Any unsaved draft is discarded.
    pub async fn retarget(&self, id: Id) -> Result<()> {
        let kind = {
            let mut state = self.state.lock();
            let (kind, _) = state.target.ok_or_else(not_open)?;
            state.token += 1;
            state.target = Some((kind, id));
            state.reset_content();
            kind
        };
        tracing::debug!(%kind, id, "panel retargeted");
        self.load().await
    }

    /// Close the panel. In-flight requests keep running; their results are
    /// dropped.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.token += 1;
        state.target = None;
        state.expanded = false;
        state.reset_content();
    }

    fn current(&self) -> Result<(u64, EntityKind, Id)> {
        let state = self.state.lock();
        let (kind, id) = state.target.ok_or_else(not_open)?;
        Ok((state.token, kind, id))
    }

    /// Run `apply` only if the panel still shows what `token` was issued for.
    fn apply_if_current(&self, token: u64, what: &str, apply: impl FnOnce(&mut PanelState)) -> bool {
        let mut state = self.state.lock();
        if state.token != token || state.target.is_none() {
            tracing::warn!("dropping stale {what} response");
            return false;
        }
        apply(&mut state);
        true
    }

    /// Fetch the entity itself.
    pub async fn load(&self) -> Result<()> {
        let (token, kind, id) = self.current()?;
        tracing::debug!(%kind, id, "loading panel");
        match self.client.store().fetch_entity(kind, id).await {
            Ok(record) => {
                self.apply_if_current(token, "entity", |state| {
                    state.record = Some(record);
                    state.load_error = None;
                    state.stale = false;
                });
                Ok(())
            }
            Err(e) => {
                self.apply_if_current(token, "entity", |state| {
                    state.load_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Fetch every badge count concurrently. Each count lands on its own as
    /// soon as its fetch completes; a failed count does not affect the others.
    pub async fn load_badges(&self) -> Result<()> {
        let (token, kind, _) = self.current()?;
        let tabs = schema(kind).tabs.iter().filter(|t| t.has_badge());
        join_all(tabs.map(|tab| async move {
            let result = self.fetch_tab(tab).await;
            self.apply_if_current(token, "badge", |state| {
                let badge = match &result {
                    Ok(data) => Badge::Count(data.count().unwrap_or(0)),
                    Err(e) => {
                        tracing::warn!("badge for tab {} unavailable: {e}", tab.key);
                        Badge::Failed
                    }
                };
                state.badges.insert(tab.key, badge);
            });
        }))
        .await;
        Ok(())
    }

    /// Switch tabs and load the new tab's content.
    pub async fn select_tab(&self, key: &str) -> Result<()> {
        let (_, kind, _) = self.current()?;
        let tab = schema(kind)
            .tab(key)
            .ok_or_else(|| DeskError::Validation(format!("{kind} panel has no '{key}' tab")))?;
        self.state.lock().active_tab = tab.key;
        self.load_tab(tab.key).await
    }

    /// Fetch one tab's content. A relation tab also refreshes its badge.
    pub async fn load_tab(&self, key: &str) -> Result<()> {
        let (token, kind, _) = self.current()?;
        let tab = schema(kind)
            .tab(key)
            .ok_or_else(|| DeskError::Validation(format!("{kind} panel has no '{key}' tab")))?;
        let result = self.fetch_tab(tab).await;
        self.apply_if_current(token, "tab", |state| match &result {
            Ok(data) => {
                if tab.has_badge() {
                    state
                        .badges
                        .insert(tab.key, Badge::Count(data.count().unwrap_or(0)));
                }
                state.tabs.insert(tab.key, TabState::Loaded(data.clone()));
            }
            Err(e) => {
                state.tabs.insert(tab.key, TabState::Failed(e.to_string()));
            }
        });
        result.map(|_| ())
    }

    async fn fetch_tab(&self, tab: &TabSpec) -> Result<TabData> {
        let (_, kind, id) = self.current()?;
        let store = self.client.store();
        match tab.content {
            TabContent::Detail => Ok(TabData::Detail),
            TabContent::History => Ok(TabData::History(store.fetch_history(kind, id).await?)),
            TabContent::Related { kind: child, via } => {
                let filter = CollectionFilter::by_reference(via, id)?;
                let page = store.fetch_collection(child, &filter).await?;
                Ok(TabData::Records(page.items))
            }
            TabContent::Reference { kind: target, field } => {
                let record = store.fetch_entity(kind, id).await?;
                match record.get_field(field).and_then(|v| v.as_ref_id()) {
                    Some(target_id) => {
                        let linked = store.fetch_entity(target, target_id).await?;
                        Ok(TabData::Records(vec![linked]))
                    }
                    None => Ok(TabData::Records(Vec::new())),
                }
            }
        }
    }

    /// Enter edit mode, snapshotting every editable field.
    pub fn begin_edit(&self) -> Result<()> {
        let mut state = self.state.lock();
        let (kind, _) = state.target.ok_or_else(not_open)?;
        if !matches!(state.mode, PanelMode::Viewing) {
            return Err(DeskError::Validation("already editing".to_string()));
        }
        let record = state
            .record
            .as_ref()
            .ok_or_else(|| DeskError::Validation("entity not loaded yet".to_string()))?;
        let snapshot = record.fields(schema(kind).editable_fields())?;
        state.mode = PanelMode::Editing {
            draft: snapshot.clone(),
            snapshot,
        };
        Ok(())
    }

    /// Change one field of the draft.
    pub fn set_field(&self, field: &str, value: FieldValue) -> Result<()> {
        let mut state = self.state.lock();
        let (kind, _) = state.target.ok_or_else(not_open)?;
        let spec = schema(kind).require_field(field)?;
        if !spec.editable {
            return Err(DeskError::Validation(format!("{} is read-only", spec.label)));
        }
        let PanelMode::Editing { draft, .. } = &mut state.mode else {
            return Err(DeskError::Validation("not in edit mode".to_string()));
        };
        draft.insert(spec.name, value);
        Ok(())
    }

    pub fn set_field_str(&self, field: &str, raw: &str) -> Result<()> {
        let kind = self.current()?.1;
        // Parsing validates against the vocabulary too, so the draft never
        // holds a value the store would reject on shape.
        let value = schema(kind).require_field(field)?.parse_value(raw)?;
        self.set_field(field, value)
    }

    /// Leave edit mode, restoring the snapshot taken on entry.
    pub fn cancel_edit(&self) -> Result<FieldMap> {
        let mut state = self.state.lock();
        match std::mem::take(&mut state.mode) {
            PanelMode::Editing { snapshot, .. } => {
                state.last_error = None;
                Ok(snapshot)
            }
            other => {
                state.mode = other;
                Err(DeskError::Validation("not in edit mode".to_string()))
            }
        }
    }

    /// Submit the whole draft. On success the panel shows freshly fetched
    /// data; on failure it stays in edit mode with the draft intact.
    pub async fn save(&self) -> Result<EntityRecord> {
        let (token, kind, id, draft) = {
            let mut state = self.state.lock();
            let (kind, id) = state.target.ok_or_else(not_open)?;
            let (snapshot, draft) = match std::mem::take(&mut state.mode) {
                PanelMode::Editing { snapshot, draft } => (snapshot, draft),
                other => {
                    state.mode = other;
                    return Err(DeskError::Validation("not in edit mode".to_string()));
                }
            };
            if let Err(e) = schema(kind).validate_required(&draft) {
                state.last_error = Some(e.to_string());
                state.mode = PanelMode::Editing { snapshot, draft };
                return Err(e);
            }
            state.mode = PanelMode::Saving {
                snapshot,
                draft: draft.clone(),
            };
            (state.token, kind, id, draft)
        };

        match self.client.mutate(kind, id, &draft).await {
            Ok(saved) => {
                let fresh = match self.client.store().fetch_entity(kind, id).await {
                    Ok(fresh) => fresh,
                    Err(e) => {
                        tracing::warn!("refetch after save failed, showing save response: {e}");
                        saved
                    }
                };
                self.apply_if_current(token, "save", |state| {
                    state.record = Some(fresh.clone());
                    state.mode = PanelMode::Viewing;
                    state.last_error = None;
                });
                Ok(fresh)
            }
            Err(e) => {
                self.apply_if_current(token, "save", |state| {
                    if let PanelMode::Saving { snapshot, draft } = std::mem::take(&mut state.mode) {
                        state.mode = PanelMode::Editing { snapshot, draft };
                    }
                    state.last_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Quick status change, available in every mode.
    ///
    /// While editing, the saved status also replaces the draft's so a later
    /// save does not write the old value back. The snapshot is left alone.
    pub async fn change_status(&self, status: &str) -> Result<EntityRecord> {
        let (token, kind, id) = self.current()?;
        let value = schema(kind).require_field("status")?.parse_value(status)?;
        let fields = FieldMap::single("status", value);
        match self.client.mutate(kind, id, &fields).await {
            Ok(record) => {
                self.apply_if_current(token, "status", |state| {
                    if let PanelMode::Editing { draft, .. } = &mut state.mode
                        && let Some(saved) = record.get_field("status")
                    {
                        draft.insert("status", saved);
                    }
                    state.record = Some(record.clone());
                    state.last_error = None;
                });
                Ok(record)
            }
            Err(e) => {
                self.apply_if_current(token, "status", |state| {
                    state.last_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    pub fn toggle_width(&self) -> PanelWidth {
        {
            let mut state = self.state.lock();
            state.expanded = !state.expanded;
        }
        self.width()
    }

    pub fn width(&self) -> PanelWidth {
        if self.state.lock().expanded {
            PanelWidth::Expanded(self.config.expanded_percent)
        } else {
            PanelWidth::Compressed(self.config.width)
        }
    }

    /// Attach `other` through a relation tab.
    ///
    /// On a related-list tab the other entity's reference is pointed at this
    /// one; on a reference tab this entity's own reference is set.
    pub async fn link(&self, tab_key: &str, other: Id) -> Result<EntityRecord> {
        let (_, kind, id) = self.current()?;
        let tab = relation_tab(kind, tab_key)?;
        let record = match tab.content {
            TabContent::Related { kind: child, via } => {
                self.client.link(child, other, via, id).await?
            }
            TabContent::Reference { field, .. } => self.client.link(kind, id, field, other).await?,
            TabContent::Detail | TabContent::History => unreachable_tab(kind, tab_key)?,
        };
        self.after_relation_change(tab).await;
        Ok(record)
    }

    /// Detach `other` through a relation tab. On a reference tab `other` must
    /// be the currently referenced entity.
    pub async fn unlink(&self, tab_key: &str, other: Id) -> Result<EntityRecord> {
        let (_, kind, id) = self.current()?;
        let tab = relation_tab(kind, tab_key)?;
        let record = match tab.content {
            TabContent::Related { kind: child, via } => self.client.unlink(child, other, via).await?,
            TabContent::Reference { field, .. } => {
                let current = self
                    .record()
                    .and_then(|r| r.get_field(field))
                    .and_then(|v| v.as_ref_id());
                if current != Some(other) {
                    return Err(DeskError::Validation(format!(
                        "{kind} {id} is not linked to {other} via {field}"
                    )));
                }
                self.client.unlink(kind, id, field).await?
            }
            TabContent::Detail | TabContent::History => unreachable_tab(kind, tab_key)?,
        };
        self.after_relation_change(tab).await;
        Ok(record)
    }

    async fn after_relation_change(&self, tab: &TabSpec) {
        if matches!(tab.content, TabContent::Reference { .. })
            && matches!(self.mode(), PanelMode::Viewing)
            && let Err(e) = self.load().await
        {
            tracing::warn!("reload after relink failed: {e}");
        }
        if let Err(e) = self.load_tab(tab.key).await {
            tracing::warn!("reload of tab {} failed: {e}", tab.key);
        }
    }

    /// Drain pending invalidations; returns whether the panel is stale.
    pub fn poll_invalidations(&self) -> bool {
        let Some((kind, id)) = self.target() else {
            return false;
        };
        let project_id = self.record().map(|r| r.project_id());
        let related: Vec<EntityKind> = schema(kind)
            .tabs
            .iter()
            .filter_map(|t| match t.content {
                TabContent::Related { kind, .. } | TabContent::Reference { kind, .. } => Some(kind),
                TabContent::Detail | TabContent::History => None,
            })
            .collect();

        let touched = self.invalidations.lock().drain().iter().any(|inv| {
            inv.touches_entity(kind, id)
                || project_id.is_some_and(|p| related.iter().any(|k| inv.touches_project(*k, p)))
        });
        let mut state = self.state.lock();
        state.stale |= touched;
        state.stale
    }

    /// Refetch whatever is stale. While editing, the entity itself is left
    /// alone so cancel still restores the pre-edit snapshot.
    pub async fn refresh(&self) -> Result<()> {
        if !self.poll_invalidations() {
            return Ok(());
        }
        if matches!(self.mode(), PanelMode::Viewing) {
            self.load().await?;
        } else {
            self.state.lock().stale = false;
        }
        self.load_badges().await?;
        let active = self.active_tab();
        if active != "detail" {
            self.load_tab(active).await?;
        }
        Ok(())
    }

    /// Field values as the panel shows them: the draft while editing,
    /// otherwise the loaded entity.
    pub fn displayed_fields(&self) -> Result<FieldMap> {
        let state = self.state.lock();
        let (kind, _) = state.target.ok_or_else(not_open)?;
        if let Some(draft) = state.mode.draft() {
            return Ok(draft.clone());
        }
        match &state.record {
            Some(record) => record.fields(schema(kind).fields.iter().map(|f| f.name)),
            None => Ok(FieldMap::new()),
        }
    }

    pub fn view(&self) -> Result<PanelView> {
        let fields = self.displayed_fields()?;
        let width = self.width();
        let state = self.state.lock();
        let (kind, id) = state.target.ok_or_else(not_open)?;
        let tabs = schema(kind)
            .tabs
            .iter()
            .map(|tab| TabView {
                key: tab.key,
                label: tab.label,
                badge: tab
                    .has_badge()
                    .then(|| state.badges.get(tab.key).cloned().unwrap_or_default()),
            })
            .collect();
        Ok(PanelView {
            kind,
            id,
            number: state.record.as_ref().map(|r| r.number().to_string()),
            title: state.record.as_ref().map(|r| r.title().to_string()),
            mode: state.mode.name(),
            active_tab: state.active_tab,
            tabs,
            width,
            fields,
            error: state.last_error.clone().or_else(|| state.load_error.clone()),
        })
    }
}

fn not_open() -> DeskError {
    DeskError::Validation("no entity is open in the panel".to_string())
}

fn relation_tab(kind: EntityKind, key: &str) -> Result<&'static TabSpec> {
    schema(kind)
        .tab(key)
        .filter(|t| t.has_badge())
        .ok_or_else(|| DeskError::Validation(format!("{kind} panel has no relation tab '{key}'")))
}

fn unreachable_tab<T>(kind: EntityKind, key: &str) -> Result<T> {
    Err(DeskError::Validation(format!(
        "{kind} tab '{key}' cannot link entities"
    )))
}

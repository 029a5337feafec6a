//! A store wrapper that can hold individual responses until released.
//!
//! Used to reproduce request interleavings: the wrapped call runs right away,
//! but its response is only handed back once the paired sender fires.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use sprintdesk::entity::{Category, EntityRecord, FieldMap, HistoryEntry};
use sprintdesk::error::Result;
use sprintdesk::store::{CollectionFilter, InMemoryStore, Page, RemoteStore};
use sprintdesk::types::{EntityKind, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The next `mutate_entity` call of any kind.
    Mutation,
    /// The next `fetch_collection` call for this kind.
    Collection(EntityKind),
}

pub struct GatedStore {
    inner: Arc<InMemoryStore>,
    gates: Mutex<Vec<(Gate, oneshot::Receiver<()>)>>,
}

impl GatedStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            gates: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &Arc<InMemoryStore> {
        &self.inner
    }

    /// Hold the response of the next call matching `gate` until the
    /// returned sender fires.
    pub fn hold(&self, gate: Gate) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push((gate, rx));
        tx
    }

    fn take(&self, gate: Gate) -> Option<oneshot::Receiver<()>> {
        let mut gates = self.gates.lock();
        let pos = gates.iter().position(|(g, _)| *g == gate)?;
        Some(gates.remove(pos).1)
    }
}

#[async_trait::async_trait]
impl RemoteStore for GatedStore {
    async fn fetch_collection(
        &self,
        kind: EntityKind,
        filter: &CollectionFilter,
    ) -> Result<Page<EntityRecord>> {
        let gate = self.take(Gate::Collection(kind));
        let result = self.inner.fetch_collection(kind, filter).await;
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        result
    }

    async fn fetch_entity(&self, kind: EntityKind, id: Id) -> Result<EntityRecord> {
        self.inner.fetch_entity(kind, id).await
    }

    async fn mutate_entity(
        &self,
        kind: EntityKind,
        id: Id,
        fields: &FieldMap,
    ) -> Result<EntityRecord> {
        let gate = self.take(Gate::Mutation);
        let result = self.inner.mutate_entity(kind, id, fields).await;
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        result
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        project_id: Id,
        fields: &FieldMap,
    ) -> Result<EntityRecord> {
        self.inner.create_entity(kind, project_id, fields).await
    }

    async fn delete_entity(&self, kind: EntityKind, id: Id) -> Result<EntityRecord> {
        self.inner.delete_entity(kind, id).await
    }

    async fn fetch_history(&self, kind: EntityKind, id: Id) -> Result<Vec<HistoryEntry>> {
        self.inner.fetch_history(kind, id).await
    }

    async fn fetch_categories(&self, project_id: Id) -> Result<Vec<Category>> {
        self.inner.fetch_categories(project_id).await
    }
}

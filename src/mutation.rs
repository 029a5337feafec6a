//! Mutate-then-invalidate client.
//!
//! All writes from the tree, the inline editors and the panels go through
//! [`MutationClient`]. A write that succeeds is followed by an invalidation
//! on the shared bus, so every consumer of the affected collections refetches.
//! A write that fails is logged and returned; nothing is applied locally.

use std::sync::Arc;

use crate::entity::{EntityRecord, FieldMap};
use crate::error::Result;
use crate::registry::{RefTarget, ValueKind, schema};
use crate::store::{Invalidation, InvalidationBus, InvalidationReceiver, RemoteStore, ScopeKey};
use crate::types::{EntityKind, Id};

#[derive(Clone)]
pub struct MutationClient {
    store: Arc<dyn RemoteStore>,
    bus: InvalidationBus,
}

impl MutationClient {
    pub fn new(store: Arc<dyn RemoteStore>, bus: InvalidationBus) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    pub fn subscribe(&self) -> InvalidationReceiver {
        self.bus.subscribe()
    }

    pub async fn mutate(&self, kind: EntityKind, id: Id, fields: &FieldMap) -> Result<EntityRecord> {
        tracing::debug!(%kind, id, fields = ?fields.keys().collect::<Vec<_>>(), "mutate");
        let record = self
            .store
            .mutate_entity(kind, id, fields)
            .await
            .inspect_err(|e| tracing::warn!("mutation of {kind} {id} failed: {e}"))?;
        self.publish_for(&record, fields);
        Ok(record)
    }

    pub async fn create(&self, kind: EntityKind, project_id: Id, fields: &FieldMap) -> Result<EntityRecord> {
        tracing::debug!(%kind, project_id, "create");
        let record = self
            .store
            .create_entity(kind, project_id, fields)
            .await
            .inspect_err(|e| tracing::warn!("creating {kind} failed: {e}"))?;
        self.publish_for(&record, fields);
        Ok(record)
    }

    pub async fn delete(&self, kind: EntityKind, id: Id) -> Result<EntityRecord> {
        tracing::debug!(%kind, id, "delete");
        let record = self
            .store
            .delete_entity(kind, id)
            .await
            .inspect_err(|e| tracing::warn!("deleting {kind} {id} failed: {e}"))?;
        self.bus
            .publish(Invalidation::entity(kind, record.project_id(), id));
        // Anything that pointed at the deleted entity was detached.
        for other in EntityKind::ALL.into_iter().filter(|k| *k != kind) {
            self.bus
                .publish(Invalidation::new(other, vec![ScopeKey::Project(record.project_id())]));
        }
        Ok(record)
    }

    pub async fn link(&self, kind: EntityKind, id: Id, field: &str, target: Id) -> Result<EntityRecord> {
        tracing::debug!(%kind, id, field, target, "link");
        let before = self.current_reference(kind, id, field).await;
        let record = self
            .store
            .link_entity(kind, id, field, target)
            .await
            .inspect_err(|e| tracing::warn!("linking {kind} {id} via {field} failed: {e}"))?;
        self.publish_link(&record, field, [before, Some(target)]);
        Ok(record)
    }

    pub async fn unlink(&self, kind: EntityKind, id: Id, field: &str) -> Result<EntityRecord> {
        tracing::debug!(%kind, id, field, "unlink");
        let before = self.current_reference(kind, id, field).await;
        let record = self
            .store
            .unlink_entity(kind, id, field)
            .await
            .inspect_err(|e| tracing::warn!("unlinking {kind} {id} via {field} failed: {e}"))?;
        self.publish_link(&record, field, [before, None]);
        Ok(record)
    }

    async fn current_reference(&self, kind: EntityKind, id: Id, field: &str) -> Option<Id> {
        let record = self.store.fetch_entity(kind, id).await.ok()?;
        record.get_field(field).and_then(|v| v.as_ref_id())
    }

    /// Invalidate the record itself plus every entity kind a changed
    /// reference field points at, since their child lists moved.
    fn publish_for(&self, record: &EntityRecord, fields: &FieldMap) {
        let kind = record.kind();
        let project_id = record.project_id();
        self.bus
            .publish(Invalidation::entity(kind, project_id, record.id()));

        let schema = schema(kind);
        let mut targets: Vec<EntityKind> = fields
            .keys()
            .filter_map(|name| schema.field(name))
            .filter_map(|spec| match spec.value {
                ValueKind::Ref(RefTarget::Entity(target)) => Some(target),
                _ => None,
            })
            .collect();
        targets.sort();
        targets.dedup();
        for target in targets {
            self.bus
                .publish(Invalidation::new(target, vec![ScopeKey::Project(project_id)]));
        }
    }

    fn publish_link(&self, record: &EntityRecord, field: &str, touched: [Option<Id>; 2]) {
        let kind = record.kind();
        let project_id = record.project_id();
        self.bus
            .publish(Invalidation::entity(kind, project_id, record.id()));

        let target = schema(kind).field(field).and_then(|spec| match spec.value {
            ValueKind::Ref(RefTarget::Entity(target)) => Some(target),
            _ => None,
        });
        if let Some(target) = target {
            let mut scope = vec![ScopeKey::Project(project_id)];
            scope.extend(touched.into_iter().flatten().map(|id| ScopeKey::Entity(target, id)));
            self.bus.publish(Invalidation::new(target, scope));
        }
    }
}

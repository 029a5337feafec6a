//! Mutate-then-invalidate notification channel.
//!
//! A successful mutation publishes an [`Invalidation`] on the shared
//! [`InvalidationBus`]. Every open view (tree, panels, badge counts) holds its
//! own receiver and decides whether the notice touches what it shows.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::types::{EntityKind, Id};

/// Default capacity of the broadcast buffer.
const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Project(Id),
    Entity(EntityKind, Id),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub kind: EntityKind,
    /// Empty means every collection of `kind`.
    pub scope: Vec<ScopeKey>,
}

impl Invalidation {
    pub fn new(kind: EntityKind, scope: Vec<ScopeKey>) -> Self {
        Self { kind, scope }
    }

    /// Invalidation for one entity inside one project.
    pub fn entity(kind: EntityKind, project_id: Id, id: Id) -> Self {
        Self::new(
            kind,
            vec![ScopeKey::Project(project_id), ScopeKey::Entity(kind, id)],
        )
    }

    pub fn everything(kind: EntityKind) -> Self {
        Self::new(kind, Vec::new())
    }

    /// True if a view of `kind` collections in `project_id` must refetch.
    pub fn touches_project(&self, kind: EntityKind, project_id: Id) -> bool {
        self.kind == kind
            && (self.scope.is_empty()
                || self.scope.contains(&ScopeKey::Project(project_id)))
    }

    /// True if the entity `(kind, id)` itself may have changed.
    pub fn touches_entity(&self, kind: EntityKind, id: Id) -> bool {
        self.kind == kind
            && (self.scope.is_empty() || self.scope.contains(&ScopeKey::Entity(kind, id)))
    }
}

#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<Invalidation>,
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> InvalidationReceiver {
        InvalidationReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, invalidation: Invalidation) -> usize {
        tracing::debug!(kind = %invalidation.kind, scope = ?invalidation.scope, "invalidate");
        self.sender.send(invalidation).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct InvalidationReceiver {
    receiver: broadcast::Receiver<Invalidation>,
}

impl InvalidationReceiver {
    /// Take every pending notice without waiting.
    ///
    /// If the receiver fell behind, the dropped notices are replaced with a
    /// blanket invalidation of every kind.
    pub fn drain(&mut self) -> Vec<Invalidation> {
        let mut pending = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(invalidation) => pending.push(invalidation),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "invalidation receiver lagged");
                    pending.extend(EntityKind::ALL.into_iter().map(Invalidation::everything));
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        pending
    }

    /// Wait for the next notice. `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<Invalidation> {
        loop {
            match self.receiver.recv().await {
                Ok(invalidation) => return Some(invalidation),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "invalidation receiver lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

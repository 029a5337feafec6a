#[macro_use]
mod macros;

pub mod commands;
pub mod config;
pub mod display;
pub mod entity;
pub mod error;
pub mod inline_edit;
pub mod interaction;
pub mod mutation;
pub mod panel;
pub mod registry;
pub mod session;
pub mod store;
pub mod tree;
pub mod types;

pub use config::Config;
pub use entity::{
    Category, Defect, Entity, EntityRecord, FieldMap, FieldValue, HistoryEntry, Requirement,
    Sprint, Task, TestCase,
};
pub use error::{DeskError, Result};
pub use inline_edit::InlineFieldEditor;
pub use interaction::{ClickTarget, HandleResult};
pub use mutation::MutationClient;
pub use panel::{DetailPanel, DismissPolicy, OutsideClickGuard, PanelMode, PointerTarget, SequenceNavigator};
pub use registry::{EntitySchema, FieldSpec, TabContent, TabSpec, schema};
pub use session::{SessionHandle, User};
pub use store::{
    Board, CollectionFilter, InMemoryStore, Invalidation, InvalidationBus, Page, RemoteStore,
};
pub use tree::{BulkOutcome, BulkSelection, ExpansionSet, RowKey, RowKind, Tree, TreeRow, TreeView};
pub use types::{EntityKind, Id};

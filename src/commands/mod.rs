mod bulk;
mod categories;
mod config;
mod set;
mod show;
mod tree;

pub use bulk::cmd_bulk_status;
pub use categories::cmd_categories;
pub use config::{cmd_config_set, cmd_config_show};
pub use set::cmd_set;
pub use show::cmd_show;
pub use tree::{TreeOptions, cmd_tree};

use std::path::Path;
use std::sync::Arc;

use crate::entity::EntityRecord;
use crate::error::Result;
use crate::mutation::MutationClient;
use crate::session::{SessionHandle, User};
use crate::store::{InMemoryStore, InvalidationBus};
use crate::tree::RowKey;

/// Environment variable naming the user that CLI writes are attributed to.
pub const USER_ENV: &str = "SPRINTDESK_USER";

/// A board file opened for one command.
pub struct BoardSession {
    pub store: Arc<InMemoryStore>,
    pub client: MutationClient,
    pub session: SessionHandle,
}

impl BoardSession {
    pub fn open(path: &Path) -> Result<Self> {
        let name = std::env::var(USER_ENV).unwrap_or_else(|_| "local".to_string());
        let session = SessionHandle::signed_in(User { id: 0, name }, "local");
        let store = Arc::new(InMemoryStore::load(path, session.clone())?);
        tracing::debug!(path = %path.display(), "board opened");
        let client = MutationClient::new(store.clone(), InvalidationBus::new());
        Ok(Self {
            store,
            client,
            session,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.store.save(path)
    }
}

/// The tree row key an entity would be shown under.
pub fn row_key_for(record: &EntityRecord) -> Option<RowKey> {
    match record {
        EntityRecord::Requirement(r) => Some(RowKey::story(r.id)),
        EntityRecord::Task(t) => Some(RowKey::task(t.id)),
        EntityRecord::Defect(d) if d.task_id.is_some() => Some(RowKey::task_bug(d.id)),
        EntityRecord::Defect(d) => Some(RowKey::story_bug(d.id)),
        EntityRecord::TestCase(_) | EntityRecord::Sprint(_) => None,
    }
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

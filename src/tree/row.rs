use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::entity::EntityRecord;
use crate::error::DeskError;
use crate::types::{EntityKind, Id};

/// Row kinds of the composed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Story,
    Task,
    Bug,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Story => "story",
            RowKind::Task => "task",
            RowKind::Bug => "bug",
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            RowKind::Story => EntityKind::Requirement,
            RowKind::Task => EntityKind::Task,
            RowKind::Bug => EntityKind::Defect,
        }
    }
}

/// Composite row identity.
///
/// Bugs appear under a story or under a task, so their key also carries the
/// parent row kind. Rendered as `story-1`, `task-7`, `task-bug-12`,
/// `story-bug-12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub kind: RowKind,
    pub parent: Option<RowKind>,
    pub id: Id,
}

impl RowKey {
    pub fn story(id: Id) -> Self {
        Self {
            kind: RowKind::Story,
            parent: None,
            id,
        }
    }

    pub fn task(id: Id) -> Self {
        Self {
            kind: RowKind::Task,
            parent: None,
            id,
        }
    }

    /// A bug attached to a task.
    pub fn task_bug(id: Id) -> Self {
        Self {
            kind: RowKind::Bug,
            parent: Some(RowKind::Task),
            id,
        }
    }

    /// A bug attached directly to a story.
    pub fn story_bug(id: Id) -> Self {
        Self {
            kind: RowKind::Bug,
            parent: Some(RowKind::Story),
            id,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.kind.entity_kind()
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "{}-{}-{}", parent.as_str(), self.kind.as_str(), self.id),
            None => write!(f, "{}-{}", self.kind.as_str(), self.id),
        }
    }
}

impl FromStr for RowKey {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DeskError::InvalidRowKey(s.to_string());
        let (prefix, id) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        let id: Id = id.parse().map_err(|_| invalid())?;
        match prefix {
            "story" => Ok(RowKey::story(id)),
            "task" => Ok(RowKey::task(id)),
            "task-bug" => Ok(RowKey::task_bug(id)),
            "story-bug" => Ok(RowKey::story_bug(id)),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for RowKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Child cardinalities. Only one level of nesting below a story is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChildCounts {
    pub tasks_count: usize,
    pub bugs_count: usize,
    pub children_count: usize,
}

impl ChildCounts {
    pub fn new(tasks_count: usize, bugs_count: usize) -> Self {
        Self {
            tasks_count,
            bugs_count,
            children_count: tasks_count + bugs_count,
        }
    }
}

/// One visible row of the flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub key: RowKey,
    /// Indentation depth, 0 for stories.
    pub level: usize,
    pub record: EntityRecord,
    pub counts: ChildCounts,
    /// Whether an expand affordance renders.
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
}

impl TreeRow {
    pub fn kind(&self) -> RowKind {
        self.key.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(RowKey::story(1).to_string(), "story-1");
        assert_eq!(RowKey::task(7).to_string(), "task-7");
        assert_eq!(RowKey::task_bug(12).to_string(), "task-bug-12");
        assert_eq!(RowKey::story_bug(12).to_string(), "story-bug-12");
    }

    #[test]
    fn test_key_parse() {
        assert_eq!("task-bug-12".parse::<RowKey>().unwrap(), RowKey::task_bug(12));
        assert_eq!("story-3".parse::<RowKey>().unwrap(), RowKey::story(3));
        assert!("bug-3".parse::<RowKey>().is_err());
        assert!("story-x".parse::<RowKey>().is_err());
        assert!("story".parse::<RowKey>().is_err());
    }

    #[test]
    fn test_nested_bug_keys_differ_by_parent() {
        assert_ne!(RowKey::task_bug(5), RowKey::story_bug(5));
        assert_eq!(RowKey::task_bug(5).entity_kind(), EntityKind::Defect);
    }

    #[test]
    fn test_counts() {
        let counts = ChildCounts::new(2, 1);
        assert_eq!(counts.children_count, 3);
    }
}

//! Tree composition.
//!
//! Merges the requirement, task and defect collections into a hierarchy of
//! [`TreeNode`]s and flattens it into visible [`TreeRow`]s according to an
//! expansion set. Composition is pure: the same inputs and sets always give
//! the same rows.

use std::collections::BTreeSet;

use crate::entity::{Defect, EntityRecord, Requirement, Task};
use crate::types::Id;

use super::row::{ChildCounts, RowKey, TreeRow};

/// The three collections a tree is built from.
///
/// A collection whose fetch failed is passed as empty, which suppresses the
/// subtrees it would have produced.
#[derive(Debug, Clone, Copy)]
pub struct TreeInput<'a> {
    pub requirements: &'a [Requirement],
    pub tasks: &'a [Task],
    pub defects: &'a [Defect],
    /// Nesting is only built inside a sprint-scoped view.
    pub sprint_scoped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub key: RowKey,
    pub record: EntityRecord,
    pub counts: ChildCounts,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(key: RowKey, record: EntityRecord) -> Self {
        Self {
            key,
            record,
            counts: ChildCounts::default(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub roots: Vec<TreeNode>,
}

pub fn compose(input: TreeInput<'_>) -> Tree {
    let roots = input
        .requirements
        .iter()
        .map(|req| {
            let record = EntityRecord::Requirement(req.clone());
            if input.sprint_scoped {
                story_node(req, record, input.tasks, input.defects)
            } else {
                TreeNode::leaf(RowKey::story(req.id), record)
            }
        })
        .collect();
    Tree { roots }
}

fn story_node(
    req: &Requirement,
    record: EntityRecord,
    tasks: &[Task],
    defects: &[Defect],
) -> TreeNode {
    let mut own_tasks: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.requirement_id == Some(req.id))
        .collect();
    own_tasks.sort_by_key(|t| position(&req.task_ids, t.id));

    let task_nodes: Vec<TreeNode> = own_tasks
        .into_iter()
        .map(|task| {
            let bugs: Vec<TreeNode> = defects
                .iter()
                .filter(|d| d.task_id == Some(task.id))
                .map(|d| TreeNode::leaf(RowKey::task_bug(d.id), EntityRecord::Defect(d.clone())))
                .collect();
            TreeNode {
                key: RowKey::task(task.id),
                record: EntityRecord::Task(task.clone()),
                counts: ChildCounts::new(0, bugs.len()),
                children: bugs,
            }
        })
        .collect();

    let mut direct: Vec<&Defect> = defects
        .iter()
        .filter(|d| d.requirement_id == Some(req.id) && d.task_id.is_none())
        .collect();
    direct.sort_by_key(|d| position(&req.defect_ids, d.id));
    let bug_nodes = direct
        .into_iter()
        .map(|d| TreeNode::leaf(RowKey::story_bug(d.id), EntityRecord::Defect(d.clone())));

    let tasks_count = task_nodes.len();
    let mut children = task_nodes;
    children.extend(bug_nodes);
    let counts = ChildCounts::new(tasks_count, children.len() - tasks_count);

    TreeNode {
        key: RowKey::story(req.id),
        record,
        counts,
        children,
    }
}

/// Order children the way the parent lists them; unlisted ones go last.
fn position(order: &[Id], id: Id) -> usize {
    order.iter().position(|o| *o == id).unwrap_or(usize::MAX)
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every node, depth first, whether visible or not.
    pub fn nodes(&self) -> Vec<&TreeNode> {
        fn walk<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
            out.push(node);
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }

    pub fn find(&self, key: &RowKey) -> Option<&TreeNode> {
        self.nodes().into_iter().find(|n| n.key == *key)
    }

    pub fn all_keys(&self) -> BTreeSet<RowKey> {
        self.nodes().into_iter().map(|n| n.key).collect()
    }

    /// Keys of every node with at least one child.
    pub fn expandable_keys(&self) -> BTreeSet<RowKey> {
        self.nodes()
            .into_iter()
            .filter(|n| !n.children.is_empty())
            .map(|n| n.key)
            .collect()
    }

    /// Flatten into visible rows. Children of a node appear only when its key
    /// is in `expanded`.
    pub fn rows(&self, expanded: &ExpansionSet, selected: &BTreeSet<RowKey>) -> Vec<TreeRow> {
        fn emit(
            node: &TreeNode,
            level: usize,
            expanded: &ExpansionSet,
            selected: &BTreeSet<RowKey>,
            out: &mut Vec<TreeRow>,
        ) {
            let is_expanded = expanded.contains(&node.key);
            out.push(TreeRow {
                key: node.key,
                level,
                record: node.record.clone(),
                counts: node.counts,
                has_children: !node.children.is_empty(),
                expanded: is_expanded,
                selected: selected.contains(&node.key),
            });
            if is_expanded {
                for child in &node.children {
                    emit(child, level + 1, expanded, selected, out);
                }
            }
        }

        let mut out = Vec::new();
        for root in &self.roots {
            emit(root, 0, expanded, selected, &mut out);
        }
        out
    }
}

/// Caller-held set of expanded row keys.
///
/// Toggling is a pure set operation and never triggers a refetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionSet(BTreeSet<RowKey>);

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.0.iter()
    }

    pub fn toggle(&mut self, key: RowKey) {
        if !self.0.remove(&key) {
            self.0.insert(key);
        }
    }

    pub fn expand(&mut self, key: RowKey) {
        self.0.insert(key);
    }

    /// Collapse everything if the set is at least as large as the tree's
    /// expandable set, otherwise expand everything.
    pub fn toggle_all(&mut self, tree: &Tree) {
        let all = tree.expandable_keys();
        if self.0.len() >= all.len() {
            self.0.clear();
        } else {
            self.0 = all;
        }
    }
}

impl FromIterator<RowKey> for ExpansionSet {
    fn from_iter<I: IntoIterator<Item = RowKey>>(iter: I) -> Self {
        ExpansionSet(iter.into_iter().collect())
    }
}

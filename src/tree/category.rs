//! Test-case category tree for the category picker.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::entity::Category;
use crate::types::Id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    pub id: Id,
    pub name: String,
    pub children: Vec<CategoryNode>,
}

/// Assemble flat categories into a forest, siblings sorted by `order`.
///
/// A category whose parent is missing becomes a root. Cycles are broken at
/// the first repeated node.
pub fn build_category_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let known: HashSet<Id> = categories.iter().map(|c| c.id).collect();
    let mut by_parent: HashMap<Option<Id>, Vec<&Category>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|p| known.contains(p) && *p != category.id);
        by_parent.entry(parent).or_default().push(category);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|c| (c.order, c.id));
    }

    fn build(
        parent: Option<Id>,
        by_parent: &HashMap<Option<Id>, Vec<&Category>>,
        seen: &mut HashSet<Id>,
    ) -> Vec<CategoryNode> {
        let Some(siblings) = by_parent.get(&parent) else {
            return Vec::new();
        };
        let mut nodes = Vec::with_capacity(siblings.len());
        for c in siblings {
            if !seen.insert(c.id) {
                continue;
            }
            nodes.push(CategoryNode {
                id: c.id,
                name: c.name.clone(),
                children: build(Some(c.id), by_parent, seen),
            });
        }
        nodes
    }

    let mut seen = HashSet::new();
    build(None, &by_parent, &mut seen)
}

/// Path of names from a root down to `id`, for breadcrumb display.
pub fn category_path(categories: &[Category], id: Id) -> Vec<String> {
    let by_id: HashMap<Id, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let mut path = Vec::new();
    let mut seen = HashSet::new();
    let mut current = by_id.get(&id);
    while let Some(category) = current {
        if !seen.insert(category.id) {
            break;
        }
        path.push(category.name.clone());
        current = category.parent_id.and_then(|p| by_id.get(&p));
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: Id, parent: Option<Id>, name: &str, order: i32) -> Category {
        Category {
            id,
            project_id: 1,
            parent_id: parent,
            name: name.to_string(),
            order,
        }
    }

    #[test]
    fn test_builds_nested_sorted_tree() {
        let flat = vec![
            cat(1, None, "Web", 2),
            cat(2, None, "Mobile", 1),
            cat(3, Some(1), "Login", 0),
            cat(4, Some(3), "OAuth", 0),
        ];
        let tree = build_category_tree(&flat);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "Mobile");
        assert_eq!(tree[1].children[0].children[0].name, "OAuth");
    }

    #[test]
    fn test_orphans_become_roots() {
        let flat = vec![cat(1, Some(99), "Lost", 0)];
        let tree = build_category_tree(&flat);
        assert_eq!(tree[0].id, 1);
    }

    #[test]
    fn test_cycle_does_not_recurse_forever() {
        let flat = vec![cat(1, Some(2), "A", 0), cat(2, Some(1), "B", 0)];
        // Neither is a root, so nothing is reachable.
        assert!(build_category_tree(&flat).is_empty());
        assert_eq!(category_path(&flat, 1), ["B", "A"]);
    }

    #[test]
    fn test_category_path() {
        let flat = vec![cat(1, None, "Web", 0), cat(3, Some(1), "Login", 0)];
        assert_eq!(category_path(&flat, 3), ["Web", "Login"]);
    }
}

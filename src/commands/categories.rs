use std::path::Path;

use owo_colors::OwoColorize;

use super::{BoardSession, print_json};
use crate::error::Result;
use crate::store::RemoteStore;
use crate::tree::{CategoryNode, build_category_tree};
use crate::types::Id;

/// Print the test-case category tree of a project.
pub async fn cmd_categories(board_path: &Path, project: Id, json: bool) -> Result<()> {
    let board = BoardSession::open(board_path)?;
    let categories = board.store.fetch_categories(project).await?;
    let tree = build_category_tree(&categories);

    if json {
        return print_json(&tree);
    }
    if tree.is_empty() {
        println!("No categories defined.");
        return Ok(());
    }
    for root in &tree {
        print_node(root, 0);
    }
    Ok(())
}

fn print_node(node: &CategoryNode, depth: usize) {
    println!("{}{} {}", "  ".repeat(depth), node.name, format!("#{}", node.id).dimmed());
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

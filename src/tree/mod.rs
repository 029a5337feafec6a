//! Requirement / task / defect tree.

pub mod category;
pub mod composer;
pub mod row;
pub mod selection;
pub mod view;

pub use category::{CategoryNode, build_category_tree, category_path};
pub use composer::{ExpansionSet, Tree, TreeInput, TreeNode, compose};
pub use row::{ChildCounts, RowKey, RowKind, TreeRow};
pub use selection::{BulkOutcome, BulkSelection};
pub use view::{ClickOutcome, Collection, RefreshReport, TreeScope, TreeView};

//! Tree view integration tests
//!
//! Exercise the tree controller against the in-memory store: composition of
//! the three collections, expansion and selection bookkeeping, click routing
//! and bulk operations.

mod common;

use std::collections::BTreeSet;

use common::mock_data::{PROJECT, SPRINT, client_for, sprint_board, store_with};
use sprintdesk::entity::{EntityRecord, FieldValue};
use sprintdesk::error::DeskError;
use sprintdesk::interaction::ClickTarget;
use sprintdesk::store::{Fault, RemoteStore};
use sprintdesk::tree::{ClickOutcome, RowKey, RowKind, TreeScope, TreeView};
use sprintdesk::types::EntityKind;

fn sprint_view() -> (TreeView, std::sync::Arc<sprintdesk::store::InMemoryStore>) {
    let store = store_with(sprint_board());
    let client = client_for(store.clone());
    let scope = TreeScope::project(PROJECT, 20).with_sprint(Some(SPRINT));
    (TreeView::new(client, scope), store)
}

fn keys(view: &TreeView) -> Vec<String> {
    view.rows().iter().map(|r| r.key.to_string()).collect()
}

async fn status_of(store: &sprintdesk::store::InMemoryStore, kind: EntityKind, id: u64) -> FieldValue {
    store
        .fetch_entity(kind, id)
        .await
        .unwrap()
        .get_field("status")
        .unwrap()
}

// ============================================================================
// Composition
// ============================================================================

#[tokio::test]
async fn test_sprint_scoped_tree_nests_children() {
    let (mut view, _) = sprint_view();
    assert!(view.refresh().await.is_ok());

    // Equal timestamps order newest id first.
    assert_eq!(keys(&view), ["story-2", "story-1"]);

    view.toggle_expand_all();
    assert_eq!(
        keys(&view),
        [
            "story-2",
            "story-bug-22",
            "story-1",
            "task-10",
            "task-bug-20",
            "task-11",
            "story-bug-21",
        ]
    );
}

#[tokio::test]
async fn test_unscoped_tree_is_flat() {
    let store = store_with(sprint_board());
    let mut view = TreeView::new(client_for(store), TreeScope::project(PROJECT, 20));
    view.refresh().await;

    assert_eq!(keys(&view), ["story-3", "story-2", "story-1"]);
    assert!(view.tree().expandable_keys().is_empty());
    assert!(view.rows().iter().all(|r| r.counts.children_count == 0));
}

#[tokio::test]
async fn test_count_invariant_holds_after_relink() {
    let (mut view, store) = sprint_view();
    view.refresh().await;

    let check = |view: &TreeView| {
        for root in &view.tree().roots {
            let tasks = root.children.iter().filter(|c| c.key.kind == RowKind::Task).count();
            let bugs = root.children.iter().filter(|c| c.key.kind == RowKind::Bug).count();
            assert_eq!(root.counts.children_count, tasks + bugs);
            assert_eq!(root.counts.tasks_count, tasks);
            assert_eq!(root.counts.bugs_count, bugs);
        }
    };
    check(&view);

    // Move defect 22 from requirement 2 to requirement 1.
    let client = client_for(store.clone());
    client.link(EntityKind::Defect, 22, "requirement", 1).await.unwrap();
    view.refresh().await;
    check(&view);

    let story = view.tree().find(&RowKey::story(1)).unwrap();
    assert_eq!(story.counts.bugs_count, 2);
    assert_eq!(view.tree().find(&RowKey::story(2)).unwrap().counts.children_count, 0);
}

#[tokio::test]
async fn test_failed_collection_suppresses_subtree() {
    let (mut view, store) = sprint_view();
    store.fail_next(Fault::Fetch(EntityKind::Task), "gateway timeout");

    let report = view.refresh().await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, EntityKind::Task);
    assert!(view.tasks().is_failed());

    // The story still renders with its direct bug; task rows are gone.
    let story = view.tree().find(&RowKey::story(1)).unwrap();
    assert_eq!(story.counts.tasks_count, 0);
    assert_eq!(story.counts.bugs_count, 1);
    assert!(view.tree().find(&RowKey::task_bug(20)).is_none());

    // Retrying recovers.
    assert!(view.refresh().await.is_ok());
    assert!(view.tree().find(&RowKey::task(10)).is_some());
}

#[tokio::test]
async fn test_failed_requirements_render_empty_tree() {
    let (mut view, store) = sprint_view();
    store.fail_next(Fault::Fetch(EntityKind::Requirement), "boom");
    let report = view.refresh().await;
    assert!(!report.is_ok());
    assert!(view.rows().is_empty());
}

// ============================================================================
// Expansion and keys
// ============================================================================

#[tokio::test]
async fn test_expansion_toggle_is_idempotent() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    view.toggle_expand(RowKey::story(2));
    let before = view.rows();

    for key in [RowKey::story(1), RowKey::task(10), RowKey::story(2)] {
        view.toggle_expand(key);
        view.toggle_expand(key);
        assert_eq!(view.rows(), before);
    }
}

#[tokio::test]
async fn test_keys_are_unique_and_survive_refetch() {
    let (mut view, store) = sprint_view();
    view.refresh().await;
    view.toggle_expand_all();

    let first: Vec<RowKey> = view.rows().iter().map(|r| r.key).collect();
    let unique: BTreeSet<RowKey> = first.iter().copied().collect();
    assert_eq!(unique.len(), first.len());

    // An unrelated change reorders stories but keeps every key and the
    // expansion state.
    let client = client_for(store);
    client
        .mutate(
            EntityKind::Requirement,
            1,
            &sprintdesk::entity::FieldMap::single("priority", FieldValue::choice("high")),
        )
        .await
        .unwrap();
    view.refresh().await;

    let second: BTreeSet<RowKey> = view.rows().iter().map(|r| r.key).collect();
    assert_eq!(second, unique);
    assert!(view.rows().iter().filter(|r| r.has_children).all(|r| r.expanded));
    assert_eq!(view.rows()[0].key, RowKey::story(1));
}

#[tokio::test]
async fn test_expand_all_twice_collapses() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    view.toggle_expand_all();
    assert_eq!(view.expanded().len(), 3);
    view.toggle_expand_all();
    assert!(view.expanded().is_empty());
    assert_eq!(view.rows().len(), 2);
}

#[tokio::test]
async fn test_explicit_expand_keeps_row_open() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    view.toggle_expand_all();
    view.expand(RowKey::story(1));
    view.expand(RowKey::story(1));

    assert!(view.expanded().contains(&RowKey::story(1)));
    assert_eq!(view.rows().len(), 7);
}

// ============================================================================
// Click routing
// ============================================================================

#[tokio::test]
async fn test_click_targets_affect_exactly_one_thing() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    let story = RowKey::story(1);

    let outcome = view.handle_click(ClickTarget::Cell {
        key: story,
        field: "status".to_string(),
    });
    assert_eq!(outcome, ClickOutcome::HandledByEditor);
    assert!(view.selection().is_empty());
    assert!(!view.expanded().contains(&story));

    assert_eq!(
        view.handle_click(ClickTarget::Checkbox(story)),
        ClickOutcome::SelectionToggled {
            key: story,
            selected: true
        }
    );
    assert_eq!(
        view.handle_click(ClickTarget::Expander(story)),
        ClickOutcome::ExpansionToggled {
            key: story,
            expanded: true
        }
    );
    assert_eq!(
        view.handle_click(ClickTarget::Row(RowKey::task(10))),
        ClickOutcome::OpenPanel {
            kind: EntityKind::Task,
            id: 10
        }
    );
    assert_eq!(view.selection().len(), 1);
}

#[tokio::test]
async fn test_non_inline_cell_is_ignored() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    let outcome = view.handle_click(ClickTarget::Cell {
        key: RowKey::story(1),
        field: "title".to_string(),
    });
    assert_eq!(outcome, ClickOutcome::Ignored);
    assert!(view.selection().is_empty());
}

#[tokio::test]
async fn test_inline_edit_invalidates_tree() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    assert!(!view.poll_invalidations());

    let editor = view.editor(RowKey::story_bug(21), "severity").unwrap();
    editor.change_str("blocker").await.unwrap();

    assert!(view.poll_invalidations());
    view.refresh().await;
    let bug = view.tree().find(&RowKey::story_bug(21)).unwrap();
    assert_eq!(bug.record.get_field("severity"), Some(FieldValue::choice("blocker")));
    assert!(!view.is_stale());
}

// ============================================================================
// Bulk operations
// ============================================================================

#[tokio::test]
async fn test_bulk_status_only_touches_story_rows() {
    let (mut view, store) = sprint_view();
    view.refresh().await;
    view.toggle_selection(RowKey::task(10));
    view.toggle_selection(RowKey::story(1));

    let outcome = view.bulk_set_status("approved").await.unwrap();
    assert_eq!(outcome.succeeded, vec![1]);
    assert!(outcome.is_complete_success());
    assert!(view.selection().is_empty());

    assert_eq!(status_of(&store, EntityKind::Requirement, 1).await, FieldValue::choice("approved"));
    assert_eq!(status_of(&store, EntityKind::Task, 10).await, FieldValue::choice("todo"));
}

#[tokio::test]
async fn test_bulk_without_stories_reports_nothing_selected() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    view.toggle_selection(RowKey::task(10));

    let err = view.bulk_set_status("approved").await.unwrap_err();
    assert!(matches!(err, DeskError::NothingSelected));
    assert_eq!(view.selection().len(), 1);
}

#[tokio::test]
async fn test_selecting_a_row_twice_keeps_it_selected() {
    let (mut view, store) = sprint_view();
    view.refresh().await;
    view.select(RowKey::story(1));
    view.select(RowKey::story(1));
    assert_eq!(view.selection().len(), 1);

    let outcome = view.bulk_set_status("approved").await.unwrap();
    assert_eq!(outcome.succeeded, vec![1]);
    assert_eq!(
        status_of(&store, EntityKind::Requirement, 1).await,
        FieldValue::choice("approved")
    );
}

#[tokio::test]
async fn test_bulk_rejects_unknown_status_before_any_request() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    view.poll_invalidations();
    view.toggle_selection(RowKey::story(1));

    assert!(view.bulk_set_status("resolved").await.unwrap_err().is_validation());
    assert!(!view.poll_invalidations());
}

#[tokio::test]
async fn test_bulk_partial_failure() {
    let (mut view, store) = sprint_view();
    view.refresh().await;
    view.select_all_stories();
    store.fail_next(Fault::Mutation(EntityKind::Requirement), "locked");

    let outcome = view.bulk_move_sprint(Some(101)).await.unwrap();
    assert_eq!(outcome.success_count(), 1);
    assert_eq!(outcome.failure_count(), 1);
    assert!(outcome.failed[0].1.contains("locked"));
    assert!(view.selection().is_empty());

    view.refresh().await;
    assert_eq!(view.rows().len(), 1);
}

#[tokio::test]
async fn test_bulk_delete_detaches_children() {
    let (mut view, store) = sprint_view();
    view.refresh().await;
    view.toggle_selection(RowKey::story(2));

    let outcome = view.bulk_delete().await.unwrap();
    assert_eq!(outcome.succeeded, vec![2]);

    let bug = store.fetch_entity(EntityKind::Defect, 22).await.unwrap();
    assert_eq!(bug.get_field("requirement"), Some(FieldValue::Ref(None)));
    view.refresh().await;
    assert_eq!(keys(&view), ["story-1"]);
}

// ============================================================================
// Quick create and navigation
// ============================================================================

#[tokio::test]
async fn test_quick_create_validates_and_lands_in_sprint() {
    let (mut view, _) = sprint_view();
    view.refresh().await;

    assert!(view.quick_create("   ").await.unwrap_err().is_validation());

    let created = view.quick_create("Password reset").await.unwrap();
    assert_eq!(created.sprint_id, Some(SPRINT));
    assert_eq!(created.number, "REQ-004");

    assert!(view.poll_invalidations());
    view.refresh().await;
    assert_eq!(view.rows()[0].key, RowKey::story(created.id));
    assert_eq!(view.total(), 3);
}

#[tokio::test]
async fn test_requirement_ids_follow_page_order() {
    let store = store_with(sprint_board());
    let mut view = TreeView::new(client_for(store), TreeScope::project(PROJECT, 2));
    view.refresh().await;
    assert_eq!(view.requirement_ids(), vec![3, 2]);
    assert_eq!(view.total(), 3);

    view.set_page(2);
    assert!(view.is_stale());
    view.refresh().await;
    assert_eq!(view.requirement_ids(), vec![1]);
}

#[tokio::test]
async fn test_scope_change_clears_selection() {
    let (mut view, _) = sprint_view();
    view.refresh().await;
    view.toggle_selection(RowKey::story(1));
    view.set_scope(TreeScope::project(PROJECT, 20));
    assert!(view.selection().is_empty());
    view.refresh().await;
    assert!(matches!(view.rows()[0].record, EntityRecord::Requirement(_)));
}

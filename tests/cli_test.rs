mod common;

use common::DeskTest;
use common::mock_data::sprint_board;
use serde_json::Value;
use serial_test::serial;

fn desk_with_board() -> DeskTest {
    let desk = DeskTest::new();
    let yaml = serde_yaml_ng::to_string(&sprint_board()).unwrap();
    desk.write_board(&yaml);
    desk
}

fn json(output: &str) -> Value {
    serde_json::from_str(output).expect("command should print JSON")
}

// ============================================================================
// tree
// ============================================================================

#[test]
#[serial]
fn test_tree_lists_sprint_requirements() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let output = desk.run_success(&["tree", "--board", &board, "--project", "10", "--sprint", "100"]);

    assert!(output.contains("REQ-001"));
    assert!(output.contains("Signup"));
    assert!(!output.contains("Billing"));
    assert!(!output.contains("task-10"));
    assert!(output.contains("2 requirement(s), page 1/1"));
}

#[test]
#[serial]
fn test_tree_expand_shows_children() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let output = desk.run_success(&[
        "tree", "--board", &board, "--project", "10", "--sprint", "100", "--expand", "story-1",
    ]);

    assert!(output.contains("task-10"));
    assert!(output.contains("story-bug-21"));
    // Task 10 itself stays collapsed.
    assert!(!output.contains("task-bug-20"));
    assert!(!output.contains("story-bug-22"));
}

#[test]
#[serial]
fn test_tree_json_reports_counts() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let output = desk.run_success(&[
        "tree", "--board", &board, "--project", "10", "--sprint", "100", "--expand-all", "--json",
    ]);
    let value = json(&output);

    assert_eq!(value["total"], 2);
    let rows = value["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 7);
    let story = rows.iter().find(|r| r["key"] == "story-1").unwrap();
    assert_eq!(story["counts"]["tasks_count"], 2);
    assert_eq!(story["counts"]["bugs_count"], 1);
    assert_eq!(story["counts"]["children_count"], 3);
}

#[test]
#[serial]
fn test_tree_expand_key_stays_open_with_expand_all() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let value = json(&desk.run_success(&[
        "tree", "--board", &board, "--project", "10", "--sprint", "100", "--expand-all", "--expand",
        "story-1", "--json",
    ]));

    let rows = value["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 7);
    let story = rows.iter().find(|r| r["key"] == "story-1").unwrap();
    assert_eq!(story["expanded"], true);
}

#[test]
#[serial]
fn test_tree_rejects_bad_row_key() {
    let desk = desk_with_board();
    let board = desk.board_path();
    desk.run_failure(&["tree", "--board", &board, "--project", "10", "--expand", "epic-1"]);
}

// ============================================================================
// set / bulk-status
// ============================================================================

#[test]
#[serial]
fn test_set_writes_board() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let output = desk.run_success(&["set", "--board", &board, "story", "1", "status", "approved"]);
    assert!(output.contains("REQ-001"));
    assert!(output.contains("approved"));

    let shown = json(&desk.run_success(&["show", "--board", &board, "requirement", "1", "--json"]));
    assert_eq!(shown["fields"]["status"]["value"], "approved");
}

#[test]
#[serial]
fn test_set_rejects_value_outside_vocabulary() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let before = desk.read_board();
    let stderr = desk.run_failure(&["set", "--board", &board, "task", "10", "status", "shipped"]);
    assert!(stderr.contains("shipped"));
    assert!(stderr.contains("todo, in_progress, done"));
    assert_eq!(desk.read_board(), before);
}

#[test]
#[serial]
fn test_bulk_status_skips_non_story_rows() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let output = desk.run_success(&[
        "bulk-status", "--board", &board, "--project", "10", "--sprint", "100", "approved",
        "story-1", "task-10", "--json",
    ]);
    let value = json(&output);
    assert_eq!(value["succeeded"], serde_json::json!([1]));
    assert_eq!(value["failed"], serde_json::json!([]));

    let task = json(&desk.run_success(&["show", "--board", &board, "task", "10", "--json"]));
    assert_eq!(task["fields"]["status"]["value"], "todo");
}

#[test]
#[serial]
fn test_bulk_status_repeated_key_selects_once() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let value = json(&desk.run_success(&[
        "bulk-status", "--board", &board, "--project", "10", "--sprint", "100", "approved",
        "story-1", "story-1", "--json",
    ]));
    assert_eq!(value["succeeded"], serde_json::json!([1]));
}

#[test]
#[serial]
fn test_bulk_status_without_stories_fails() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let stderr = desk.run_failure(&[
        "bulk-status", "--board", &board, "--project", "10", "--sprint", "100", "approved", "task-10",
    ]);
    assert!(stderr.contains("no eligible rows selected"));
}

// ============================================================================
// show
// ============================================================================

#[test]
#[serial]
fn test_show_json_includes_badges() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let value = json(&desk.run_success(&["show", "--board", &board, "requirement", "1", "--json"]));

    assert_eq!(value["number"], "REQ-001");
    assert_eq!(value["mode"], "viewing");
    assert_eq!(value["width"]["mode"], "compressed");
    assert_eq!(value["width"]["value"], 1000);
    let tabs = value["tabs"].as_array().unwrap();
    let keys: Vec<&str> = tabs.iter().map(|t| t["key"].as_str().unwrap()).collect();
    assert_eq!(keys, ["detail", "tasks", "test_cases", "defects", "history"]);
    assert_eq!(tabs[1]["badge"]["count"], 2);
}

#[test]
#[serial]
fn test_show_related_tab() {
    let desk = desk_with_board();
    let board = desk.board_path();
    let output = desk.run_success(&["show", "--board", &board, "story", "1", "--tab", "tasks"]);
    assert!(output.contains("TASK-001"));
    assert!(output.contains("TASK-002"));

    desk.run_failure(&["show", "--board", &board, "story", "1", "--tab", "attachments"]);
}

// ============================================================================
// config
// ============================================================================

#[test]
#[serial]
fn test_config_set_changes_page_size() {
    let desk = desk_with_board();
    let board = desk.board_path();
    desk.run_success(&["config", "set", "page_size", "2"]);

    let config = json(&desk.run_success(&["config", "show", "--json"]));
    assert_eq!(config["config"]["page_size"], 2);

    let output = desk.run_success(&["tree", "--board", &board, "--project", "10"]);
    assert!(output.contains("3 requirement(s), page 1/2"));
}

#[test]
#[serial]
fn test_config_set_rejects_unknown_key() {
    let desk = DeskTest::new();
    let stderr = desk.run_failure(&["config", "set", "theme", "dark"]);
    assert!(stderr.contains("unknown config key"));
}

// ============================================================================
// categories
// ============================================================================

#[test]
#[serial]
fn test_categories_render_as_tree() {
    use sprintdesk::entity::Category;

    let desk = DeskTest::new();
    let mut board = sprint_board();
    board.categories = vec![
        Category { id: 40, project_id: 10, parent_id: None, name: "Checkout".to_string(), order: 1 },
        Category { id: 41, project_id: 10, parent_id: None, name: "Accounts".to_string(), order: 0 },
        Category { id: 42, project_id: 10, parent_id: Some(41), name: "Password".to_string(), order: 0 },
    ];
    board.test_cases[0].category_id = Some(42);
    desk.write_board(&serde_yaml_ng::to_string(&board).unwrap());
    let path = desk.board_path();

    let value = json(&desk.run_success(&["categories", "--board", &path, "--project", "10", "--json"]));
    assert_eq!(value[0]["name"], "Accounts");
    assert_eq!(value[0]["children"][0]["name"], "Password");
    assert_eq!(value[1]["name"], "Checkout");

    let shown = desk.run_success(&["show", "--board", &path, "test_case", "30"]);
    assert!(shown.contains("Accounts / Password"));
}

//! Integration tests for the `tb` CLI.
//!
//! Each test creates a temp board directory, runs `tb` as a subprocess,
//! and verifies stdout and/or file contents.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the path to the built `tb` binary.
fn tb_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tb");
    path
}

fn tb(dir: &Path, args: &[&str]) -> Output {
    Command::new(tb_bin())
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run tb")
}

fn tb_ok(dir: &Path, args: &[&str]) -> String {
    let out = tb(dir, args);
    assert!(
        out.status.success(),
        "tb {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn tb_err(dir: &Path, args: &[&str]) -> String {
    let out = tb(dir, args);
    assert!(
        !out.status.success(),
        "tb {:?} unexpectedly succeeded: {}",
        args,
        String::from_utf8_lossy(&out.stdout)
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}

fn init_board() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tb_ok(tmp.path(), &["init", "--name", "test-board"]);
    tmp
}

fn entity_json(dir: &Path, id: &str) -> serde_json::Value {
    let out = tb_ok(dir, &["show", id, "--json"]);
    serde_json::from_str(&out).unwrap()
}

#[test]
fn init_creates_board_files() {
    let tmp = TempDir::new().unwrap();
    let out = tb_ok(tmp.path(), &["init", "--name", "demo"]);
    assert!(out.contains("initialized board 'demo'"));
    assert!(tmp.path().join("tablero/config.toml").exists());
    assert!(tmp.path().join("tablero/board.json").exists());
}

#[test]
fn init_twice_requires_force() {
    let tmp = init_board();
    let err = tb_err(tmp.path(), &["init"]);
    assert!(err.contains("already exists"));
    tb_ok(tmp.path(), &["init", "--force"]);
}

#[test]
fn new_quote_lands_in_first_stage() {
    let tmp = init_board();
    let out = tb_ok(
        tmp.path(),
        &["new", "quotes", "ACME", "--amount", "100000"],
    );
    assert!(out.contains("created Q-001 in Contacted"));
    let entity = entity_json(tmp.path(), "Q-001");
    assert_eq!(entity["entity"]["stage"], "contacted");
    assert_eq!(entity["entity"]["amount"], 100000);
    assert_eq!(entity["history"].as_array().unwrap().len(), 1);
}

#[test]
fn free_move_commits_without_form_data() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "quotes", "ACME"]);
    // destination by display name, accent-insensitive lookup
    let out = tb_ok(tmp.path(), &["mv", "Q-001", "Quoted"]);
    assert!(out.contains("moved Q-001: Contacted -> Quoted"));
    let entity = entity_json(tmp.path(), "Q-001");
    assert_eq!(entity["entity"]["stage"], "quoted");
    assert_eq!(entity["history"].as_array().unwrap().len(), 2);
}

#[test]
fn money_field_prefills_from_current_amount() {
    let tmp = init_board();
    tb_ok(
        tmp.path(),
        &["new", "quotes", "ACME", "--amount", "100000"],
    );
    // no --set: the pre-filled amount is submitted unchanged
    let out = tb_ok(tmp.path(), &["mv", "Q-001", "negotiation"]);
    assert!(out.contains("moved Q-001"));
    assert!(!out.contains("amount is now"));
    let entity = entity_json(tmp.path(), "Q-001");
    assert_eq!(entity["entity"]["amount"], 100000);
}

#[test]
fn edited_amount_is_persisted_and_recorded() {
    let tmp = init_board();
    tb_ok(
        tmp.path(),
        &["new", "quotes", "ACME", "--amount", "100000"],
    );
    let out = tb_ok(
        tmp.path(),
        &["mv", "Q-001", "negotiation", "--set", "precio=120000"],
    );
    assert!(out.contains("amount is now 120000"));
    let entity = entity_json(tmp.path(), "Q-001");
    assert_eq!(entity["entity"]["amount"], 120000);
    let history = entity["history"].as_array().unwrap();
    let last = history.last().unwrap();
    assert_eq!(last["snapshot"]["precio"], 120000);
    assert_eq!(last["snapshot"]["previous_amount"], 100000);
    assert_eq!(last["snapshot"]["new_amount"], 120000);
}

#[test]
fn unknown_form_key_is_rejected() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "quotes", "ACME"]);
    let err = tb_err(
        tmp.path(),
        &["mv", "Q-001", "negotiation", "--set", "descuento=5"],
    );
    assert!(err.contains("has no field"));
}

#[test]
fn kickoff_stage_spawns_project() {
    let tmp = init_board();
    tb_ok(
        tmp.path(),
        &["new", "quotes", "ACME", "--amount", "50000"],
    );
    let out = tb_ok(tmp.path(), &["mv", "Q-001", "Project to start"]);
    assert!(out.contains("spawned project P-001"));
    let project = entity_json(tmp.path(), "P-001");
    assert_eq!(project["entity"]["stage"], "technical-visit");
    assert_eq!(project["entity"]["source_quote"], "Q-001");
    assert_eq!(project["entity"]["client"], "ACME");
}

#[test]
fn reorder_round_trips_through_list() {
    let tmp = init_board();
    for client in ["A", "B", "C"] {
        tb_ok(tmp.path(), &["new", "quotes", client]);
        let id = format!("Q-00{}", ["A", "B", "C"].iter().position(|c| c == &client).unwrap() + 1);
        tb_ok(tmp.path(), &["mv", &id, "Quoted"]);
    }
    // lane is most-recent-first: Q-003, Q-002, Q-001
    tb_ok(
        tmp.path(),
        &["reorder", "quoted", "Q-001", "Q-003", "Q-002"],
    );
    let out = tb_ok(tmp.path(), &["list", "quotes", "--stage", "quoted", "--json"]);
    let board: serde_json::Value = serde_json::from_str(&out).unwrap();
    let ids: Vec<&str> = board["stages"][0]["entities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["Q-001", "Q-003", "Q-002"]);
}

#[test]
fn undo_reverts_once_then_reports_no_op() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "quotes", "ACME"]);
    tb_ok(tmp.path(), &["mv", "Q-001", "Quoted"]);
    let out = tb_ok(tmp.path(), &["undo", "Q-001"]);
    assert!(out.contains("Q-001 returned to Contacted"));
    let entity = entity_json(tmp.path(), "Q-001");
    assert_eq!(entity["entity"]["stage"], "contacted");
    assert_eq!(entity["history"].as_array().unwrap().len(), 1);
    // second undo: soft no-op with a notice
    let out = tb_ok(tmp.path(), &["undo", "Q-001"]);
    assert!(out.contains("nothing to undo"));
}

#[test]
fn stage_delete_guards() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "quotes", "ACME"]);
    tb_ok(tmp.path(), &["new", "quotes", "Initech"]);
    // non-empty
    let err = tb_err(tmp.path(), &["stage", "rm", "contacted"]);
    assert!(err.contains("move its 2 entities first"));
    // locked
    let err = tb_err(tmp.path(), &["stage", "rm", "finished"]);
    assert!(err.contains("locked"));
    // empty + unlocked works
    tb_ok(tmp.path(), &["stage", "rm", "quoted"]);
    let out = tb_ok(tmp.path(), &["stages", "quotes"]);
    assert!(!out.contains("Quoted"));
}

#[test]
fn stages_display_order_puts_terminal_last() {
    let tmp = init_board();
    let out = tb_ok(tmp.path(), &["stages", "quotes", "--json"]);
    let stages: serde_json::Value = serde_json::from_str(&out).unwrap();
    let ids: Vec<&str> = stages
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "contacted",
            "quoted",
            "negotiation",
            "project-to-start",
            "not-realized",
            "finished"
        ]
    );
}

#[test]
fn record_guard_blocks_then_advances() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "projects", "ACME"]);
    tb_ok(
        tmp.path(),
        &["record", "P-001", "technical-visit", "--advance", "yes"],
    );
    let entity = entity_json(tmp.path(), "P-001");
    assert_eq!(entity["entity"]["stage"], "measurement");

    // the measurement guard wants three attachments
    let err = tb_err(
        tmp.path(),
        &["record", "P-001", "measurement", "--advance", "yes", "--attach", "a.jpg"],
    );
    assert!(err.contains("at least 3 attachments"));

    tb_ok(
        tmp.path(),
        &[
            "record", "P-001", "measurement", "--advance", "yes", "--attach", "a.jpg",
            "--attach", "b.jpg", "--attach", "c.jpg",
        ],
    );
    let entity = entity_json(tmp.path(), "P-001");
    assert_eq!(entity["entity"]["stage"], "verification");
}

#[test]
fn workshop_route_branches_and_completion_finishes_quote() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "quotes", "ACME", "--amount", "80000"]);
    tb_ok(tmp.path(), &["mv", "Q-001", "Project to start"]);
    // walk the project to the workshop
    tb_ok(tmp.path(), &["record", "P-001", "technical-visit", "--advance", "yes"]);
    tb_ok(
        tmp.path(),
        &[
            "record", "P-001", "measurement", "--advance", "yes", "--attach", "a.jpg",
            "--attach", "b.jpg", "--attach", "c.jpg",
        ],
    );
    tb_ok(tmp.path(), &["record", "P-001", "verification", "--advance", "yes"]);
    tb_ok(tmp.path(), &["record", "P-001", "workshop", "--route", "logistics"]);
    let entity = entity_json(tmp.path(), "P-001");
    assert_eq!(entity["entity"]["stage"], "logistics");

    // completing the project moves the source quote cross-pipeline
    let out = tb_ok(tmp.path(), &["record", "P-001", "logistics", "--advance", "yes"]);
    assert!(out.contains("finished source quote Q-001"));
    let quote = entity_json(tmp.path(), "Q-001");
    assert_eq!(quote["entity"]["stage"], "finished");
}

#[test]
fn delete_is_guarded_by_stage_flag() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "quotes", "ACME"]);
    // contacted is removable
    tb_ok(tmp.path(), &["delete", "Q-001"]);
    let err = tb_err(tmp.path(), &["show", "Q-001"]);
    assert!(err.contains("not found"));

    tb_ok(tmp.path(), &["new", "quotes", "Initech"]);
    tb_ok(tmp.path(), &["mv", "Q-002", "Quoted"]);
    let err = tb_err(tmp.path(), &["delete", "Q-002"]);
    assert!(err.contains("does not allow deleting"));
}

#[test]
fn board_dir_flag_points_at_another_directory() {
    let tmp = init_board();
    tb_ok(tmp.path(), &["new", "quotes", "ACME"]);
    let elsewhere = TempDir::new().unwrap();
    let out = tb_ok(
        elsewhere.path(),
        &["-C", tmp.path().to_str().unwrap(), "list", "quotes"],
    );
    assert!(out.contains("Q-001"));
}

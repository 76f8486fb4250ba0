mod support;

use std::fs;

use chrono::DateTime;
use predicates::str::contains;
use serde_json::Value;

use support::TestData;

#[test]
fn new_task_reports_points_by_priority() {
    let data = TestData::new();

    for (priority, points) in [("low", 5), ("MEDIUM", 10), ("High", 15), ("urgent", 25)] {
        let value = data.json_as(
            "alice",
            &["task", "new", "Quarterly report", "--priority", priority],
        );
        assert_eq!(value["command"], "task new");
        assert_eq!(value["data"]["points"], points);
        assert_eq!(value["data"]["is_completed"], false);
    }
}

#[test]
fn new_task_rejects_short_title() {
    let data = TestData::new();

    data.cmd_as("alice")
        .args(["task", "new", "  ab "])
        .assert()
        .code(2)
        .stderr(contains("title must be at least 3 characters long"));
}

#[test]
fn new_task_accepts_optional_fields() {
    let data = TestData::new();

    let value = data.json_as(
        "alice",
        &[
            "task",
            "new",
            "Book flights",
            "--description",
            "  window seat  ",
            "--category",
            "travel",
            "--due",
            "2026-09-01",
        ],
    );
    let task = &value["data"];
    assert_eq!(task["description"], "window seat");
    assert_eq!(task["category"], "travel");
    assert_eq!(task["due_at"], "2026-09-01T00:00:00Z");
}

#[test]
fn list_paginates_newest_first() {
    let data = TestData::new();
    let ids: Vec<String> = (1..=3)
        .map(|n| data.new_task("alice", &format!("Chore number {n}"), "LOW"))
        .collect();
    data.new_task("bob", "Someone else's chore", "LOW");

    let value = data.json_as("alice", &["task", "list", "--limit", "2"]);
    let tasks = value["data"]["tasks"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["id"], ids[2].as_str());
    assert_eq!(tasks[1]["id"], ids[1].as_str());

    let pagination = &value["data"]["pagination"];
    assert_eq!(pagination["current_page"], 1);
    assert_eq!(pagination["total_pages"], 2);
    assert_eq!(pagination["total_tasks"], 3);
    assert_eq!(pagination["has_next_page"], true);
    assert_eq!(pagination["has_prev_page"], false);

    let value = data.json_as("alice", &["task", "list", "--limit", "2", "--page", "2"]);
    let tasks = value["data"]["tasks"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], ids[0].as_str());

    data.cmd_as("alice")
        .args(["task", "list", "--page", "0"])
        .assert()
        .code(2);
}

#[test]
fn show_resolves_prefix_and_hides_other_users() {
    let data = TestData::new();
    let id = data.new_task("alice", "Renew passport", "HIGH");

    let value = data.json_as("alice", &["task", "show", &id[..16]]);
    assert_eq!(value["data"]["id"], id.as_str());
    assert_eq!(value["data"]["title"], "Renew passport");

    data.cmd_as("bob")
        .args(["task", "show", &id])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));
}

#[test]
fn edit_updates_fields_and_points() {
    let data = TestData::new();
    let id = data.new_task("alice", "Fix the fence", "LOW");

    let value = data.json_as(
        "alice",
        &["task", "edit", &id, "--title", "Fix the garden fence", "--priority", "urgent"],
    );
    assert_eq!(value["data"]["title"], "Fix the garden fence");
    assert_eq!(value["data"]["priority"], "URGENT");
    assert_eq!(value["data"]["points"], 25);
    assert_eq!(value["data"]["is_completed"], false);

    data.cmd_as("alice")
        .args(["task", "edit", &id, "--title", "no"])
        .assert()
        .code(2);
    data.cmd_as("alice")
        .args(["task", "edit", &id])
        .assert()
        .code(2)
        .stderr(contains("no fields to update"));
    data.cmd_as("alice")
        .args(["task", "edit", &id, "--priority", "critical"])
        .assert()
        .code(2)
        .stderr(contains("unknown priority"));
}

#[test]
fn done_awards_points_once() {
    let data = TestData::new();
    let id = data.new_task("alice", "Submit taxes", "HIGH");

    let value = data.json_as("alice", &["task", "done", &id]);
    assert_eq!(value["command"], "task done");
    assert_eq!(value["data"]["completed"], true);
    assert_eq!(value["data"]["points_earned"], 15);
    assert_eq!(value["data"]["stats"]["total_points"], 15);
    assert_eq!(value["data"]["stats"]["current_streak"], 1);
    assert_eq!(value["data"]["stats"]["best_streak"], 1);
    assert_eq!(value["data"]["stats"]["tasks_completed"], 1);
    let completed_at = value["data"]["task"]["completed_at"].clone();

    let value = data.json_as("alice", &["task", "done", &id]);
    assert_eq!(value["data"]["completed"], false);
    assert!(value["data"].get("stats").is_none());
    assert_eq!(value["data"]["task"]["completed_at"], completed_at);
    assert!(value["warnings"][0]
        .as_str()
        .expect("warning")
        .contains("already completed"));

    let value = data.json_as("alice", &["stats"]);
    assert_eq!(value["data"]["user_stats"]["total_points"], 15);
    assert_eq!(value["data"]["user_stats"]["tasks_completed"], 1);
}

#[test]
fn backdated_done_records_completion_time_only() {
    let data = TestData::new();
    let id = data.new_task("alice", "File expenses", "MEDIUM");

    let value = data.json_as(
        "alice",
        &["task", "done", &id, "--at", "2001-01-01T00:00:00Z"],
    );
    let task = &value["data"]["task"];
    assert_eq!(task["completed_at"], "2001-01-01T00:00:00Z");

    let stamp = |field: &str| {
        DateTime::parse_from_rfc3339(task[field].as_str().expect("timestamp"))
            .expect("rfc3339")
    };
    assert!(stamp("updated_at") >= stamp("created_at"));

    let store: Value =
        serde_json::from_str(&fs::read_to_string(data.file("store.json")).expect("store"))
            .expect("store json");
    assert_eq!(store["tasks"][0]["is_completed"], true);
    assert_eq!(store["stats"]["alice"]["total_points"], 10);
    assert!(!data.file("tasks.json").exists());
}

#[test]
fn edit_keeps_completion_state() {
    let data = TestData::new();
    let id = data.new_task("alice", "Call the plumber", "MEDIUM");
    data.json_as("alice", &["task", "done", &id, "--at", "2026-03-10T09:00:00Z"]);

    let value = data.json_as("alice", &["task", "edit", &id, "--category", "home"]);
    assert_eq!(value["data"]["is_completed"], true);
    assert_eq!(value["data"]["completed_at"], "2026-03-10T09:00:00Z");
}

#[test]
fn reopen_clears_completion_but_keeps_stats() {
    let data = TestData::new();
    let id = data.new_task("alice", "Clean the garage", "URGENT");
    data.json_as("alice", &["task", "done", &id]);

    let value = data.json_as("alice", &["task", "reopen", &id]);
    assert_eq!(value["data"]["reopened"], true);
    assert_eq!(value["data"]["task"]["is_completed"], false);
    assert!(value["data"]["task"].get("completed_at").is_none());

    let value = data.json_as("alice", &["stats"]);
    assert_eq!(value["data"]["user_stats"]["total_points"], 25);
    assert_eq!(value["data"]["completed_tasks"], 0);

    let value = data.json_as("alice", &["task", "reopen", &id]);
    assert_eq!(value["data"]["reopened"], false);
}

#[test]
fn rm_deletes_task() {
    let data = TestData::new();
    let id = data.new_task("alice", "Old errand", "LOW");

    let value = data.json_as("alice", &["task", "rm", &id]);
    assert_eq!(value["data"]["id"], id.as_str());
    assert_eq!(value["data"]["title"], "Old errand");

    data.cmd_as("alice")
        .args(["task", "show", &id])
        .assert()
        .code(2);
}

#[test]
fn events_are_written_as_jsonl() {
    let data = TestData::new();
    let events = data.file("events.jsonl");
    let events_arg = events.to_str().expect("utf8 path");

    let output = data
        .cmd_as("alice")
        .args(["--events", events_arg, "task", "new", "Walk the dog", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("task json");
    let id = value["data"]["id"].as_str().expect("id").to_string();

    for args in [["task", "done"], ["task", "reopen"], ["task", "rm"]] {
        data.cmd_as("alice")
            .args(["--events", events_arg])
            .args(args)
            .arg(&id)
            .assert()
            .success();
    }

    let content = std::fs::read_to_string(&events).expect("events file");
    let kinds: Vec<String> = content
        .lines()
        .map(|line| {
            let event: serde_json::Value = serde_json::from_str(line).expect("event json");
            assert_eq!(event["schema_version"], "questlog.event.v1");
            assert_eq!(event["user"], "alice");
            assert_eq!(event["data"]["id"], id.as_str());
            event["event"].as_str().expect("kind").to_string()
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["task_created", "task_completed", "task_reopened", "task_deleted"]
    );
}

#[test]
fn events_to_stdout_replace_command_output() {
    let data = TestData::new();

    let output = data
        .cmd_as("alice")
        .args(["--events", "-", "task", "new", "Feed the cat", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    let event: serde_json::Value = serde_json::from_str(lines[0]).expect("event json");
    assert_eq!(event["event"], "task_created");
}

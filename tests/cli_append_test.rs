//! Integration tests for `bp append`: conflict gating, resolutions, and
//! stale-item pruning.

mod common;

use common::{TestEnv, FULL_MODEL_YAML};
use predicates::prelude::*;

fn scaffolded() -> TestEnv {
    let env = TestEnv::new();
    let input = env.write_input("model.yaml", FULL_MODEL_YAML);
    env.bp()
        .args(["generate", input.to_str().unwrap()])
        .assert()
        .success();
    env
}

#[test]
fn test_append_safe_fields_apply() {
    let env = scaffolded();
    let patch = env.write_input(
        "patch.yaml",
        "stories:\n  - id: US-1\n    status: done\n    progress: 100\n",
    );

    env.bp()
        .args(["append", patch.to_str().unwrap(), "--policy", "prompt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"ok\""))
        .stdout(predicate::str::contains("\"conflicts\":[]"));

    let story = env.read_doc("Stories/US-1.md");
    assert!(story.contains("status: done"));
    assert!(story.contains("progress: 100"));
}

#[test]
fn test_append_conflict_keep_old_default() {
    let env = scaffolded();
    let patch = env.write_input(
        "patch.yaml",
        "dependencies:\n  capabilities:\n    - id: C-1\n      title: Storage layer\n",
    );

    env.bp()
        .args(["append", patch.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("keep_old(default)"));

    // The existing title survives.
    let deps = env.read_doc("Roadmap/Dependencies.md");
    assert!(deps.contains("C-1 Data layer"));
    assert!(!deps.contains("Storage layer"));
}

#[test]
fn test_append_prompt_conflict_gates_write() {
    let env = scaffolded();
    let before = env.read_doc("Stories/US-1.md");
    let patch = env.write_input(
        "patch.yaml",
        "stories:\n  - id: US-1\n    title: A different title\n",
    );

    env.bp()
        .args(["append", patch.to_str().unwrap(), "--policy", "prompt"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("needs_resolution"));

    // Nothing was written anywhere in the set.
    assert_eq!(env.read_doc("Stories/US-1.md"), before);
    assert!(!env.read_doc("Roadmap/Blueprint Tree.md").contains("A different title"));
}

#[test]
fn test_append_inline_resolution_use_new() {
    let env = scaffolded();
    let patch = env.write_input(
        "patch.yaml",
        "stories:\n  - id: US-1\n    title: A different title\n",
    );

    env.bp()
        .args([
            "append",
            patch.to_str().unwrap(),
            "--policy",
            "prompt",
            "--resolve",
            "story:US-1:title=use_new",
        ])
        .assert()
        .success();

    assert!(env.read_doc("Stories/US-1.md").contains("title: A different title"));
}

#[test]
fn test_append_resolutions_file_manual_value() {
    let env = scaffolded();
    let patch = env.write_input(
        "patch.yaml",
        "stories:\n  - id: US-1\n    title: A different title\n",
    );
    let resolutions = env.write_input(
        "resolutions.yaml",
        "story:US-1:title:\n  action: manual\n  value: Hand-picked title\n",
    );

    env.bp()
        .args([
            "append",
            patch.to_str().unwrap(),
            "--policy",
            "prompt",
            "--resolutions",
            resolutions.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(env.read_doc("Stories/US-1.md").contains("title: Hand-picked title"));
}

#[test]
fn test_append_creates_new_story() {
    let env = scaffolded();
    let patch = env.write_input(
        "patch.yaml",
        "stories:\n  - id: US-3\n    title: Export records\n    capability: C-1\n    milestone: M-1\n    epic: E-1\n",
    );

    env.bp()
        .args(["append", patch.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\""));

    assert!(env.doc_path("Stories/US-3.md").exists());
    assert!(env.read_doc("Stories/README.md").contains("US-3"));
}

#[test]
fn test_append_new_story_fabricates_defaults_with_warnings() {
    let env = scaffolded();
    let patch = env.write_input("patch.yaml", "stories:\n  - id: US-4\n");

    env.bp()
        .args(["append", patch.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("C-unknown"))
        .stdout(predicate::str::contains("M-yyy"));

    let story = env.read_doc("Stories/US-4.md");
    assert!(story.contains("capability: C-unknown"));
    assert!(story.contains("milestone: M-yyy"));
}

#[test]
fn test_append_edge_dedup() {
    let env = scaffolded();
    // The C-1 -> C-2 "needs data" edge already exists.
    let patch = env.write_input(
        "patch.yaml",
        "dependencies:\n  edges:\n    - from: C-1\n      to: C-2\n      reason: needs data\n",
    );

    env.bp()
        .args(["append", patch.to_str().unwrap()])
        .assert()
        .success();

    let deps = env.read_doc("Roadmap/Dependencies.md");
    assert_eq!(deps.matches("C_1 -->|\"needs data\"| C_2").count(), 1);
}

#[test]
fn test_append_prunes_stale_items_but_not_template() {
    let env = scaffolded();
    // A stray item file with no story behind it.
    std::fs::write(env.doc_path("Stories/US-99.md"), "---\nid: US-99\n---\n").unwrap();
    let patch = env.write_input("patch.yaml", "{}\n");

    env.bp()
        .args(["append", patch.to_str().unwrap()])
        .assert()
        .success();

    assert!(!env.doc_path("Stories/US-99.md").exists());
    assert!(env.doc_path("Stories/US-xxx.md").exists());
    assert!(env.doc_path("Stories/US-1.md").exists());
}

#[test]
fn test_append_adopts_legacy_unmanaged_file_as_human_region() {
    let env = scaffolded();
    std::fs::write(
        env.doc_path("Roadmap/Dependencies.md"),
        "hand-written dependency notes\n",
    )
    .unwrap();
    let patch = env.write_input("patch.yaml", "{}\n");

    env.bp()
        .args(["append", patch.to_str().unwrap()])
        .assert()
        .success();

    let deps = env.read_doc("Roadmap/Dependencies.md");
    assert!(deps.contains("<!-- bp:generated:start -->"));
    assert!(deps.contains("hand-written dependency notes"));
}

#[test]
fn test_append_dry_run_leaves_files_byte_identical() {
    let env = scaffolded();
    let before_tree = env.read_doc("Roadmap/Blueprint Tree.md");
    let before_story = env.read_doc("Stories/US-1.md");
    let patch = env.write_input(
        "patch.yaml",
        "stories:\n  - id: US-1\n    status: done\n    progress: 100\n",
    );

    env.bp()
        .args(["append", patch.to_str().unwrap(), "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("US-1.md"));

    assert_eq!(env.read_doc("Roadmap/Blueprint Tree.md"), before_tree);
    assert_eq!(env.read_doc("Stories/US-1.md"), before_story);
}

#[test]
fn test_append_dry_run_matches_real_run_report() {
    let env = scaffolded();
    let patch = env.write_input(
        "patch.yaml",
        "stories:\n  - id: US-1\n    status: done\n    progress: 100\n",
    );

    let dry = env
        .bp()
        .args(["append", patch.to_str().unwrap(), "--dry-run"])
        .output()
        .unwrap();
    let real = env
        .bp()
        .args(["append", patch.to_str().unwrap()])
        .output()
        .unwrap();
    let dry_json: serde_json::Value = serde_json::from_slice(&dry.stdout).unwrap();
    let real_json: serde_json::Value = serde_json::from_slice(&real.stdout).unwrap();
    assert_eq!(dry_json["report"], real_json["report"]);
    assert_eq!(dry_json["changed_files"], real_json["changed_files"]);
}

#[test]
fn test_append_updates_milestone_window_use_new() {
    let env = scaffolded();
    let patch = env.write_input(
        "patch.yaml",
        "milestones:\n  - id: M-1\n    end: 2026-03-01\n",
    );

    env.bp()
        .args(["append", patch.to_str().unwrap(), "--policy", "use-new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("use_new(default)"));

    let doc = env.read_doc("Roadmap/Milestones.md");
    assert!(doc.contains("`2026-01-01 ~ 2026-03-01`"));
}

#[test]
fn test_append_writes_run_log_but_dry_run_does_not() {
    let env = scaffolded();
    let log = env.blueprint_dir().join(".bp-log.jsonl");
    let lines_before = std::fs::read_to_string(&log)
        .map(|t| t.lines().count())
        .unwrap_or(0);
    let patch = env.write_input("patch.yaml", "{}\n");

    env.bp()
        .args(["append", patch.to_str().unwrap(), "--dry-run"])
        .assert()
        .success();
    let after_dry = std::fs::read_to_string(&log)
        .map(|t| t.lines().count())
        .unwrap_or(0);
    assert_eq!(after_dry, lines_before);

    env.bp()
        .args(["append", patch.to_str().unwrap()])
        .assert()
        .success();
    let after_real = std::fs::read_to_string(&log).unwrap().lines().count();
    assert_eq!(after_real, lines_before + 1);
}

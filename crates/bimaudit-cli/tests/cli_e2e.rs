use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("canonicalize repo root")
}

fn bimaudit_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bimaudit"))
}

fn bimaudit(args: &[&str]) -> Output {
    Command::new(bimaudit_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("run bimaudit")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn audit_demo_building_reports_anomalies() {
    let root = repo_root();
    let dir = tempfile::tempdir().expect("tempdir");
    let artifact = dir.path().join("anomalies.txt");

    let out = bimaudit(&[
        "audit",
        "--graph",
        root.join("demos/building.json").to_str().unwrap(),
        "--rules",
        root.join("demos/rules.txt").to_str().unwrap(),
        "--anomalies",
        artifact.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let text = stdout(&out);
    assert!(text.contains("eligible rules:       6"), "{text}");
    assert!(text.contains("translation failures: 1"), "{text}");
    assert!(text.contains("conformance rate:     60.0%"), "{text}");
    assert!(text.contains("Wall W-03"), "{text}");

    assert_eq!(
        fs::read_to_string(&artifact).expect("artifact"),
        "3Wall00000000000000003\n5Door00000000000000002\n"
    );
}

#[test]
fn audit_json_output_is_machine_readable() {
    let root = repo_root();
    let dir = tempfile::tempdir().expect("tempdir");
    let rules = dir.path().join("rules.txt");
    fs::write(&rules, "VERIFY COLUMN CONTAINED_IN FLOOR\n").unwrap();
    let artifact = dir.path().join("anomalies.txt");

    let out = bimaudit(&[
        "audit",
        "--graph",
        root.join("demos/building.json").to_str().unwrap(),
        "--rules",
        rules.to_str().unwrap(),
        "--anomalies",
        artifact.to_str().unwrap(),
        "--json",
    ]);
    assert!(out.status.success());

    let run: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json stdout");
    assert_eq!(run["report"]["audited_rules"], 1);
    assert_eq!(run["rules"][0]["status"], "conforming");
    assert!(run["artifact"].is_null());
    assert!(!artifact.exists());
}

#[test]
fn audit_fails_on_malformed_grammar() {
    let root = repo_root();
    let dir = tempfile::tempdir().expect("tempdir");
    let grammar = dir.path().join("broken.pest");
    fs::write(&grammar, "rule = { SOI ~ ").unwrap();

    let out = bimaudit(&[
        "audit",
        "--graph",
        root.join("demos/building.json").to_str().unwrap(),
        "--rules",
        root.join("demos/rules.txt").to_str().unwrap(),
        "--grammar",
        grammar.to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid grammar"));
}

#[test]
fn audit_fails_on_missing_snapshot() {
    let out = bimaudit(&["audit", "--graph", "/nonexistent/graph.json"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("graph snapshot"));
}

#[test]
fn compile_prints_query() {
    let out = bimaudit(&["compile", "VERIFY WINDOW CONTAINED_IN WALL"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("MATCH (child:`IfcWindow`)"), "{text}");
    assert!(text.contains("->(:`IfcWall`)"), "{text}");
}

#[test]
fn compile_rejects_unknown_type() {
    let out = bimaudit(&["compile", "VERIFY BLIMP CONTAINED_IN WALL"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("BLIMP"));
}

#[test]
fn check_grammar_exports_trees() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rules = dir.path().join("my_rules.txt");
    fs::write(&rules, "VERIFY SLAB CONTAINED_IN FLOOR\n").unwrap();

    let out = bimaudit(&["check-grammar", "--rules", rules.to_str().unwrap(), "--export"]);
    assert!(out.status.success(), "stdout: {}", stdout(&out));
    let tree = fs::read_to_string(dir.path().join("my_rules_tree.txt")).expect("export");
    assert!(tree.contains("type_token\tSLAB"), "{tree}");
}

#[test]
fn vocab_lists_ifc_classes() {
    let out = bimaudit(&["vocab"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("FLOOR"), "{text}");
    assert!(text.contains("IfcBuildingStorey"), "{text}");
    assert_eq!(text.lines().count(), 12);
}

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn inspect_file_prints_structure_and_hash() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("Widget.class");
    std::fs::write(&file, common::class_bytes("com/example/Widget")).unwrap();

    cargo_bin_cmd!("classlens")
        .arg("inspect")
        .arg("--name")
        .arg("com.example.Widget")
        .arg("--file")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Class: com.example.Widget"))
        .stdout(predicate::str::contains("Superclass: java.lang.Object"))
        .stdout(predicate::str::contains("Interfaces: java.lang.Runnable"))
        .stdout(predicate::str::contains("- count I\n"))
        .stdout(predicate::str::contains("- <init> ()V (3 instructions)"))
        .stdout(predicate::str::contains("- run ()V (1 instruction)\n"))
        .stdout(predicate::str::contains("SHA-256: "));
}

#[test]
fn inspect_json_reports_methods() {
    let dir = tempdir().unwrap();
    common::write_tree(
        dir.path(),
        &[("com/example/Widget.class", &common::class_bytes("com/example/Widget"))],
    );

    let output = cargo_bin_cmd!("classlens")
        .arg("inspect")
        .arg("--name")
        .arg("com/example/Widget")
        .arg("--class-path")
        .arg(dir.path())
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).expect("inspect json");
    assert_eq!(body["found"], true);
    assert_eq!(body["class"]["name"], "com.example.Widget");
    assert_eq!(body["class"]["provenance"], "parsed");
    let methods: Vec<&str> = body["class"]["methods"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(methods, vec!["<init>", "run"]);
    assert!(body.get("sha256").is_none());
}

#[test]
fn inspect_missing_type_is_not_an_error() {
    let dir = tempdir().unwrap();
    cargo_bin_cmd!("classlens")
        .arg("inspect")
        .arg("--name")
        .arg("com.example.Missing")
        .arg("--class-path")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn inspect_malformed_file_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("Broken.class");
    std::fs::write(&file, b"\xca\xfe\xba\xbe\x00").unwrap();

    cargo_bin_cmd!("classlens")
        .arg("inspect")
        .arg("--name")
        .arg("com.example.Broken")
        .arg("--file")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to resolve com.example.Broken"));
}

#[test]
fn boot_jar_makes_type_visible() {
    let dir = tempdir().unwrap();
    let jar = dir.path().join("agent.jar");
    common::write_jar(&jar, &[("com/example/Agent.class", &common::class_bytes("com/example/Agent"))]);

    cargo_bin_cmd!("classlens")
        .arg("has-class")
        .arg("--name")
        .arg("com.example.Agent")
        .assert()
        .success()
        .stdout("false\n");

    cargo_bin_cmd!("classlens")
        .arg("has-class")
        .arg("--name")
        .arg("com.example.Agent")
        .arg("--boot-jar")
        .arg(&jar)
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn invalid_boot_jar_is_rejected() {
    let dir = tempdir().unwrap();
    cargo_bin_cmd!("classlens")
        .arg("has-class")
        .arg("--name")
        .arg("com.example.Agent")
        .arg("--boot-jar")
        .arg(dir.path().join("missing.jar"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to add boot jar"));
}

#[test]
fn config_scopes_are_selectable() {
    let dir = tempdir().unwrap();
    common::write_tree(
        &dir.path().join("plugins"),
        &[("com/example/Plugin.class", &common::class_bytes("com/example/Plugin"))],
    );
    let config = dir.path().join("runtime.json");
    std::fs::write(
        &config,
        r#"{
  "config_version": "0.1.0",
  "scopes": [
    { "name": "app" },
    { "name": "plugin", "parent": "app", "class_path": ["plugins"] }
  ]
}"#,
    )
    .unwrap();

    for (scope, expected) in [("plugin", "true\n"), ("app", "false\n")] {
        cargo_bin_cmd!("classlens")
            .arg("has-class")
            .arg("--name")
            .arg("com.example.Plugin")
            .arg("--config")
            .arg(&config)
            .arg("--scope")
            .arg(scope)
            .assert()
            .success()
            .stdout(expected);
    }

    cargo_bin_cmd!("classlens")
        .arg("has-class")
        .arg("--name")
        .arg("com.example.Plugin")
        .arg("--config")
        .arg(&config)
        .arg("--scope")
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown scope 'nope'"));
}

#[test]
fn verbose_logs_to_stderr_only() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("Widget.class");
    std::fs::write(&file, common::class_bytes("com/example/Widget")).unwrap();

    let output = cargo_bin_cmd!("classlens")
        .env_remove("RUST_LOG")
        .arg("--verbose")
        .arg("inspect")
        .arg("--name")
        .arg("com.example.Widget")
        .arg("--file")
        .arg(&file)
        .arg("--json")
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed class"))
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice::<serde_json::Value>(&output).expect("stdout stays valid json");
}

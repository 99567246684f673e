use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const CONTENT: &str = r#"{
  "apps": {
    "blah": {
      "existing": {},
      "ignored": {}
    }
  },
  "content": {
    "toClean": {
      "notexisting": {
        "sling:resourceType": "/apps/blah/notexisting",
        "child": { "sling:resourceType": "/apps/blah/alsomissing" }
      }
    },
    "toKeep": {
      "notConfigured": { "sling:resourceType": "/apps/other/notexisting" },
      "existsAndConfigured": { "sling:resourceType": "/apps/blah/existing" },
      "excluded": { "sling:resourceType": "/apps/blah/ignored/notexisting" }
    }
  }
}"#;

const CONFIG: &str = r#"
inclusions = ["/apps/blah", "/libs"]
exclusions = ["/apps/blah/ignored", "/libs/ignored"]
"#;

fn setup_test_directory() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("content.json"), CONTENT).unwrap();
    fs::write(dir.path().join("typecleanup.toml"), CONFIG).unwrap();
    dir
}

fn command(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("typecleanup").unwrap();
    cmd.arg("--content")
        .arg(dir.path().join("content.json"))
        .arg("--config")
        .arg(dir.path().join("typecleanup.toml"));
    cmd
}

#[test]
fn test_report_subtree() {
    let dir = setup_test_directory();

    command(&dir)
        .arg("report")
        .arg("/content")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "7 nodes traversed, 1 obsolete nodes\n/content/toClean/notexisting\n",
        ))
        .stdout(predicate::str::contains("ignored").not())
        .stdout(predicate::str::contains("done."));
}

#[test]
fn test_report_path_list() {
    let dir = setup_test_directory();

    command(&dir)
        .arg("report")
        .arg("--paths")
        .arg("/content/toClean/notexisting,/does/not/exist,/content/toKeep/existsAndConfigured")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 nodes traversed, 1 obsolete nodes"))
        .stdout(predicate::str::contains(
            "2 ignored paths\n/does/not/exist\n/content/toKeep/existsAndConfigured\n",
        ));
}

#[test]
fn test_not_configured() {
    let dir = setup_test_directory();

    Command::cargo_bin("typecleanup")
        .unwrap()
        .arg("--content")
        .arg(dir.path().join("content.json"))
        .arg("report")
        .arg("/content")
        .assert()
        .success()
        .stdout(predicate::str::contains("not configured."));
}

#[test]
fn test_include_flags_without_config_file() {
    let dir = setup_test_directory();

    Command::cargo_bin("typecleanup")
        .unwrap()
        .arg("--content")
        .arg(dir.path().join("content.json"))
        .arg("-i")
        .arg("/apps")
        .arg("-x")
        .arg("/apps/blah/ignored")
        .arg("report")
        .arg("/content/toKeep")
        .assert()
        .success()
        .stdout(predicate::str::contains("/content/toKeep/notConfigured"))
        .stdout(predicate::str::contains("/content/toKeep/excluded").not());
}

#[test]
fn test_missing_root_fails() {
    let dir = setup_test_directory();

    command(&dir)
        .arg("report")
        .arg("/nowhere")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No node at /nowhere"));
}

#[test]
fn test_clean_dry_run_keeps_content() {
    let dir = setup_test_directory();

    command(&dir)
        .arg("clean")
        .arg("/content")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("/content/toClean/notexisting"))
        .stdout(predicate::str::contains("Dry run mode"));

    let content = fs::read_to_string(dir.path().join("content.json")).unwrap();
    assert_eq!(content, CONTENT);
}

#[test]
fn test_clean_removes_obsolete_nodes() {
    let dir = setup_test_directory();

    command(&dir)
        .arg("clean")
        .arg("/content")
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1 obsolete nodes"));

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("content.json")).unwrap())
            .unwrap();
    assert!(content["content"]["toClean"].get("notexisting").is_none());
    assert!(content["content"]["toKeep"].get("existsAndConfigured").is_some());

    // A second run finds nothing left to do
    command(&dir)
        .arg("clean")
        .arg("/content")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 obsolete nodes"))
        .stdout(predicate::str::contains("Nothing to remove."));
}

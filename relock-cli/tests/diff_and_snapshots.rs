//! CLI integration tests for the read-only subcommands.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn relock() -> Command {
    Command::cargo_bin("relock").expect("binary")
}

#[test]
fn diff_on_explicit_files_classifies_framework_change() {
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.txt");
    let new = dir.path().join("new.txt");
    fs::write(&old, "# compiled earlier\ndjango==4.2.20\nrequests==2.32.3\n").unwrap();
    fs::write(&new, "# compiled now\ndjango==4.2.27\nrequests==2.32.3\n").unwrap();

    relock()
        .args(["diff", "--files"])
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::contains("-django==4.2.20"))
        .stdout(predicate::str::contains("+django==4.2.27"))
        .stdout(predicate::str::contains("django changed: 4.2.20 -> 4.2.27"));
}

#[test]
fn diff_ignores_leading_comment_noise() {
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.txt");
    let new = dir.path().join("new.txt");
    fs::write(&old, "# compiled 2026-08-04\ndjango==4.2.20\n").unwrap();
    fs::write(&new, "# ACTIVE\n# compiled 2026-08-05\ndjango==4.2.20\n").unwrap();

    relock()
        .args(["diff", "--files"])
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::contains("no manifest changes"));
}

#[test]
fn diff_from_project_uses_two_newest_snapshots() {
    let root = TempDir::new().unwrap();
    let project = root.path().join("myapp");
    let backups = root.path().join("requirements_backups");
    fs::create_dir_all(&project).unwrap();
    fs::create_dir_all(&backups).unwrap();
    fs::write(
        backups.join("local_2026-08-04T03-00-00.txt"),
        "django==4.2.20\n",
    )
    .unwrap();
    fs::write(
        backups.join("local_2026-08-05T03-00-00.txt"),
        "django==4.2.27\n",
    )
    .unwrap();

    relock()
        .args(["diff", "--project"])
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("+django==4.2.27"));
}

#[test]
fn snapshots_lists_newest_first_with_active_marker() {
    let root = TempDir::new().unwrap();
    let project = root.path().join("myapp");
    let backups = root.path().join("requirements_backups");
    fs::create_dir_all(&project).unwrap();
    fs::create_dir_all(&backups).unwrap();
    fs::write(
        backups.join("local_2026-08-04T03-00-00.txt"),
        "django==4.2.20\n",
    )
    .unwrap();
    fs::write(
        backups.join("local_2026-08-05T03-00-00.txt"),
        "# ACTIVE\ndjango==4.2.27\n",
    )
    .unwrap();

    relock()
        .args(["snapshots", "--project"])
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 snapshot(s)"))
        .stdout(predicate::str::contains("ACTIVE"));
}

#[test]
fn snapshots_on_empty_store_suggests_update() {
    let root = TempDir::new().unwrap();
    let project = root.path().join("myapp");
    fs::create_dir_all(&project).unwrap();

    relock()
        .args(["snapshots", "--project"])
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshots"));
}

#[test]
fn update_without_settings_fails_fast() {
    let root = TempDir::new().unwrap();
    let project = root.path().join("myapp");
    fs::create_dir_all(&project).unwrap();

    relock()
        .env_remove("RELOCK__EMAIL_FROM")
        .args(["update", "--project"])
        .arg(&project)
        .assert()
        .failure()
        .stderr(predicate::str::contains("RELOCK__"));
}

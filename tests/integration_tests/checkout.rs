use std::process::Command;

use rstest::rstest;

use crate::common::{TestRepo, repo};

#[rstest]
fn checkout_takes_first_slot(repo: TestRepo) {
    repo.create_branch("P12-add-login");

    let output = repo.erk(&["checkout", "12"], None);
    output.assert_success();

    let slot = repo.slot_path(0);
    let script = slot.join(".erk/bin/activate.sh");
    assert_eq!(output.stdout().trim(), script.display().to_string());
    assert!(script.is_file());
    assert_eq!(
        repo.git_output(&["-C", slot.to_str().unwrap(), "branch", "--show-current"]),
        "P12-add-login"
    );
    assert!(repo.registry_path().is_file());
}

#[rstest]
fn repeated_checkout_reuses_the_slot(repo: TestRepo) {
    repo.create_branch("P12-add-login");
    repo.create_branch("P13-other");

    repo.erk(&["checkout", "12"], None).assert_success();
    repo.erk(&["checkout", "13"], None).assert_success();
    let again = repo.erk(&["checkout", "12", "--format", "json"], None);
    again.assert_success();

    let json = again.json();
    assert_eq!(json["slot"], 0);
    assert_eq!(json["branch"], "P12-add-login");
}

#[rstest]
fn checkout_from_metadata_file(repo: TestRepo) {
    repo.create_branch("P77-from-metadata");
    let dir = repo.root_path().join(".impl");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("issue.json"), r#"{"issue_number": 77}"#).unwrap();

    let output = repo.erk(&["checkout", "--format", "json"], None);
    output.assert_success();
    assert_eq!(output.json()["branch"], "P77-from-metadata");
}

#[rstest]
fn checkout_without_matching_branch(repo: TestRepo) {
    let output = repo.erk(&["checkout", "404", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "no-branch-for-issue");
    assert!(!repo.slot_path(0).exists());
}

#[rstest]
fn checkout_no_slot_uses_branches_dir(repo: TestRepo) {
    repo.create_branch("P5-direct");

    let output = repo.erk(&["checkout", "5", "--no-slot", "--format", "json"], None);
    output.assert_success();

    let json = output.json();
    assert!(json["slot"].is_null());
    let expected = repo.pool_root().join("branches").join("P5-direct");
    assert_eq!(json["path"], expected.display().to_string());
    assert!(expected.is_dir());
}

#[rstest]
fn sourcing_the_script_enters_the_worktree(repo: TestRepo) {
    repo.write_project_config(
        r#"
sync-command = ""
post-create = "echo post-create for {{ branch }}"
"#,
    );
    repo.create_branch("P9-source-me");
    let output = repo.erk(&["checkout", "9"], None);
    output.assert_success();
    let script = output.stdout().trim().to_string();

    std::fs::write(repo.slot_path(0).join(".env"), "ERK_DEMO=loaded\n").unwrap();

    let shell = Command::new("sh")
        .arg("-c")
        .arg(r#". "$1" >/dev/null && pwd && echo "$ERK_DEMO""#)
        .arg("sh")
        .arg(&script)
        .env_remove("ERK_DEMO")
        .current_dir(repo.root_path())
        .output()
        .unwrap();
    assert!(
        shell.status.success(),
        "{}",
        String::from_utf8_lossy(&shell.stderr)
    );
    let stdout = String::from_utf8_lossy(&shell.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some(repo.slot_path(0).to_str().unwrap()));
    assert_eq!(lines.next(), Some("loaded"));
}

use rstest::rstest;

use crate::common::{TestRepo, repo};

#[rstest]
fn create_new_branch_from_base(repo: TestRepo) {
    let output = repo.erk(&["wt", "create", "feat-a", "--base", "main"], None);
    output.assert_success();

    assert!(repo.branch_exists("feat-a"));
    assert!(repo.slot_path(0).join(".erk/bin/activate.sh").is_file());
    assert!(output.stderr().contains("feat-a is ready"), "{}", output.stderr());
}

#[rstest]
fn list_shows_slots_and_direct_worktrees(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();
    repo.erk(&["wt", "create", "spike", "--no-slot"], None).assert_success();

    let output = repo.erk(&["wt", "list", "--format", "json"], None);
    output.assert_success();
    let json = output.json();
    assert_eq!(json["capacity"], 4);
    assert_eq!(json["slots"][0]["branch"], "feat-a");
    assert_eq!(json["slots"][0]["assigned_at"], "2025-01-01T00:00:00Z");
    assert_eq!(json["direct"][0]["branch"], "spike");

    let text = repo.erk(&["wt", "list"], None);
    text.assert_success();
    let stdout = text.stdout();
    assert!(stdout.contains("slot-00  feat-a"), "{stdout}");
    assert!(stdout.contains("slot-01  (free)"), "{stdout}");
    assert!(stdout.contains("direct   spike"), "{stdout}");
}

#[rstest]
fn pool_exhaustion_changes_nothing(repo: TestRepo) {
    repo.write_test_config("pool-size = 1\n");
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();

    let output = repo.erk(&["wt", "create", "feat-b", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "pool-exhausted");
    assert!(!repo.slot_path(1).exists());

    let list = repo.erk(&["wt", "list", "--format", "json"], None).json();
    assert_eq!(list["slots"][0]["branch"], "feat-a");
}

#[rstest]
fn remove_releases_slot_and_deletes_merged_branch(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();

    let output = repo.erk(&["wt", "remove", "feat-a", "--yes"], None);
    output.assert_success();

    assert!(!repo.slot_path(0).exists());
    assert!(!repo.branch_exists("feat-a"));
    let list = repo.erk(&["wt", "list", "--format", "json"], None).json();
    assert!(list["slots"][0]["branch"].is_null());

    // The released slot is reused
    repo.erk(&["wt", "create", "feat-b"], None).assert_success();
    let list = repo.erk(&["wt", "list", "--format", "json"], None).json();
    assert_eq!(list["slots"][0]["branch"], "feat-b");
}

#[rstest]
fn remove_without_terminal_asks_nothing_and_changes_nothing(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();

    let output = repo.erk(&["wt", "remove", "feat-a", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "not-interactive");
    assert!(repo.slot_path(0).is_dir());
    assert!(repo.branch_exists("feat-a"));
}

#[rstest]
fn remove_dirty_worktree_needs_force(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();
    std::fs::write(repo.slot_path(0).join("scratch.txt"), "wip").unwrap();

    let output = repo.erk(&["wt", "remove", "feat-a", "--yes"], None);
    output.assert_failure();
    assert!(output.stderr().contains("uncommitted changes"), "{}", output.stderr());
    assert!(output.stderr().contains("Nothing was changed"), "{}", output.stderr());
    assert!(repo.slot_path(0).is_dir());

    repo.erk(&["wt", "remove", "feat-a", "--yes", "--force"], None)
        .assert_success();
    assert!(!repo.slot_path(0).exists());
}

#[rstest]
fn remove_keeps_unmerged_branch(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();
    repo.commit_in(&repo.slot_path(0), "Unmerged work");

    let output = repo.erk(&["wt", "remove", "feat-a", "--yes"], None);
    output.assert_success();
    assert!(output.stderr().contains("is not merged into main"), "{}", output.stderr());
    assert!(!repo.slot_path(0).exists());
    assert!(repo.branch_exists("feat-a"));
}

#[rstest]
fn remove_with_keep_branch(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();

    repo.erk(&["wt", "remove", "feat-a", "--yes", "--keep-branch"], None)
        .assert_success();
    assert!(repo.branch_exists("feat-a"));
}

#[rstest]
fn remove_branch_without_worktree(repo: TestRepo) {
    repo.create_branch("loose");

    let output = repo.erk(&["wt", "remove", "loose", "--yes", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "branch-has-no-worktree");
    assert!(repo.branch_exists("loose"));
}

#[rstest]
fn defer_writes_named_script(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();

    let output = repo.erk(
        &["wt", "defer", "feat-a", "tests", "--", "echo", "hello world"],
        None,
    );
    output.assert_success();

    let script = repo.slot_path(0).join(".erk/bin/tests.sh");
    assert_eq!(output.stdout().trim(), script.display().to_string());
    let body = std::fs::read_to_string(&script).unwrap();
    assert!(body.contains("echo 'hello world'"), "{body}");
}

#[rstest]
#[case("activate")]
#[case("../escape")]
fn defer_rejects_bad_names(repo: TestRepo, #[case] name: &str) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();

    let output = repo.erk(
        &["wt", "defer", "feat-a", name, "--format", "json", "--", "true"],
        None,
    );
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "invalid-script-name");
}

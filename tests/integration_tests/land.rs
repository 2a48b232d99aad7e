use rstest::rstest;

use crate::common::{TestRepo, repo};

/// `P5-feature` in slot 0 with one commit ahead of main.
fn feature_in_slot(repo: &TestRepo) -> String {
    repo.erk(&["wt", "create", "P5-feature"], None).assert_success();
    repo.commit_in(&repo.slot_path(0), "Feature work");
    repo.git_output(&["rev-parse", "P5-feature"])
}

#[rstest]
fn land_fast_forwards_and_cleans_up(repo: TestRepo) {
    let head = feature_in_slot(&repo);

    let output = repo.erk(&["land", "P5-feature", "--yes"], None);
    output.assert_success();

    assert_eq!(repo.git_output(&["rev-parse", "main"]), head);
    // main is checked out in the repo root, so its files follow
    assert_eq!(
        std::fs::read_to_string(repo.root_path().join("file.txt")).unwrap(),
        "Feature work"
    );
    assert!(!repo.slot_path(0).exists());
    assert!(!repo.branch_exists("P5-feature"));

    let stderr = output.stderr();
    assert!(stderr.contains("Fast-forwarded main to P5-feature"), "{stderr}");
    assert!(stderr.contains("Deleted branch P5-feature"), "{stderr}");
}

#[rstest]
fn land_current_branch_from_inside_the_worktree(repo: TestRepo) {
    let head = feature_in_slot(&repo);

    let output = repo.erk(&["land", "--yes"], Some(&repo.slot_path(0)));
    output.assert_success();
    assert_eq!(repo.git_output(&["rev-parse", "main"]), head);
    assert!(!repo.slot_path(0).exists());
}

#[rstest]
fn land_keep_branch(repo: TestRepo) {
    feature_in_slot(&repo);

    repo.erk(&["land", "P5-feature", "--yes", "--keep-branch"], None)
        .assert_success();
    assert!(repo.branch_exists("P5-feature"));
    assert!(!repo.slot_path(0).exists());
}

#[rstest]
fn land_refuses_diverged_trunk(repo: TestRepo) {
    let head = feature_in_slot(&repo);
    repo.commit("Trunk moved on");
    let main_before = repo.git_output(&["rev-parse", "main"]);

    let output = repo.erk(&["land", "P5-feature", "--yes", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "validation-aborted");

    assert_eq!(repo.git_output(&["rev-parse", "main"]), main_before);
    assert_eq!(repo.git_output(&["rev-parse", "P5-feature"]), head);
    assert!(repo.slot_path(0).is_dir());
}

#[rstest]
fn land_without_terminal_changes_nothing(repo: TestRepo) {
    feature_in_slot(&repo);
    let main_before = repo.git_output(&["rev-parse", "main"]);

    let output = repo.erk(&["land", "P5-feature"], None);
    output.assert_failure();
    assert!(output.stderr().contains("stdin is not a terminal"), "{}", output.stderr());
    assert_eq!(repo.git_output(&["rev-parse", "main"]), main_before);
    assert!(repo.slot_path(0).is_dir());
}

#[rstest]
fn land_trunk_onto_itself(repo: TestRepo) {
    let output = repo.erk(&["land", "main", "--yes", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "validation-aborted");
}

#[rstest]
fn land_branch_without_worktree(repo: TestRepo) {
    repo.run_git(&["switch", "-q", "-c", "loose"]);
    repo.commit("Loose work");
    let head = repo.git_output(&["rev-parse", "HEAD"]);
    repo.run_git(&["switch", "-q", "main"]);

    repo.erk(&["land", "loose", "--yes"], None).assert_success();
    assert_eq!(repo.git_output(&["rev-parse", "main"]), head);
    assert!(!repo.branch_exists("loose"));
}

#[rstest]
fn land_branch_checked_out_in_main_worktree_keeps_it(repo: TestRepo) {
    repo.run_git(&["switch", "-q", "-c", "loose"]);
    repo.commit("Loose work");
    let head = repo.git_output(&["rev-parse", "HEAD"]);

    let output = repo.erk(&["land", "loose", "--yes"], None);
    output.assert_success();
    let stderr = output.stderr();
    assert!(stderr.contains("Landing loose onto main"), "{stderr}");
    assert!(stderr.contains("is checked out at"), "{stderr}");
    assert!(stderr.contains("Kept branch"), "{stderr}");
    assert_eq!(repo.git_output(&["rev-parse", "main"]), head);
    assert!(repo.branch_exists("loose"));
}

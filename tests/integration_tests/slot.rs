use rstest::rstest;

use crate::common::{TestRepo, repo};

#[rstest]
fn consistent_pool(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();

    let output = repo.erk(&["slot", "check"], None);
    output.assert_success();
    assert!(
        output.stderr().contains("Pool is consistent (1 of 4 slots in use)"),
        "{}",
        output.stderr()
    );
}

#[rstest]
fn deleted_worktree_is_stale(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();
    std::fs::remove_dir_all(repo.slot_path(0)).unwrap();

    let output = repo.erk(&["slot", "check", "--format", "json"], None);
    // Reporting only: drift is not a failure
    output.assert_success();
    let json = output.json();
    assert_eq!(json["consistent"], false);
    assert_eq!(json["issues"][0]["kind"], "stale");
    assert_eq!(json["issues"][0]["branch"], "feat-a");

    // Nothing was repaired
    let again = repo.erk(&["slot", "check", "--format", "json"], None).json();
    assert_eq!(again["issues"][0]["kind"], "stale");
}

#[rstest]
fn unregistered_slot_directory_is_orphaned(repo: TestRepo) {
    let orphan = repo.pool_root().join("slots").join("slot-03");
    std::fs::create_dir_all(&orphan).unwrap();

    let output = repo.erk(&["slot", "check", "--format", "json"], None);
    output.assert_success();
    let json = output.json();
    assert_eq!(json["issues"][0]["kind"], "orphan");
    assert_eq!(json["issues"][0]["slot"], 3);
}

#[rstest]
fn switched_branch_is_a_mismatch(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();
    repo.run_git_in(&repo.slot_path(0), &["switch", "-q", "-c", "elsewhere"]);

    let output = repo.erk(&["slot", "check"], None);
    output.assert_success();
    let stderr = output.stderr();
    assert!(stderr.contains("Found 1 problem in the slot pool"), "{stderr}");
    assert!(stderr.contains("expected"), "{stderr}");
    assert!(stderr.contains("elsewhere"), "{stderr}");
}

#[rstest]
fn corrupt_registry_is_reported_not_rewritten(repo: TestRepo) {
    repo.erk(&["wt", "create", "feat-a"], None).assert_success();
    std::fs::write(repo.registry_path(), "{ not json").unwrap();

    let output = repo.erk(&["wt", "list", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "registry-corrupt");
    assert_eq!(
        std::fs::read_to_string(repo.registry_path()).unwrap(),
        "{ not json"
    );
}

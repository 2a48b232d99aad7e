use rstest::rstest;

use crate::common::{TestRepo, repo};

#[rstest]
#[case("42")]
#[case("#42")]
#[case("P42")]
#[case("https://github.com/acme/app/issues/42")]
fn explicit_target_forms(repo: TestRepo, #[case] target: &str) {
    let output = repo.erk(&["resolve", target], None);
    output.assert_success();
    assert_eq!(output.stdout(), "42\n");
}

#[rstest]
fn branch_name_tier(repo: TestRepo) {
    repo.run_git(&["switch", "-q", "-c", "P4655-fix-login"]);

    let output = repo.erk(&["resolve", "--format", "json"], None);
    output.assert_success();
    let json = output.json();
    assert_eq!(json["issue"], 4655);
    assert_eq!(json["source"], "branch-name");
}

#[rstest]
fn metadata_tier_when_branch_has_no_prefix(repo: TestRepo) {
    let dir = repo.root_path().join(".impl");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("issue.json"), r#"{"issue_number": 7}"#).unwrap();

    let output = repo.erk(&["resolve", "--format", "json"], None);
    output.assert_success();
    assert_eq!(output.json()["source"], "metadata-file");
    assert_eq!(output.json()["issue"], 7);
}

#[rstest]
fn branch_name_outranks_metadata(repo: TestRepo) {
    repo.run_git(&["switch", "-q", "-c", "P12-x"]);
    let dir = repo.root_path().join(".impl");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("issue.json"), r#"{"issue_number": 7}"#).unwrap();

    let output = repo.erk(&["resolve"], None);
    output.assert_success();
    assert_eq!(output.stdout(), "12\n");
}

#[rstest]
fn nothing_to_resolve(repo: TestRepo) {
    let output = repo.erk(&["resolve"], None);
    output.assert_failure();
    assert!(
        output.stderr().contains("Could not determine a target"),
        "{}",
        output.stderr()
    );
}

#[rstest]
fn invalid_explicit_target_does_not_fall_through(repo: TestRepo) {
    repo.run_git(&["switch", "-q", "-c", "P12-x"]);

    let output = repo.erk(&["resolve", "abc", "--format", "json"], None);
    output.assert_failure();
    assert_eq!(output.json()["error"]["code"], "invalid-target");
}

#[rstest]
fn strict_rejects_malformed_metadata(repo: TestRepo) {
    let dir = repo.root_path().join(".impl");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("issue.json"), "{not json").unwrap();

    let lenient = repo.erk(&["resolve", "--format", "json"], None);
    lenient.assert_failure();
    assert_eq!(lenient.json()["error"]["code"], "resolution-failed");

    let strict = repo.erk(&["resolve", "--strict", "--format", "json"], None);
    strict.assert_failure();
    assert_eq!(strict.json()["error"]["code"], "metadata-invalid");
}

#![allow(dead_code)]

//! # Test utilities for erk
//!
//! [`TestRepo`] creates an isolated git repository in a temporary directory:
//! deterministic commit dates, a private git config, and a private erk user
//! config. The pool lands next to the repo (`<tmp>/repo.erk-worktrees`), so
//! everything is removed when the test ends.
//!
//! Commands are built with [`TestRepo::erk_command`], which strips `GIT_*`
//! and `ERK_*` variables inherited from the host before setting its own.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use insta_cmd::get_cargo_bin;
use tempfile::TempDir;

/// Fixed clock for registry timestamps (2025-01-01T00:00:00Z).
pub const TEST_EPOCH: u64 = 1_735_689_600;

#[rstest::fixture]
pub fn repo() -> TestRepo {
    TestRepo::new()
}

pub fn check_git_status(output: &Output, cmd_desc: &str) {
    if !output.status.success() {
        panic!(
            "git {cmd_desc} failed:\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

pub struct TestRepo {
    temp_dir: TempDir, // Must keep to ensure cleanup on drop
    root: PathBuf,
    /// Isolated erk user config
    test_config_path: PathBuf,
    git_config_path: PathBuf,
}

impl TestRepo {
    /// A repository on `main` with one commit.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        // macOS: /var is a symlink to /private/var
        let base = dunce::canonicalize(temp_dir.path()).unwrap();
        let root = base.join("repo");
        std::fs::create_dir(&root).unwrap();

        let git_config_path = base.join("test-gitconfig");
        std::fs::write(
            &git_config_path,
            "[user]\n\tname = Test User\n\temail = test@example.com\n\
             [init]\n\tdefaultBranch = main\n\
             [advice]\n\tdetachedHead = false\n",
        )
        .unwrap();

        let repo = Self {
            temp_dir,
            root,
            test_config_path: base.join("test-config.toml"),
            git_config_path,
        };
        repo.run_git(&["init", "-q", "-b", "main"]);
        repo.commit("Initial commit");
        repo
    }

    pub fn configure_git_cmd(&self, cmd: &mut Command) {
        cmd.env("GIT_CONFIG_GLOBAL", &self.git_config_path);
        cmd.env("GIT_CONFIG_SYSTEM", "/dev/null");
        cmd.env("GIT_AUTHOR_DATE", "2025-01-01T00:00:00Z");
        cmd.env("GIT_COMMITTER_DATE", "2025-01-01T00:00:00Z");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("LC_ALL", "C");
        cmd.env("LANG", "C");
    }

    #[must_use]
    pub fn git_command(&self) -> Command {
        let mut cmd = Command::new("git");
        for (key, _) in std::env::vars() {
            if key.starts_with("GIT_") {
                cmd.env_remove(&key);
            }
        }
        self.configure_git_cmd(&mut cmd);
        cmd.current_dir(&self.root);
        cmd
    }

    pub fn run_git(&self, args: &[&str]) {
        self.run_git_in(&self.root, args);
    }

    pub fn run_git_in(&self, dir: &Path, args: &[&str]) {
        let output = self
            .git_command()
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        check_git_status(&output, &args.join(" "));
    }

    /// Trimmed stdout of a git command in the repo root.
    pub fn git_output(&self, args: &[&str]) -> String {
        let output = self.git_command().args(args).output().unwrap();
        check_git_status(&output, &args.join(" "));
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn branch_exists(&self, branch: &str) -> bool {
        self.git_command()
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .output()
            .unwrap()
            .status
            .success()
    }

    /// Commit a change to `file.txt` in the repo root.
    pub fn commit(&self, message: &str) {
        self.commit_in(&self.root, message);
    }

    pub fn commit_in(&self, dir: &Path, message: &str) {
        std::fs::write(dir.join("file.txt"), message).unwrap();
        self.run_git_in(dir, &["add", "file.txt"]);
        self.run_git_in(dir, &["commit", "-q", "-m", message]);
    }

    /// Create `branch` at HEAD without checking it out.
    pub fn create_branch(&self, branch: &str) {
        self.run_git(&["branch", branch]);
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn home_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `<tmp>/repo.erk-worktrees`
    pub fn pool_root(&self) -> PathBuf {
        self.root.with_file_name("repo.erk-worktrees")
    }

    pub fn slot_path(&self, index: usize) -> PathBuf {
        self.pool_root().join("slots").join(format!("slot-{index:02}"))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(".git").join("erk").join("pool.json")
    }

    pub fn write_test_config(&self, contents: &str) {
        std::fs::write(&self.test_config_path, contents).unwrap();
    }

    /// Write `.erk/config.toml` under the repo root.
    pub fn write_project_config(&self, contents: &str) {
        let dir = self.root.join(".erk");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), contents).unwrap();
    }

    /// An `erk` invocation isolated from the host, running in the repo root.
    #[must_use]
    pub fn erk_command(&self) -> Command {
        let mut cmd = Command::new(get_cargo_bin("erk"));
        for (key, _) in std::env::vars() {
            if key.starts_with("GIT_") || key.starts_with("ERK_") {
                cmd.env_remove(&key);
            }
        }
        self.configure_git_cmd(&mut cmd);
        cmd.env("ERK_CONFIG_PATH", &self.test_config_path);
        cmd.env("ERK_TEST_EPOCH", TEST_EPOCH.to_string());
        cmd.env("HOME", self.home_path());
        cmd.env("NO_COLOR", "1");
        cmd.env("COLUMNS", "150");
        cmd.env("RUST_LOG", "warn");
        cmd.current_dir(&self.root);
        cmd
    }

    /// Run erk with `args` in `dir` (default: repo root).
    pub fn erk(&self, args: &[&str], dir: Option<&Path>) -> ErkOutput {
        let mut cmd = self.erk_command();
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        ErkOutput(cmd.args(args).output().unwrap())
    }
}

/// Captured output of one erk run.
pub struct ErkOutput(pub Output);

impl ErkOutput {
    pub fn success(&self) -> bool {
        self.0.status.success()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.0.stderr).into_owned()
    }

    /// Panic with both streams unless erk exited 0.
    #[track_caller]
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "erk failed:\nstdout: {}\nstderr: {}",
            self.stdout(),
            self.stderr()
        );
        self
    }

    #[track_caller]
    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.success(),
            "erk unexpectedly succeeded:\nstdout: {}\nstderr: {}",
            self.stdout(),
            self.stderr()
        );
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.0.stdout).unwrap_or_else(|e| {
            panic!("stdout is not JSON ({e}):\n{}", self.stdout());
        })
    }
}

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use anyhow::Context;
use dunce::canonicalize;
use once_cell::sync::OnceCell;

use super::parse::parse_branch_list;
use super::{GitError, WorktreeInfo};

mod worktrees;

/// Global base path for repository operations, set by -C flag
static BASE_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global base path for repository operations.
///
/// This should be called once at program startup from main().
/// If not called, defaults to "." (current directory).
pub fn set_base_path(path: PathBuf) {
    BASE_PATH.set(path).ok();
}

fn base_path() -> &'static PathBuf {
    static DEFAULT: OnceLock<PathBuf> = OnceLock::new();
    BASE_PATH
        .get()
        .unwrap_or_else(|| DEFAULT.get_or_init(|| PathBuf::from(".")))
}

/// Cached values for git queries that don't change during a process run.
#[derive(Debug, Default)]
struct RepoCache {
    git_common_dir: OnceCell<PathBuf>,
    worktree_root: OnceCell<PathBuf>,
    current_branch: OnceCell<Option<String>>,
}

/// Repository context for git operations.
///
/// # Examples
///
/// ```no_run
/// use erk::git::Repository;
///
/// let repo = Repository::current();
/// let branch = repo.current_branch()?;
/// let worktrees = repo.list_worktrees()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Repository {
    path: PathBuf,
    cache: RepoCache,
}

impl Repository {
    /// Create a repository context at the specified path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RepoCache::default(),
        }
    }

    /// Create a repository context for the current directory.
    ///
    /// If the -C flag was used, this uses that path instead of the actual
    /// current directory.
    pub fn current() -> Self {
        Self::at(base_path().clone())
    }

    /// Get the base path this repository was created with.
    pub fn base_path(&self) -> &Path {
        &self.path
    }

    /// The shared `.git` directory, even when called from a linked worktree.
    ///
    /// Always absolute. Cached for the lifetime of this instance.
    pub fn git_common_dir(&self) -> anyhow::Result<&Path> {
        self.cache
            .git_common_dir
            .get_or_try_init(|| {
                let stdout = self.run_command(&["rev-parse", "--git-common-dir"])?;
                let path = PathBuf::from(stdout.trim());
                let path = if path.is_relative() {
                    self.path.join(&path)
                } else {
                    path
                };
                canonicalize(&path).context("Failed to resolve git common directory")
            })
            .map(PathBuf::as_path)
    }

    /// Top-level directory of the working tree this instance points into.
    pub fn worktree_root(&self) -> anyhow::Result<&Path> {
        self.cache
            .worktree_root
            .get_or_try_init(|| {
                let stdout = self.run_command(&["rev-parse", "--show-toplevel"])?;
                let path = PathBuf::from(stdout.trim());
                canonicalize(&path).context("Failed to canonicalize worktree root")
            })
            .map(PathBuf::as_path)
    }

    /// Directory of the main checkout.
    ///
    /// For a normal clone this is the parent of `.git`; for a bare repository
    /// it is the repository directory itself.
    pub fn repo_root(&self) -> anyhow::Result<PathBuf> {
        let common = self.git_common_dir()?;
        match (common.file_name(), common.parent()) {
            (Some(name), Some(parent)) if name == ".git" => Ok(parent.to_path_buf()),
            _ => Ok(common.to_path_buf()),
        }
    }

    /// Get the current branch name, or None if in detached HEAD state.
    pub fn current_branch(&self) -> anyhow::Result<Option<&str>> {
        self.cache
            .current_branch
            .get_or_try_init(|| {
                let stdout = self.run_command(&["branch", "--show-current"])?;
                let branch = stdout.trim();
                Ok::<_, anyhow::Error>(if branch.is_empty() {
                    None
                } else {
                    Some(branch.to_string())
                })
            })
            .map(|opt| opt.as_deref())
    }

    /// Get the current branch name, or error if in detached HEAD state.
    ///
    /// `action` describes what requires being on a branch (e.g., "land").
    pub fn require_current_branch(&self, action: &str) -> anyhow::Result<String> {
        self.current_branch()?.map(str::to_string).ok_or_else(|| {
            GitError::DetachedHead {
                action: Some(action.into()),
            }
            .into()
        })
    }

    /// Check if a local branch exists.
    pub fn local_branch_exists(&self, branch: &str) -> anyhow::Result<bool> {
        let reference = format!("refs/heads/{branch}");
        self.run_command_check(&["rev-parse", "--verify", "--quiet", &reference])
    }

    /// Names of all local branches.
    pub fn list_local_branches(&self) -> anyhow::Result<Vec<String>> {
        let stdout =
            self.run_command(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])?;
        Ok(parse_branch_list(&stdout))
    }

    /// Whether the working tree has uncommitted changes (tracked or untracked).
    pub fn is_dirty(&self) -> anyhow::Result<bool> {
        let stdout = self.run_command(&["status", "--porcelain"])?;
        Ok(!stdout.trim().is_empty())
    }

    /// Whether `base` is an ancestor of `head`.
    pub fn is_ancestor(&self, base: &str, head: &str) -> anyhow::Result<bool> {
        self.run_command_check(&["merge-base", "--is-ancestor", base, head])
    }

    /// Fast-forward `target` to `branch`.
    ///
    /// When `target` is checked out somewhere, the merge runs in that worktree
    /// so its files follow; otherwise only the ref moves.
    pub fn fast_forward(&self, target: &str, branch: &str) -> anyhow::Result<()> {
        if !self.is_ancestor(target, branch)? {
            return Err(GitError::NotFastForward {
                branch: branch.to_string(),
                target: target.to_string(),
            }
            .into());
        }

        match self.worktree_for_branch(target)? {
            Some(path) => {
                Repository::at(path).run_command(&["merge", "--ff-only", branch])?;
            }
            None => {
                let reference = format!("refs/heads/{target}");
                let message = format!("erk: fast-forward {target} to {branch}");
                self.run_command(&["update-ref", "-m", &message, &reference, branch, target])?;
            }
        }
        Ok(())
    }

    /// Delete a local branch. Without `force`, git refuses unmerged branches.
    pub fn delete_branch(&self, branch: &str, force: bool) -> anyhow::Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run_command(&["branch", flag, branch])?;
        Ok(())
    }

    /// Short name for log lines: the directory the command runs in.
    fn logging_context(&self) -> String {
        if self.path.to_str() == Some(".") {
            ".".to_string()
        } else {
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?")
                .to_string()
        }
    }

    /// Run a git command in this repository's context.
    ///
    /// Returns stdout. A non-zero exit becomes [`GitError::CommandFailed`]
    /// carrying git's stderr (or stdout, for commands that report there).
    pub fn run_command(&self, args: &[&str]) -> anyhow::Result<String> {
        use crate::shell_exec::run;

        let mut cmd = Command::new("git");
        cmd.args(args);
        cmd.current_dir(&self.path);

        let output = run(&mut cmd, Some(&self.logging_context()))
            .with_context(|| format!("Failed to execute: git {}", args.join(" ")))?;

        if !output.status.success() {
            // Git uses \r for progress updates
            let stderr = String::from_utf8_lossy(&output.stderr).replace('\r', "\n");
            for line in stderr.trim().lines() {
                log::debug!("  ! {}", line);
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            let error = [stderr.trim(), stdout.trim()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                error,
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        for line in stdout.trim().lines() {
            log::debug!("  {}", line);
        }
        Ok(stdout)
    }

    /// Run a git command and return whether it succeeded (exit code 0).
    ///
    /// For commands that use exit codes as boolean results, like
    /// `git merge-base --is-ancestor`.
    pub fn run_command_check(&self, args: &[&str]) -> anyhow::Result<bool> {
        use crate::shell_exec::run;

        let mut cmd = Command::new("git");
        cmd.args(args);
        cmd.current_dir(&self.path);

        let output = run(&mut cmd, Some(&self.logging_context()))
            .with_context(|| format!("Failed to execute: git {}", args.join(" ")))?;

        Ok(output.status.success())
    }
}

//! Worktree management operations for Repository.

use std::path::{Path, PathBuf};

use normalize_path::NormalizePath;

use super::{GitError, Repository, WorktreeInfo};
use crate::git::VersionControl;
use crate::path::{format_path_for_display, same_path};

impl Repository {
    /// List all worktrees for this repository, bare entries filtered out.
    ///
    /// Git lists the main worktree first.
    pub fn list_worktrees(&self) -> anyhow::Result<Vec<WorktreeInfo>> {
        let stdout = self.run_command(&["worktree", "list", "--porcelain"])?;
        let raw_worktrees = WorktreeInfo::parse_porcelain_list(&stdout)?;
        Ok(raw_worktrees.into_iter().filter(|wt| !wt.bare).collect())
    }

    /// Find the worktree path for a given branch, if one exists.
    pub fn worktree_for_branch(&self, branch: &str) -> anyhow::Result<Option<PathBuf>> {
        let worktrees = self.list_worktrees()?;

        Ok(worktrees
            .iter()
            .find(|wt| wt.branch.as_deref() == Some(branch))
            .map(|wt| wt.path.clone()))
    }

    /// Find the worktree registered at `path`.
    ///
    /// Uses lexical normalisation first so the lookup works even when the
    /// directory is gone, then falls back to canonical comparison.
    pub fn worktree_at_path(&self, path: &Path) -> anyhow::Result<Option<WorktreeInfo>> {
        let normalized_path = path.normalize();
        let worktrees = self.list_worktrees()?;

        let found = worktrees
            .iter()
            .position(|wt| wt.path.normalize() == normalized_path)
            .or_else(|| worktrees.iter().position(|wt| same_path(&wt.path, path)));
        Ok(found.map(|i| worktrees[i].clone()))
    }

    /// Add a worktree at `path` for `branch`.
    ///
    /// An existing local branch is checked out as-is; otherwise the branch is
    /// created from `base` (or HEAD).
    pub fn add_worktree(&self, path: &Path, branch: &str, base: Option<&str>) -> anyhow::Result<()> {
        let path_str = path_to_str(path)?;
        if self.local_branch_exists(branch)? {
            self.run_command(&["worktree", "add", path_str, branch])?;
        } else {
            let mut args = vec!["worktree", "add", "-b", branch, path_str];
            args.extend(base);
            self.run_command(&args)?;
        }
        Ok(())
    }

    /// Prune worktree entries whose directories no longer exist.
    pub fn prune_worktrees(&self) -> anyhow::Result<()> {
        self.run_command(&["worktree", "prune"])?;
        Ok(())
    }

    /// Remove a worktree at the specified path.
    ///
    /// When `force` is true, passes `--force` to `git worktree remove`,
    /// allowing removal even when the worktree has uncommitted changes.
    pub fn remove_worktree(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        let path_str = path_to_str(path)?;
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(path_str);
        self.run_command(&args)?;
        Ok(())
    }
}

fn path_to_str(path: &Path) -> anyhow::Result<&str> {
    path.to_str().ok_or_else(|| {
        GitError::Other {
            message: format!(
                "Worktree path contains invalid UTF-8: {}",
                format_path_for_display(path)
            ),
        }
        .into()
    })
}

impl VersionControl for Repository {
    fn checkout_new_worktree(
        &self,
        path: &Path,
        branch: &str,
        base: Option<&str>,
    ) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // A directory deleted behind git's back still blocks `worktree add`
        self.prune_worktrees()?;
        self.add_worktree(path, branch, base)
    }

    fn current_branch(&self, cwd: &Path) -> anyhow::Result<Option<String>> {
        let repo = Repository::at(cwd);
        Ok(repo.current_branch()?.map(str::to_string))
    }

    fn worktree_exists(&self, path: &Path) -> anyhow::Result<bool> {
        Ok(path.is_dir() && self.worktree_at_path(path)?.is_some())
    }

    fn branch_at(&self, path: &Path) -> anyhow::Result<Option<String>> {
        Ok(self.worktree_at_path(path)?.and_then(|wt| wt.branch))
    }

    fn remove_worktree(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        Repository::remove_worktree(self, path, force)
    }
}

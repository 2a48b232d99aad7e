//! Git operations and repository management
//!
//! erk never links libgit2; everything goes through the `git` binary via
//! [`Repository::run_command`]. The slot and lifecycle layers only see the
//! narrow [`VersionControl`] trait so they can be tested without git.

use std::path::{Path, PathBuf};

mod error;
mod parse;
mod repository;

pub use error::GitError;
pub(crate) use error::format_error_block;
pub use repository::{Repository, set_base_path};

/// One entry of `git worktree list --porcelain`
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub head: String,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
    pub locked: Option<String>,
    pub prunable: Option<String>,
}

/// The version-control collaborator used by the lifecycle manager.
///
/// [`Repository`] implements this against real git. Paths are absolute.
pub trait VersionControl {
    /// Create a worktree for `branch` at `path`.
    ///
    /// When the branch does not exist yet it is created from `base` (or from
    /// the current HEAD when `base` is `None`).
    fn checkout_new_worktree(
        &self,
        path: &Path,
        branch: &str,
        base: Option<&str>,
    ) -> anyhow::Result<()>;

    /// The branch checked out in the worktree containing `cwd`, or `None`
    /// when HEAD is detached.
    fn current_branch(&self, cwd: &Path) -> anyhow::Result<Option<String>>;

    /// Whether git knows a worktree at `path` and its directory exists.
    fn worktree_exists(&self, path: &Path) -> anyhow::Result<bool>;

    /// The branch checked out at `path`, `None` when detached or unknown.
    fn branch_at(&self, path: &Path) -> anyhow::Result<Option<String>>;

    /// Remove the worktree at `path`; `force` discards uncommitted changes.
    fn remove_worktree(&self, path: &Path, force: bool) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`VersionControl`] double that creates real directories so
    //! on-disk invariants can be asserted.

    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};

    use super::{GitError, VersionControl};

    #[derive(Debug, Default)]
    pub struct FakeVcs {
        pub worktrees: RefCell<BTreeMap<PathBuf, String>>,
        pub branches: RefCell<BTreeSet<String>>,
        pub current: RefCell<Option<String>>,
        /// Branches whose checkout fails
        pub fail_checkout: RefCell<BTreeSet<String>>,
        /// Paths whose removal fails
        pub fail_remove: RefCell<BTreeSet<PathBuf>>,
        pub checkouts: RefCell<Vec<(PathBuf, String)>>,
    }

    impl FakeVcs {
        pub fn with_branches(branches: &[&str]) -> Self {
            let vcs = Self::default();
            vcs.branches
                .borrow_mut()
                .extend(branches.iter().map(|b| b.to_string()));
            vcs
        }
    }

    impl VersionControl for FakeVcs {
        fn checkout_new_worktree(
            &self,
            path: &Path,
            branch: &str,
            _base: Option<&str>,
        ) -> anyhow::Result<()> {
            if self.fail_checkout.borrow().contains(branch) {
                return Err(GitError::CommandFailed {
                    command: "git worktree add".into(),
                    error: format!("fatal: invalid reference: {branch}"),
                }
                .into());
            }
            std::fs::create_dir_all(path)?;
            self.branches.borrow_mut().insert(branch.to_string());
            self.worktrees
                .borrow_mut()
                .insert(path.to_path_buf(), branch.to_string());
            self.checkouts
                .borrow_mut()
                .push((path.to_path_buf(), branch.to_string()));
            Ok(())
        }

        fn current_branch(&self, _cwd: &Path) -> anyhow::Result<Option<String>> {
            Ok(self.current.borrow().clone())
        }

        fn worktree_exists(&self, path: &Path) -> anyhow::Result<bool> {
            Ok(self.worktrees.borrow().contains_key(path) && path.is_dir())
        }

        fn branch_at(&self, path: &Path) -> anyhow::Result<Option<String>> {
            Ok(self.worktrees.borrow().get(path).cloned())
        }

        fn remove_worktree(&self, path: &Path, _force: bool) -> anyhow::Result<()> {
            if self.fail_remove.borrow().contains(path) {
                return Err(GitError::CommandFailed {
                    command: "git worktree remove".into(),
                    error: "fatal: cannot remove a locked working tree".into(),
                }
                .into());
            }
            self.worktrees.borrow_mut().remove(path);
            if path.exists() {
                std::fs::remove_dir_all(path)?;
            }
            Ok(())
        }
    }
}

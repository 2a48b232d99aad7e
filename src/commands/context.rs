use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use erk::activation::ActivationConfig;
use erk::config::{ProjectConfig, UserConfig, expand_template};
use erk::git::Repository;
use erk::lifecycle::WorktreeManager;
use erk::path::resolve_configured_dir;
use erk::pool::{PoolLayout, RegistryHandle};

/// Shared setup for commands that touch the pool: the repository the user is
/// standing in, its main checkout, and both config files.
pub struct CommandEnv {
    pub repo: Repository,
    pub repo_root: PathBuf,
    pub user: UserConfig,
    pub project: Option<ProjectConfig>,
}

impl CommandEnv {
    pub fn load() -> anyhow::Result<Self> {
        let repo = Repository::current();
        let repo_root = repo.repo_root()?;
        let user = UserConfig::load()?;
        let project = ProjectConfig::load(&repo_root)?;
        Ok(Self {
            repo,
            repo_root,
            user,
            project,
        })
    }

    fn repo_name(&self) -> String {
        self.repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `worktrees-dir` from user config (a template over `{{ repo }}`), or
    /// `<repo-parent>/<repo>.erk-worktrees`.
    pub fn pool_layout(&self) -> anyhow::Result<PoolLayout> {
        let root = match &self.user.worktrees_dir {
            Some(template) => {
                let name = self.repo_name();
                let vars = HashMap::from([("repo", name.as_str())]);
                let expanded = expand_template(template, &vars, false, "worktrees-dir")
                    .map_err(|e| anyhow::anyhow!("Invalid worktrees-dir: {e}"))?;
                resolve_configured_dir(&expanded, &self.repo_root)
            }
            None => PoolLayout::default_root(&self.repo_root),
        };
        Ok(PoolLayout::new(root))
    }

    pub fn registry(&self) -> anyhow::Result<RegistryHandle> {
        let common = self
            .repo
            .git_common_dir()
            .context("Failed to locate the git directory")?;
        Ok(RegistryHandle::new(
            RegistryHandle::default_path(common),
            self.user.pool_size(self.project.as_ref()),
            self.user.lock_policy(),
        ))
    }

    pub fn manager(&self) -> anyhow::Result<WorktreeManager<Repository>> {
        Ok(WorktreeManager::new(
            Repository::at(&self.repo_root),
            self.registry()?,
            self.pool_layout()?,
            ActivationConfig::from_project(&self.repo_root, self.project.as_ref()),
        ))
    }

    /// Configured trunk, else `main` or `master`, whichever exists.
    pub fn trunk(&self) -> anyhow::Result<String> {
        if let Some(trunk) = self.project.as_ref().and_then(|p| p.trunk.clone()) {
            return Ok(trunk);
        }
        for candidate in ["main", "master"] {
            if self.repo.local_branch_exists(candidate)? {
                return Ok(candidate.to_string());
            }
        }
        Ok("main".to_string())
    }
}

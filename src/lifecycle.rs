//! Worktree lifecycle
//!
//! [`WorktreeManager`] ties the slot pool to the version-control collaborator.
//! It keeps one invariant: a pooled worktree directory exists on disk if and
//! only if the registry says its slot is occupied. Creation and removal run
//! inside a registry transaction, so a failed checkout never persists its
//! allocation and a failed removal never releases its slot.

use std::path::{Path, PathBuf};

use anyhow::Context;
use color_print::cformat;
use serde::Serialize;

use crate::activation::{self, ACTIVATE_NAME, ActivationConfig};
use crate::error::ErkError;
use crate::git::VersionControl;
use crate::path::format_path_for_display;
use crate::pool::{PoolLayout, RegistryHandle, Slot, SlotPool};

/// A worktree managed by erk, pooled or direct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    /// `None` for direct worktrees outside the pool
    pub slot_index: Option<usize>,
    pub branch: String,
    pub path: PathBuf,
}

impl Worktree {
    pub fn in_slot(slot: &Slot, branch: &str) -> Self {
        Self {
            slot_index: Some(slot.index),
            branch: branch.to_string(),
            path: slot.path.clone(),
        }
    }

    pub fn activation_script_path(&self) -> PathBuf {
        activation::script_path(&self.path, ACTIVATE_NAME)
    }

    pub fn is_pooled(&self) -> bool {
        self.slot_index.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    /// Create a direct worktree instead of taking a slot
    pub no_slot: bool,
    /// Start point when the branch does not exist yet
    pub base: Option<String>,
}

/// One inconsistency between the registry and the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PoolIssue {
    /// Occupied slot whose worktree is gone
    Stale { slot: usize, branch: String, path: PathBuf },
    /// Directory in `slots/` that no occupied slot accounts for
    Orphan { slot: usize, path: PathBuf },
    /// Occupied slot whose worktree has another branch checked out
    Mismatch {
        slot: usize,
        expected: String,
        found: Option<String>,
        path: PathBuf,
    },
}

impl std::fmt::Display for PoolIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolIssue::Stale { slot, branch, path } => write!(
                f,
                "{}",
                cformat!(
                    "slot-{slot:02}: <bold>{branch}</> is registered but {} is missing",
                    format_path_for_display(path)
                )
            ),
            PoolIssue::Orphan { slot, path } => write!(
                f,
                "{}",
                cformat!(
                    "slot-{slot:02}: {} exists but the slot is free",
                    format_path_for_display(path)
                )
            ),
            PoolIssue::Mismatch {
                slot,
                expected,
                found,
                ..
            } => {
                let found = found.as_deref().unwrap_or("a detached HEAD");
                write!(
                    f,
                    "{}",
                    cformat!("slot-{slot:02}: expected <bold>{expected}</>, found <bold>{found}</>")
                )
            }
        }
    }
}

/// Slots plus direct worktrees, for listing.
#[derive(Debug, Clone, Serialize)]
pub struct PoolListing {
    pub capacity: usize,
    pub slots: Vec<Slot>,
    pub direct: Vec<Worktree>,
}

pub struct WorktreeManager<V: VersionControl> {
    vcs: V,
    registry: RegistryHandle,
    layout: PoolLayout,
    activation: ActivationConfig,
}

impl<V: VersionControl> WorktreeManager<V> {
    pub fn new(
        vcs: V,
        registry: RegistryHandle,
        layout: PoolLayout,
        activation: ActivationConfig,
    ) -> Self {
        Self {
            vcs,
            registry,
            layout,
            activation,
        }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn layout(&self) -> &PoolLayout {
        &self.layout
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Current pool state, read without taking the lock.
    pub fn pool(&self) -> anyhow::Result<SlotPool> {
        self.registry.load(&self.layout)
    }

    /// Return the worktree for `branch` at the slot (or direct) path,
    /// creating it if needed.
    ///
    /// An existing worktree at the path must have `branch` checked out,
    /// otherwise this fails with `SlotBranchMismatch` and touches nothing.
    pub fn create_or_locate(&self, branch: &str, slot: Option<&Slot>) -> anyhow::Result<Worktree> {
        self.create_or_locate_from(branch, slot, None)
    }

    /// [`create_or_locate`](Self::create_or_locate) with a start point for
    /// branches that do not exist yet.
    pub fn create_or_locate_from(
        &self,
        branch: &str,
        slot: Option<&Slot>,
        base: Option<&str>,
    ) -> anyhow::Result<Worktree> {
        let worktree = match slot {
            Some(slot) => Worktree::in_slot(slot, branch),
            None => self.direct_worktree(branch),
        };

        if self.vcs.worktree_exists(&worktree.path)? {
            let found = self.vcs.branch_at(&worktree.path)?;
            if found.as_deref() != Some(branch) {
                return Err(ErkError::SlotBranchMismatch {
                    slot: worktree.slot_index,
                    path: worktree.path.clone(),
                    expected: branch.to_string(),
                    found,
                }
                .into());
            }
            log::debug!(
                "Reusing worktree for {branch} at {}",
                worktree.path.display()
            );
            activation::ensure(&worktree, &self.activation)?;
            return Ok(worktree);
        }

        self.vcs
            .checkout_new_worktree(&worktree.path, branch, base)
            .map_err(|e| ErkError::CheckoutFailed {
                branch: branch.to_string(),
                slot: worktree.slot_index,
                path: worktree.path.clone(),
                error: e.to_string(),
            })?;
        log::info!("Created worktree for {branch} at {}", worktree.path.display());

        if let Err(err) = activation::write(&worktree, &self.activation) {
            // The caller's transaction will not persist the slot, so the
            // directory has to go too.
            if let Err(cleanup) = self.vcs.remove_worktree(&worktree.path, true) {
                log::warn!(
                    "Failed to clean up {} after script error: {cleanup:#}",
                    worktree.path.display()
                );
            }
            return Err(err);
        }
        Ok(worktree)
    }

    /// Lock the registry, allocate a slot (or use a direct path), create or
    /// locate the worktree and persist the allocation.
    pub fn checkout(&self, branch: &str, options: &CheckoutOptions) -> anyhow::Result<Worktree> {
        let base = options.base.as_deref();
        if options.no_slot {
            let _lock = self.registry.lock()?;
            return self.create_or_locate_from(branch, None, base);
        }

        self.registry.transaction(&self.layout, |pool| {
            if pool.slot_for_branch(branch).is_none()
                && let Some(direct) = self.existing_direct(branch)?
            {
                log::debug!("{branch} already has a direct worktree");
                activation::ensure(&direct, &self.activation)?;
                return Ok(direct);
            }
            let slot = pool.allocate(branch)?;
            self.create_or_locate_from(branch, Some(&slot), base)
        })
    }

    /// Remove `worktree` from disk and release its slot.
    ///
    /// Both happen under one registry lock; if the removal fails the slot
    /// stays occupied. A worktree whose directory is already gone is simply
    /// released.
    pub fn remove(&self, worktree: &Worktree, force: bool) -> anyhow::Result<()> {
        self.registry.transaction(&self.layout, |pool| {
            if self.vcs.worktree_exists(&worktree.path)? {
                self.vcs
                    .remove_worktree(&worktree.path, force)
                    .with_context(|| {
                        format!(
                            "Failed to remove worktree at {}",
                            format_path_for_display(&worktree.path)
                        )
                    })?;
                log::info!("Removed worktree {}", worktree.path.display());
            } else {
                log::debug!(
                    "Worktree {} already gone; releasing only",
                    worktree.path.display()
                );
            }
            if worktree.is_pooled() {
                pool.release(&worktree.branch);
            }
            Ok(())
        })
    }

    /// The worktree erk manages for `branch`, pooled or direct.
    pub fn locate(&self, branch: &str) -> anyhow::Result<Option<Worktree>> {
        let pool = self.pool()?;
        if let Some(slot) = pool.slot_for_branch(branch) {
            return Ok(Some(Worktree::in_slot(slot, branch)));
        }
        self.existing_direct(branch)
    }

    /// Like [`locate`](Self::locate) but a missing worktree is an error.
    pub fn require(&self, branch: &str) -> anyhow::Result<Worktree> {
        self.locate(branch)?.ok_or_else(|| {
            ErkError::BranchHasNoWorktree {
                branch: branch.to_string(),
            }
            .into()
        })
    }

    pub fn list(&self) -> anyhow::Result<PoolListing> {
        let pool = self.pool()?;
        let mut direct = Vec::new();
        let dir = self.layout.branches_dir();
        if dir.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read {}", dir.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .collect();
            paths.sort();
            for path in paths {
                if !self.vcs.worktree_exists(&path)? {
                    continue;
                }
                if let Some(branch) = self.vcs.branch_at(&path)? {
                    direct.push(Worktree {
                        slot_index: None,
                        branch,
                        path,
                    });
                }
            }
        }
        Ok(PoolListing {
            capacity: pool.capacity(),
            slots: pool.slots().to_vec(),
            direct,
        })
    }

    /// Compare the registry with what is on disk. Reports only; repairs
    /// nothing.
    pub fn check(&self) -> anyhow::Result<Vec<PoolIssue>> {
        let pool = self.pool()?;
        let mut issues = Vec::new();

        for slot in pool.slots() {
            let Some(branch) = &slot.branch else {
                continue;
            };
            if !self.vcs.worktree_exists(&slot.path)? {
                issues.push(PoolIssue::Stale {
                    slot: slot.index,
                    branch: branch.clone(),
                    path: slot.path.clone(),
                });
                continue;
            }
            let found = self.vcs.branch_at(&slot.path)?;
            if found.as_deref() != Some(branch.as_str()) {
                issues.push(PoolIssue::Mismatch {
                    slot: slot.index,
                    expected: branch.clone(),
                    found,
                    path: slot.path.clone(),
                });
            }
        }

        for (index, path) in self.slot_dirs_on_disk()? {
            let occupied = pool
                .slots()
                .get(index)
                .is_some_and(|slot| slot.is_occupied());
            if !occupied {
                issues.push(PoolIssue::Orphan { slot: index, path });
            }
        }

        issues.sort_by_key(|issue| match issue {
            PoolIssue::Stale { slot, .. }
            | PoolIssue::Orphan { slot, .. }
            | PoolIssue::Mismatch { slot, .. } => *slot,
        });
        Ok(issues)
    }

    fn direct_worktree(&self, branch: &str) -> Worktree {
        Worktree {
            slot_index: None,
            branch: branch.to_string(),
            path: self.layout.direct_path(branch),
        }
    }

    fn existing_direct(&self, branch: &str) -> anyhow::Result<Option<Worktree>> {
        let direct = self.direct_worktree(branch);
        if self.vcs.worktree_exists(&direct.path)?
            && self.vcs.branch_at(&direct.path)?.as_deref() == Some(branch)
        {
            return Ok(Some(direct));
        }
        Ok(None)
    }

    /// `slot-NN` directories under `slots/`, by index.
    fn slot_dirs_on_disk(&self) -> anyhow::Result<Vec<(usize, PathBuf)>> {
        let dir = self.layout.slots_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&dir).with_context(|| format!("Failed to read {}", dir.display()))? {
            let path = entry?.path();
            if let Some(index) = parse_slot_dir(&path) {
                found.push((index, path));
            }
        }
        found.sort();
        Ok(found)
    }
}

fn parse_slot_dir(path: &Path) -> Option<usize> {
    if !path.is_dir() {
        return None;
    }
    path.file_name()?
        .to_str()?
        .strip_prefix("slot-")?
        .parse()
        .ok()
}

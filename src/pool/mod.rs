//! Slot pool
//!
//! A fixed number of worktree *slots*, each at a stable path
//! `<pool-root>/slots/slot-NN`, each bound to at most one branch. Binding is
//! idempotent per branch and always picks the lowest free index; releasing a
//! branch never renumbers the others. Branches that should not consume a
//! slot get a *direct* worktree under `<pool-root>/branches/`, a disjoint
//! subtree.
//!
//! [`SlotPool`] is the in-memory state; [`registry::RegistryHandle`] loads and
//! persists it under a file lock.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ErkError;
use crate::lifecycle::Worktree;
use crate::path::sanitize_branch_name;
use crate::utils::now_iso8601;

pub mod registry;

pub use registry::{LockPolicy, RegistryFile, RegistryHandle, SlotRecord};

/// Default number of slots when no configuration says otherwise.
pub const DEFAULT_CAPACITY: usize = 4;

/// Directory names under the pool root.
const SLOTS_DIR: &str = "slots";
const BRANCHES_DIR: &str = "branches";

/// Where slot and direct worktrees live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLayout {
    root: PathBuf,
}

impl PoolLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default pool root for a repository: `<repo-parent>/<repo-name>.erk-worktrees`.
    pub fn default_root(repo_root: &Path) -> PathBuf {
        let name = repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repo".to_string());
        let parent = repo_root.parent().unwrap_or(repo_root);
        parent.join(format!("{name}.erk-worktrees"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slots_dir(&self) -> PathBuf {
        self.root.join(SLOTS_DIR)
    }

    pub fn branches_dir(&self) -> PathBuf {
        self.root.join(BRANCHES_DIR)
    }

    /// Stable path of slot `index`.
    pub fn slot_path(&self, index: usize) -> PathBuf {
        self.slots_dir().join(format!("slot-{index:02}"))
    }

    /// Path of a direct (non-pooled) worktree for `branch`.
    pub fn direct_path(&self, branch: &str) -> PathBuf {
        self.branches_dir().join(sanitize_branch_name(branch))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub index: usize,
    pub branch: Option<String>,
    /// When the current branch was bound (ISO 8601)
    pub assigned_at: Option<String>,
    pub path: PathBuf,
}

impl Slot {
    pub fn is_occupied(&self) -> bool {
        self.branch.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SlotPool {
    layout: PoolLayout,
    slots: Vec<Slot>,
    /// Configured capacity; `slots` may be longer while a slot past it is occupied
    limit: usize,
}

impl SlotPool {
    /// A pool with `capacity` unoccupied slots.
    pub fn new(layout: PoolLayout, capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|index| Slot {
                index,
                branch: None,
                assigned_at: None,
                path: layout.slot_path(index),
            })
            .collect();
        Self {
            layout,
            slots,
            limit: capacity,
        }
    }

    /// Rebuild a pool from registry contents, reconciled with `capacity`.
    ///
    /// Growing adds unoccupied slots. Shrinking drops trailing unoccupied
    /// slots only; an occupied slot past the new capacity is kept until it is
    /// released.
    pub(crate) fn from_registry(
        layout: PoolLayout,
        capacity: usize,
        file: Option<RegistryFile>,
    ) -> Self {
        let mut pool = Self::new(layout, 0);
        let records = file.map(|f| f.slots).unwrap_or_default();

        let highest = records.iter().map(|r| r.index + 1).max().unwrap_or(0);
        let len = highest.max(capacity);
        pool.slots = (0..len)
            .map(|index| Slot {
                index,
                branch: None,
                assigned_at: None,
                path: pool.layout.slot_path(index),
            })
            .collect();
        for record in records {
            let slot = &mut pool.slots[record.index];
            slot.branch = record.branch;
            slot.assigned_at = record.assigned_at;
        }

        pool.limit = capacity;
        pool.trim_to(capacity);
        pool
    }

    fn trim_to(&mut self, capacity: usize) {
        while self.slots.len() > capacity
            && self.slots.last().is_some_and(|slot| !slot.is_occupied())
        {
            self.slots.pop();
        }
        if self.slots.len() > capacity {
            log::warn!(
                "Pool capacity is {capacity} but slot {} is still occupied; release it to shrink the pool",
                self.slots.len() - 1
            );
        }
    }

    pub(crate) fn to_registry(&self) -> RegistryFile {
        RegistryFile {
            version: registry::REGISTRY_VERSION,
            capacity: self.limit,
            slots: self.slots.iter().map(SlotRecord::from).collect(),
        }
    }

    pub fn layout(&self) -> &PoolLayout {
        &self.layout
    }

    pub fn capacity(&self) -> usize {
        self.limit
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot_for_branch(&self, branch: &str) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|slot| slot.branch.as_deref() == Some(branch))
    }

    /// `(index, branch)` of every occupied slot.
    pub fn occupants(&self) -> Vec<(usize, String)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.branch.clone().map(|b| (slot.index, b)))
            .collect()
    }

    /// Bind `branch` to a slot.
    ///
    /// Returns the slot already holding `branch` if there is one, otherwise
    /// the lowest unoccupied index. Fails with `PoolExhausted` when every slot
    /// is taken.
    pub fn allocate(&mut self, branch: &str) -> anyhow::Result<Slot> {
        if let Some(slot) = self.slot_for_branch(branch) {
            log::debug!("{branch} already holds slot {}", slot.index);
            return Ok(slot.clone());
        }

        let Some(index) = self
            .slots
            .iter()
            .position(|slot| slot.index < self.limit && !slot.is_occupied())
        else {
            return Err(ErkError::PoolExhausted {
                branch: branch.to_string(),
                capacity: self.limit,
                occupants: self.occupants(),
            }
            .into());
        };

        let slot = &mut self.slots[index];
        slot.branch = Some(branch.to_string());
        slot.assigned_at = Some(now_iso8601());
        log::info!("Assigned slot {} to {branch}", slot.index);
        Ok(slot.clone())
    }

    /// Unbind `branch`. Returns the freed index, or `None` if the branch held
    /// no slot.
    pub fn release(&mut self, branch: &str) -> Option<usize> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.branch.as_deref() == Some(branch))?;
        slot.branch = None;
        slot.assigned_at = None;
        log::info!("Released slot {} from {branch}", slot.index);
        Some(slot.index)
    }

    /// A worktree outside the pool; consumes no capacity.
    pub fn allocate_direct(&self, branch: &str) -> Worktree {
        Worktree {
            slot_index: None,
            branch: branch.to_string(),
            path: self.layout.direct_path(branch),
        }
    }
}

//! Persistent slot registry
//!
//! The registry is one small JSON file, `<git-common-dir>/erk/pool.json`:
//!
//! ```json
//! {"version":1,"capacity":2,"slots":[{"index":0,"branch":"feat-a","assigned_at":"2025-01-01T00:00:00Z"},{"index":1}]}
//! ```
//!
//! Every read-modify-write runs inside [`RegistryHandle::transaction`], which
//! holds an exclusive `fs2` lock on `pool.json.lock` for the whole closure and
//! writes the result atomically (temp file + rename). A closure that returns
//! an error leaves the file untouched.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::{PoolLayout, Slot, SlotPool};
use crate::error::ErkError;

/// Current on-disk format version.
pub const REGISTRY_VERSION: u32 = 1;

/// How long to wait for another process holding the registry lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl LockPolicy {
    /// Fail immediately when the lock is held.
    pub fn no_wait() -> Self {
        Self {
            timeout: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: u32,
    pub capacity: usize,
    pub slots: Vec<SlotRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<String>,
}

impl From<&Slot> for SlotRecord {
    fn from(slot: &Slot) -> Self {
        Self {
            index: slot.index,
            branch: slot.branch.clone(),
            assigned_at: slot.assigned_at.clone(),
        }
    }
}

/// Handle to the registry file plus the locking policy used to access it.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    path: PathBuf,
    capacity: usize,
    policy: LockPolicy,
}

/// Exclusive lock on the registry; released on drop.
#[derive(Debug)]
pub struct RegistryLock {
    _file: File,
}

impl RegistryHandle {
    pub fn new(path: impl Into<PathBuf>, capacity: usize, policy: LockPolicy) -> Self {
        Self {
            path: path.into(),
            capacity,
            policy,
        }
    }

    /// Registry location for a repository: `<git-common-dir>/erk/pool.json`.
    pub fn default_path(git_common_dir: &Path) -> PathBuf {
        git_common_dir.join("erk").join("pool.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    /// Take the exclusive lock, polling until [`LockPolicy::timeout`].
    pub fn lock(&self) -> anyhow::Result<RegistryLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    log::debug!("Locked {} after {:?}", lock_path.display(), start.elapsed());
                    return Ok(RegistryLock { _file: file });
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    let waited = start.elapsed();
                    if waited >= self.policy.timeout {
                        return Err(ErkError::RegistryBusy {
                            path: self.path.clone(),
                            waited,
                        }
                        .into());
                    }
                    std::thread::sleep(self.policy.poll_interval);
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to lock {}", lock_path.display())));
                }
            }
        }
    }

    /// Read the registry without locking.
    ///
    /// Writes are atomic renames, so an unlocked read always sees a complete
    /// file. A missing file is an empty pool.
    pub fn load(&self, layout: &PoolLayout) -> anyhow::Result<SlotPool> {
        let file = match std::fs::read_to_string(&self.path) {
            Ok(contents) => Some(self.parse(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ErkError::RegistryCorrupt {
                    path: self.path.clone(),
                    error: e.to_string(),
                }
                .into());
            }
        };
        Ok(SlotPool::from_registry(layout.clone(), self.capacity, file))
    }

    fn parse(&self, contents: &str) -> anyhow::Result<RegistryFile> {
        let corrupt = |error: String| ErkError::RegistryCorrupt {
            path: self.path.clone(),
            error,
        };
        let file: RegistryFile =
            serde_json::from_str(contents).map_err(|e| corrupt(e.to_string()))?;
        if file.version != REGISTRY_VERSION {
            return Err(corrupt(format!(
                "unsupported version {} (expected {REGISTRY_VERSION})",
                file.version
            ))
            .into());
        }
        // Saves write every slot, so a valid index is below the record count
        // unless the configured capacity has since grown.
        let bound = file.slots.len().max(self.capacity);
        let mut indices = std::collections::HashSet::new();
        let mut branches = std::collections::HashSet::new();
        for record in &file.slots {
            if record.index >= bound {
                return Err(corrupt(format!("slot index {} is out of range", record.index)).into());
            }
            if !indices.insert(record.index) {
                return Err(corrupt(format!("slot {} is listed more than once", record.index)).into());
            }
            if let Some(branch) = &record.branch
                && !branches.insert(branch.as_str())
            {
                return Err(corrupt(format!("branch {branch} occupies more than one slot")).into());
            }
        }
        Ok(file)
    }

    /// Atomically replace the registry with `pool`'s state.
    pub fn save(&self, pool: &SlotPool) -> anyhow::Result<()> {
        let dir = self
            .path
            .parent()
            .context("Registry path has no parent directory")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let json = serde_json::to_string_pretty(&pool.to_registry())?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Lock, load, run `f`, persist if `f` succeeded and changed anything, unlock.
    ///
    /// On error nothing is written, so an allocation made inside a failed
    /// closure never reaches disk.
    pub fn transaction<T>(
        &self,
        layout: &PoolLayout,
        f: impl FnOnce(&mut SlotPool) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let _lock = self.lock()?;
        let mut pool = self.load(layout)?;
        let before = pool.to_registry();
        let value = f(&mut pool)?;
        if pool.to_registry() != before || !self.path.exists() {
            self.save(&pool)?;
        }
        Ok(value)
    }
}

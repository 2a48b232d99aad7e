//! User-level configuration
//!
//! Personal preferences, not checked into git.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::project::ProjectConfig;
use crate::pool::DEFAULT_CAPACITY;
use crate::pool::registry::LockPolicy;

/// Override for user config path, set via --config CLI flag
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Set the user config path override (called from CLI --config flag)
pub fn set_config_path(path: PathBuf) {
    CONFIG_PATH.set(path).ok();
}

/// User-level configuration.
///
/// Stored at `~/.config/erk/config.toml` (or platform equivalent).
///
/// ```toml
/// worktrees-dir = "~/worktrees/{{ repo }}"
/// pool-size = 8
/// lock-timeout-ms = 30000
/// ```
///
/// `worktrees-dir` is a template (variables: `{{ repo }}`) resolved relative
/// to the repository root; `~` expands to the home directory.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktrees_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,

    /// How long to wait for the registry lock before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_ms: Option<u64>,
}

impl UserConfig {
    /// Load from the configured path. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No user config at {}", path.display());
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    error: error.to_string(),
                });
            }
        };
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.message().to_string(),
        })
    }

    /// Pool size: user setting, then project setting, then the default.
    pub fn pool_size(&self, project: Option<&ProjectConfig>) -> usize {
        self.pool_size
            .or_else(|| project.and_then(|p| p.pool_size))
            .unwrap_or(DEFAULT_CAPACITY)
    }

    pub fn lock_policy(&self) -> LockPolicy {
        match self.lock_timeout_ms {
            Some(ms) => LockPolicy {
                timeout: Duration::from_millis(ms),
                ..LockPolicy::default()
            },
            None => LockPolicy::default(),
        }
    }
}

/// Path of the user config file.
///
/// Priority: `--config` flag, then `ERK_CONFIG_PATH`, then the platform
/// config directory (`$XDG_CONFIG_HOME/erk/config.toml`).
pub fn get_config_path() -> Option<PathBuf> {
    if let Some(path) = CONFIG_PATH.get() {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("ERK_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }

    // Unit tests never read the real user config
    if cfg!(test) {
        return None;
    }

    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("erk").join("config.toml"))
}

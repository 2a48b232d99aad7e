//! Project-level configuration
//!
//! Checked into the repository at `<repo>/.erk/config.toml` and shared by
//! everyone working on the project.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::commands::CommandConfig;

/// Location of the project config, relative to the repository root.
pub const PROJECT_CONFIG_RELATIVE_PATH: &str = ".erk/config.toml";

/// Project-specific configuration.
///
/// ```toml
/// pool-size = 6
/// trunk = "main"
/// sync-command = "uv sync --frozen"
///
/// [post-create]
/// hooks = "pre-commit install"
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Number of pooled slots. User config takes precedence when both set it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,

    /// Commands appended to every activation script, in order.
    ///
    /// Available template variables: `{{ repo }}`, `{{ repo_path }}`,
    /// `{{ branch }}`, `{{ worktree_path }}`, `{{ slot }}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_create: Option<CommandConfig>,

    /// Creates the managed environment when `venv-dir` is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venv_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,

    /// Branch that `erk land` fast-forwards into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trunk: Option<String>,

    /// Captures unknown fields for validation warnings
    #[serde(flatten, default, skip_serializing)]
    pub unknown: BTreeMap<String, toml::Value>,
}

impl ProjectConfig {
    pub fn path_in(repo_root: &Path) -> PathBuf {
        repo_root.join(PROJECT_CONFIG_RELATIVE_PATH)
    }

    /// Load the project config from the repository root.
    ///
    /// A missing file is not an error: projects need no config at all.
    pub fn load(repo_root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = Self::path_in(repo_root);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(ConfigError::Read { path, error: error.to_string() }),
        };
        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            error: e.message().to_string(),
        })?;
        for key in config.unknown.keys() {
            log::warn!("Unknown key {key:?} in {}", path.display());
        }
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectConfig::load(dir.path()).unwrap(), None);
    }

    #[test]
    fn load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".erk")).unwrap();
        std::fs::write(
            ProjectConfig::path_in(dir.path()),
            r#"
pool-size = 6
trunk = "develop"
venv-dir = ".env-py"

[post-create]
hooks = "pre-commit install"
deps = "npm ci"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.pool_size, Some(6));
        assert_eq!(config.trunk.as_deref(), Some("develop"));
        assert_eq!(config.venv_dir.as_deref(), Some(".env-py"));
        assert_eq!(config.sync_command, None);
        let commands = config.post_create.unwrap();
        assert_eq!(commands.commands().len(), 2);
        assert_eq!(commands.commands()[1].template, "npm ci");
    }

    #[test]
    fn unknown_keys_are_captured_not_rejected() {
        let config: ProjectConfig = toml::from_str("pool-sise = 3\n").unwrap();
        assert!(config.unknown.contains_key("pool-sise"));
        assert_eq!(config.pool_size, None);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".erk")).unwrap();
        std::fs::write(ProjectConfig::path_in(dir.path()), "pool-size = \"many\"\n").unwrap();

        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}

//! Activation scripts
//!
//! Every worktree gets `.erk/bin/activate.sh`, a POSIX shell script the user
//! sources to enter the worktree: it changes directory, creates the managed
//! environment when missing, activates it, loads the env file, then runs the
//! project's `post-create` commands. Named *deferred* scripts
//! (`.erk/bin/<name>.sh`) stash follow-up commands for later sourcing.
//!
//! Rendering goes through minijinja. Every interpolated value is shell-quoted
//! before it reaches the template; only configured commands are inserted
//! verbatim.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use minijinja::{Environment, context};
use shell_escape::escape;

use crate::config::{Command, ProjectConfig, expand_template};
use crate::error::ErkError;
use crate::lifecycle::Worktree;

/// Directory holding scripts, relative to the worktree root.
pub const SCRIPT_DIR: &str = ".erk/bin";
/// Stem of the main activation script; reserved for deferred scripts.
pub const ACTIVATE_NAME: &str = "activate";

const DEFAULT_SYNC_COMMAND: &str = "uv sync";
const DEFAULT_VENV_DIR: &str = ".venv";
const DEFAULT_ENV_FILE: &str = ".env";

const ACTIVATE_TEMPLATE: &str = r#"# erk activation script for {{ branch }}
# Usage: source {{ script_path }}
cd {{ worktree_path }} || return 1
{% if sync_command %}
if [ ! -d {{ venv_dir }} ]; then
    {{ sync_command }}
fi
{% endif %}
if [ -f {{ venv_activate }} ]; then
    . {{ venv_activate }}
fi
if [ -f {{ env_file }} ]; then
    set -a
    . {{ env_file }}
    set +a
fi
{% for command in post_create %}
{{ command }}
{% endfor %}
echo {{ confirmation }}
"#;

const DEFERRED_TEMPLATE: &str = r#"# erk deferred script {{ name }} for {{ branch }}
# Usage: source {{ script_path }}
cd {{ worktree_path }} || return 1
{{ body }}
"#;

/// What goes into an activation script besides the worktree itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationConfig {
    /// Run in order after the environment is set up
    pub post_create: Vec<Command>,
    /// Creates the environment when `venv_dir` is missing; `None` skips it
    pub sync_command: Option<String>,
    /// Relative to the worktree root
    pub venv_dir: String,
    /// Relative to the worktree root
    pub env_file: String,
    /// Main repository root, exposed to `post-create` templates
    pub repo_root: Option<PathBuf>,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            post_create: Vec::new(),
            sync_command: Some(DEFAULT_SYNC_COMMAND.to_string()),
            venv_dir: DEFAULT_VENV_DIR.to_string(),
            env_file: DEFAULT_ENV_FILE.to_string(),
            repo_root: None,
        }
    }
}

impl ActivationConfig {
    /// Project settings layered over the defaults. An empty `sync-command`
    /// disables environment creation.
    pub fn from_project(repo_root: &Path, project: Option<&ProjectConfig>) -> Self {
        let mut config = Self {
            repo_root: Some(repo_root.to_path_buf()),
            ..Self::default()
        };
        let Some(project) = project else {
            return config;
        };
        if let Some(commands) = &project.post_create {
            config.post_create = commands.commands().to_vec();
        }
        if let Some(sync) = &project.sync_command {
            config.sync_command = Some(sync.clone()).filter(|s| !s.trim().is_empty());
        }
        if let Some(venv) = &project.venv_dir {
            config.venv_dir = venv.clone();
        }
        if let Some(env_file) = &project.env_file {
            config.env_file = env_file.clone();
        }
        config
    }
}

/// Path of the script named `name` inside `worktree_root`.
pub fn script_path(worktree_root: &Path, name: &str) -> PathBuf {
    worktree_root.join(SCRIPT_DIR).join(format!("{name}.sh"))
}

fn quote(value: &str) -> String {
    escape(Cow::Borrowed(value)).into_owned()
}

fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// `.` searches `PATH` for bare names; relative paths need a `./` prefix.
fn sourceable(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_relative() && !path.starts_with(".") {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env
}

/// Expand each `post-create` template against the worktree.
fn expand_post_create(worktree: &Worktree, config: &ActivationConfig) -> anyhow::Result<Vec<String>> {
    let repo_path = config
        .repo_root
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let repo = config
        .repo_root
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let worktree_path = worktree.path.to_string_lossy();
    let slot = worktree
        .slot_index
        .map(|i| i.to_string())
        .unwrap_or_default();

    let vars: HashMap<&str, &str> = HashMap::from([
        ("repo", repo.as_str()),
        ("repo_path", repo_path.as_str()),
        ("branch", worktree.branch.as_str()),
        ("worktree_path", &*worktree_path),
        ("slot", slot.as_str()),
    ]);

    config
        .post_create
        .iter()
        .enumerate()
        .map(|(i, command)| {
            let name = command
                .name
                .clone()
                .unwrap_or_else(|| format!("post-create[{i}]"));
            expand_template(&command.template, &vars, true, &name)
                .map_err(|e| anyhow::anyhow!("Failed to expand {name}: {e}"))
        })
        .collect()
}

/// Render the activation script for `worktree`.
pub fn render(worktree: &Worktree, config: &ActivationConfig) -> anyhow::Result<String> {
    let post_create = expand_post_create(worktree, config)?;
    let venv_dir = Path::new(&config.venv_dir);
    let script = worktree.activation_script_path();

    let env = environment();
    let rendered = env.render_str(
        ACTIVATE_TEMPLATE,
        context! {
            branch => worktree.branch,
            script_path => quote_path(&script),
            worktree_path => quote_path(&worktree.path),
            sync_command => config.sync_command,
            venv_dir => quote_path(venv_dir),
            venv_activate => quote_path(&sourceable(&venv_dir.join("bin").join("activate"))),
            env_file => quote_path(&sourceable(&config.env_file)),
            post_create => post_create,
            confirmation => quote(&format!("Activated {} at {}", worktree.branch, worktree.path.display())),
        },
    )?;
    Ok(rendered)
}

/// Render and write `activate.sh`, replacing any existing script.
pub fn write(worktree: &Worktree, config: &ActivationConfig) -> anyhow::Result<PathBuf> {
    let contents = render(worktree, config)?;
    let path = worktree.activation_script_path();
    write_script(&worktree.path, &path, &contents)?;
    log::debug!("Wrote activation script {}", path.display());
    Ok(path)
}

/// Write `activate.sh` only if it does not exist yet.
pub fn ensure(worktree: &Worktree, config: &ActivationConfig) -> anyhow::Result<PathBuf> {
    let path = worktree.activation_script_path();
    if path.is_file() {
        log::debug!("Activation script already present at {}", path.display());
        return Ok(path);
    }
    write(worktree, config)
}

/// Write a deferred script `.erk/bin/<name>.sh` running `body` from the
/// worktree root.
///
/// `name` must match `[A-Za-z0-9_-]+` and must not be `activate`.
pub fn write_named(worktree: &Worktree, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    if !is_valid_script_name(name) {
        return Err(ErkError::InvalidScriptName {
            name: name.to_string(),
        }
        .into());
    }
    let path = script_path(&worktree.path, name);
    let contents = environment().render_str(
        DEFERRED_TEMPLATE,
        context! {
            name => name,
            branch => worktree.branch,
            script_path => quote_path(&path),
            worktree_path => quote_path(&worktree.path),
            body => body.trim_end(),
        },
    )?;
    write_script(&worktree.path, &path, &contents)?;
    log::info!("Wrote deferred script {}", path.display());
    Ok(path)
}

fn is_valid_script_name(name: &str) -> bool {
    !name.is_empty()
        && name != ACTIVATE_NAME
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn write_script(worktree_root: &Path, path: &Path, contents: &str) -> anyhow::Result<()> {
    let dir = worktree_root.join(SCRIPT_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    // Generated scripts never show up in `git status`
    std::fs::write(dir.join(".gitignore"), "*\n")
        .with_context(|| format!("Failed to write {}", dir.join(".gitignore").display()))?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }
    Ok(())
}

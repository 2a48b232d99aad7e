use std::path::{Path, PathBuf};

use normalize_path::NormalizePath;

/// Get the user's home directory.
///
/// Uses the `home` crate which handles platform-specific detection:
/// - Unix: `$HOME` environment variable
/// - Windows: `USERPROFILE` or `HOMEDRIVE`/`HOMEPATH`
pub fn home_dir() -> Option<PathBuf> {
    home::home_dir()
}

/// Format a filesystem path for user-facing output.
///
/// Replaces home directory prefix with `~` (e.g., `/Users/alex/src/erk` -> `~/src/erk`).
/// Paths outside home are returned unchanged.
pub fn format_path_for_display(path: &Path) -> String {
    if let Some(home) = home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }

        let mut display_path = PathBuf::from("~");
        display_path.push(stripped);
        return display_path.display().to_string();
    }

    path.display().to_string()
}

/// Turn a branch name into a single path component.
///
/// Path separators become `-`, then anything still unsafe in a file name is
/// dropped.
///
/// ```
/// use erk::path::sanitize_branch_name;
///
/// assert_eq!(sanitize_branch_name("feature/foo"), "feature-foo");
/// assert_eq!(sanitize_branch_name("user\\task"), "user-task");
/// assert_eq!(sanitize_branch_name("P4655-fix-login"), "P4655-fix-login");
/// ```
pub fn sanitize_branch_name(branch: &str) -> String {
    sanitize_filename::sanitize(branch.replace(['/', '\\'], "-"))
}

/// Resolve a user-supplied directory setting.
///
/// `~` is expanded, relative paths are taken relative to `base`, and `..`
/// components are folded so the result is stable for comparisons.
pub fn resolve_configured_dir(value: &str, base: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(value).as_ref());
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    joined.normalize()
}

/// Compare two paths after normalisation, canonicalising when both exist.
///
/// Git reports canonical worktree paths; on macOS `/var` is a symlink to
/// `/private/var`, so a lexical comparison alone is not enough.
pub fn same_path(a: &Path, b: &Path) -> bool {
    if a.normalize() == b.normalize() {
        return true;
    }
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn shortens_path_under_home() {
        let Some(home) = home_dir() else {
            return;
        };

        let path = home.join("projects").join("erk");
        let formatted = format_path_for_display(&path);

        assert!(formatted.starts_with("~"), "Expected tilde prefix, got {formatted}");
        assert!(formatted.ends_with("erk"));
    }

    #[test]
    fn shows_home_as_tilde() {
        let Some(home) = home_dir() else {
            return;
        };
        assert_eq!(format_path_for_display(&home), "~");
    }

    #[test]
    fn leaves_non_home_paths_unchanged() {
        let path = PathBuf::from("/definitely/not/under/home/dir");
        assert_eq!(format_path_for_display(&path), "/definitely/not/under/home/dir");
    }

    #[test]
    fn sanitize_drops_unsafe_characters() {
        assert_eq!(sanitize_branch_name("fix:colon"), "fixcolon");
        assert_eq!(sanitize_branch_name("a/b/c"), "a-b-c");
    }

    #[test]
    fn resolve_configured_dir_relative_and_absolute() {
        let base = Path::new("/repos/app");
        assert_eq!(
            resolve_configured_dir("../app.pool", base),
            PathBuf::from("/repos/app.pool")
        );
        assert_eq!(
            resolve_configured_dir("/srv/pool", base),
            PathBuf::from("/srv/pool")
        );
    }

    #[test]
    fn same_path_folds_dot_components() {
        assert!(same_path(
            Path::new("/tmp/pool/slots/../slots/slot-00"),
            Path::new("/tmp/pool/slots/slot-00")
        ));
        assert!(!same_path(
            Path::new("/tmp/pool/slots/slot-00"),
            Path::new("/tmp/pool/slots/slot-01")
        ));
    }
}

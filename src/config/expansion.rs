//! Template expansion for configured commands
//!
//! Uses minijinja. Single generic function with escaping flag:
//! - `shell_escape: true` — values are shell-escaped for safe command execution
//! - `shell_escape: false` — literal values for filesystem paths

use std::borrow::Cow;
use std::collections::HashMap;

use color_print::cformat;
use minijinja::{Environment, UndefinedBehavior, Value};
use shell_escape::escape;

use crate::path::sanitize_branch_name;
use crate::styling::{eprintln, format_with_gutter, info_message, verbosity};

/// Variables available to `post-create` templates.
pub const TEMPLATE_VARS: &[&str] = &["repo", "repo_path", "branch", "worktree_path", "slot"];

/// Expand a template with variable substitution.
///
/// # Filters
/// - `sanitize` — Replace `/` and `\` with `-` for filesystem-safe paths
///
/// The `name` parameter appears in error messages to identify which template
/// failed.
///
/// ```
/// use std::collections::HashMap;
/// use erk::config::expand_template;
///
/// let vars = HashMap::from([("branch", "feat/x y")]);
/// let out = expand_template("echo {{ branch }}", &vars, true, "demo").unwrap();
/// assert_eq!(out, "echo 'feat/x y'");
/// ```
pub fn expand_template(
    template: &str,
    vars: &HashMap<&str, &str>,
    shell_escape: bool,
    name: &str,
) -> Result<String, String> {
    let context: HashMap<String, Value> = vars
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from((*value).to_string())))
        .collect();

    let mut env = Environment::new();
    // SemiStrict: errors on undefined variable use (printing, iteration) but
    // allows truthiness checks ({% if var %})
    env.set_undefined_behavior(UndefinedBehavior::SemiStrict);
    if shell_escape {
        env.set_keep_trailing_newline(true);
        // Escape at output time so filters see raw values
        env.set_formatter(|out, _state, value| {
            if value.is_none() {
                return Ok(());
            }
            let s = value.to_string();
            let escaped = escape(Cow::Borrowed(&s));
            write!(out, "{escaped}")?;
            Ok(())
        });
    }
    env.add_filter("sanitize", |value: Value| -> String {
        sanitize_branch_name(value.as_str().unwrap_or_default())
    });

    let verbose = verbosity();
    if verbose >= 2 {
        let mut sorted_vars: Vec<_> = vars.iter().collect();
        sorted_vars.sort_by_key(|(k, _)| *k);
        log::debug!("[template:{name}] template={template:?}");
        log::debug!(
            "[template:{name}] vars={{{}}}",
            sorted_vars
                .iter()
                .map(|(k, v)| format!("{k}={v:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let tmpl = env
        .template_from_named_str(name, template)
        .map_err(|e| format!("Template syntax error: {e}"))?;
    let result = tmpl
        .render(Value::from_serialize(&context))
        .map_err(|e| format!("Template render error: {e}"))?;

    if verbose >= 2 {
        log::debug!("[template:{name}] result={result:?}");
    }
    if verbose == 1 {
        let header = info_message(cformat!("Expanding <bold>{name}</>"));
        let gutter = format_with_gutter(&cformat!("{template} <dim>→</> {result}"), None);
        eprintln!("{header}\n{gutter}");
    }
    Ok(result)
}

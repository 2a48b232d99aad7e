pub(crate) mod checkout;
pub(crate) mod context;
pub(crate) mod land;
pub(crate) mod resolve;
pub(crate) mod slot;
pub(crate) mod worktree;

pub(crate) use checkout::handle_checkout;
pub(crate) use land::{LandOptions, handle_land};
pub(crate) use resolve::handle_resolve;
pub(crate) use slot::handle_slot_check;
pub(crate) use worktree::{
    RemoveOptions, handle_wt_create, handle_wt_defer, handle_wt_list, handle_wt_remove,
};

use color_print::cformat;
use erk::lifecycle::Worktree;
use erk::mutation::{AssumeYes, InteractivePrompter, Prompter};
use erk::path::format_path_for_display;
use erk::styling::{eprintln, hint_message, println, success_message};
use serde::Serialize;

use crate::cli::OutputFormat;

pub(crate) fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn prompter(yes: bool) -> Box<dyn Prompter> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(InteractivePrompter)
    }
}

#[derive(Serialize)]
struct WorktreeJson<'a> {
    branch: &'a str,
    slot: Option<usize>,
    path: String,
    activation_script: String,
}

/// Report a ready worktree. The script path alone goes to stdout so callers
/// can `source "$(erk …)"`.
pub(crate) fn report_worktree(worktree: &Worktree, format: OutputFormat) -> anyhow::Result<()> {
    let script = worktree.activation_script_path();
    match format {
        OutputFormat::Json => print_json(&WorktreeJson {
            branch: &worktree.branch,
            slot: worktree.slot_index,
            path: worktree.path.display().to_string(),
            activation_script: script.display().to_string(),
        }),
        OutputFormat::Text => {
            let path = format_path_for_display(&worktree.path);
            let location = match worktree.slot_index {
                Some(index) => format!("slot {index}"),
                None => "direct worktree".to_string(),
            };
            eprintln!(
                "{}",
                success_message(cformat!(
                    "<bold>{}</> is ready at <bold>{path}</> ({location})",
                    worktree.branch
                ))
            );
            eprintln!(
                "{}",
                hint_message(cformat!(
                    "Enter it with <bright-black>source {}</>",
                    format_path_for_display(&script)
                ))
            );
            println!("{}", script.display());
            Ok(())
        }
    }
}

use color_print::cformat;
use erk::git::Repository;
use erk::resolve::{FsMetadata, ResolutionSource, ResolvedTarget, resolve_target};
use erk::styling::{eprintln, info_message, println};

use super::print_json;
use crate::cli::OutputFormat;

/// Resolve against the current directory: its branch and its
/// `.impl/issue.json`.
pub(crate) fn resolve_here(target: Option<&str>, strict: bool) -> anyhow::Result<ResolvedTarget> {
    let repo = Repository::current();
    let metadata = FsMetadata::in_dir(repo.base_path());
    let branch = match target {
        // An explicit argument never falls through, so the branch is irrelevant
        Some(_) => None,
        None => repo.current_branch()?.map(str::to_string),
    };
    resolve_target(target, branch.as_deref(), &metadata, strict)
}

pub(crate) fn handle_resolve(
    target: Option<&str>,
    strict: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let resolved = resolve_here(target, strict)?;
    match format {
        OutputFormat::Json => print_json(&resolved),
        OutputFormat::Text => {
            let tier = match resolved.source {
                ResolutionSource::Explicit => "argument",
                ResolutionSource::BranchName => "branch name",
                ResolutionSource::MetadataFile => "metadata file",
            };
            eprintln!(
                "{}",
                info_message(cformat!("Resolved <bold>P{}</> from {tier}", resolved.issue))
            );
            println!("{}", resolved.issue);
            Ok(())
        }
    }
}

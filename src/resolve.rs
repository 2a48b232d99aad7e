//! Branch/target resolution
//!
//! Turns ambiguous command-line input into one issue number. Tiers, first match
//! wins:
//!
//! 1. the explicit argument (`123`, `#123`, `P123`, or an issue URL);
//! 2. the current branch name, when it follows the `P<issue>-<slug>` convention;
//! 3. the issue metadata file `.impl/issue.json` in the working directory.
//!
//! An explicit argument that does not parse is an error; it never falls
//! through to the later tiers. A convention branch name settles the target
//! without reading the metadata file.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::error::ErkError;

/// Location of the issue metadata file, relative to the working directory.
pub const METADATA_RELATIVE_PATH: &str = ".impl/issue.json";

/// Maximum length of the slug part of a convention branch name.
const SLUG_MAX_LEN: usize = 40;

/// Which tier produced a [`ResolvedTarget`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResolutionSource {
    Explicit,
    BranchName,
    MetadataFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub issue: u64,
    pub source: ResolutionSource,
}

/// Outcome of reading the metadata side channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataLookup {
    Found(u64),
    /// No metadata file
    Missing,
    /// The file exists but can't be used; the string says why
    Invalid(String),
}

/// Read-only lookup of stored issue metadata.
pub trait MetadataSource {
    fn lookup(&self) -> MetadataLookup;

    /// Where the metadata lives, for messages.
    fn location(&self) -> PathBuf;
}

/// `.impl/issue.json` under a directory.
#[derive(Debug, Clone)]
pub struct FsMetadata {
    path: PathBuf,
}

impl FsMetadata {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(METADATA_RELATIVE_PATH),
        }
    }
}

impl MetadataSource for FsMetadata {
    fn lookup(&self) -> MetadataLookup {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => parse_metadata(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MetadataLookup::Missing,
            Err(e) => MetadataLookup::Invalid(format!("unreadable: {e}")),
        }
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

/// Metadata held in memory; `None` behaves like a missing file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    pub contents: Option<String>,
}

impl InMemoryMetadata {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

impl MetadataSource for InMemoryMetadata {
    fn lookup(&self) -> MetadataLookup {
        match &self.contents {
            Some(contents) => parse_metadata(contents),
            None => MetadataLookup::Missing,
        }
    }

    fn location(&self) -> PathBuf {
        PathBuf::from(METADATA_RELATIVE_PATH)
    }
}

/// Parse the metadata JSON: an object whose `issue_number` is an integer or a
/// numeric string.
pub fn parse_metadata(contents: &str) -> MetadataLookup {
    let value: serde_json::Value = match serde_json::from_str(contents) {
        Ok(value) => value,
        Err(e) => return MetadataLookup::Invalid(format!("invalid JSON: {e}")),
    };
    let Some(object) = value.as_object() else {
        return MetadataLookup::Invalid("not a JSON object".to_string());
    };
    let issue = match object.get("issue_number") {
        None => return MetadataLookup::Invalid("missing \"issue_number\"".to_string()),
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match issue {
        Some(issue) if issue > 0 => MetadataLookup::Found(issue),
        _ => MetadataLookup::Invalid("\"issue_number\" is not a positive integer".to_string()),
    }
}

/// Resolve the target issue.
///
/// `strict` turns an unusable metadata file into an error instead of
/// "not found". A missing file is never an error.
///
/// ```
/// use erk::resolve::{InMemoryMetadata, ResolutionSource, resolve_target};
///
/// let meta = InMemoryMetadata::new(r#"{"issue_number": 7}"#);
/// let target = resolve_target(None, Some("P4655-fix-login"), &meta, false)?;
/// assert_eq!(target.issue, 4655);
/// assert_eq!(target.source, ResolutionSource::BranchName);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn resolve_target(
    explicit: Option<&str>,
    current_branch: Option<&str>,
    metadata: &dyn MetadataSource,
    strict: bool,
) -> anyhow::Result<ResolvedTarget> {
    if let Some(input) = explicit {
        let issue = parse_explicit(input).ok_or_else(|| ErkError::InvalidTarget {
            input: input.to_string(),
        })?;
        return Ok(ResolvedTarget {
            issue,
            source: ResolutionSource::Explicit,
        });
    }

    if let Some(issue) = current_branch.and_then(parse_branch_issue) {
        return Ok(ResolvedTarget {
            issue,
            source: ResolutionSource::BranchName,
        });
    }

    match metadata.lookup() {
        MetadataLookup::Found(issue) => Ok(ResolvedTarget {
            issue,
            source: ResolutionSource::MetadataFile,
        }),
        MetadataLookup::Invalid(reason) if strict => Err(ErkError::MetadataInvalid {
            path: metadata.location(),
            reason,
        }
        .into()),
        MetadataLookup::Invalid(reason) => {
            log::debug!(
                "Ignoring {}: {reason}",
                metadata.location().display()
            );
            Err(resolution_failed(current_branch, metadata))
        }
        MetadataLookup::Missing => Err(resolution_failed(current_branch, metadata)),
    }
}

fn resolution_failed(current_branch: Option<&str>, metadata: &dyn MetadataSource) -> anyhow::Error {
    ErkError::ResolutionFailed {
        branch: current_branch.map(str::to_string),
        metadata_path: metadata.location(),
    }
    .into()
}

/// Parse an explicit target: `123`, `#123`, `P123`, or a URL ending in
/// `/issues/123` (optionally followed by `/`, a query or a fragment).
///
/// Zero is never a valid issue number.
pub fn parse_explicit(input: &str) -> Option<u64> {
    thread_local! {
        static ISSUE_URL: Regex =
            Regex::new(r"^https?://[^\s/]+/\S*?/issues/([0-9]+)/?(?:[?#]\S*)?$").unwrap();
    }

    let input = input.trim();
    let digits = if let Some(rest) = input.strip_prefix('#') {
        rest
    } else if let Some(rest) = input.strip_prefix('P') {
        rest
    } else if input.starts_with("http://") || input.starts_with("https://") {
        return ISSUE_URL
            .with(|re| re.captures(input).map(|c| c[1].to_string()))
            .and_then(|d| parse_issue_digits(&d));
    } else {
        input
    };
    parse_issue_digits(digits)
}

fn parse_issue_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().filter(|&n| n > 0)
}

/// Extract the issue from a convention branch name.
///
/// Grammar: `P`, one or more ASCII digits, then `-` or end of string.
///
/// ```
/// use erk::resolve::parse_branch_issue;
///
/// assert_eq!(parse_branch_issue("P4655-fix-login"), Some(4655));
/// assert_eq!(parse_branch_issue("P12"), Some(12));
/// assert_eq!(parse_branch_issue("p12-x"), None);
/// assert_eq!(parse_branch_issue("feature/P12-x"), None);
/// ```
pub fn parse_branch_issue(branch: &str) -> Option<u64> {
    let rest = branch.strip_prefix('P')?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (digits, tail) = rest.split_at(digits_end);
    if !(tail.is_empty() || tail.starts_with('-')) {
        return None;
    }
    parse_issue_digits(digits)
}

/// Build the convention branch name for an issue: `P<issue>-<slug>`.
///
/// The slug is the title lowercased, with runs of non-alphanumeric ASCII
/// collapsed to `-`, capped at 40 characters. An empty slug yields `P<issue>`.
///
/// ```
/// use erk::resolve::branch_name_for_issue;
///
/// assert_eq!(branch_name_for_issue(4655, "Fix login on Safari!"), "P4655-fix-login-on-safari");
/// assert_eq!(branch_name_for_issue(7, "  "), "P7");
/// ```
pub fn branch_name_for_issue(issue: u64, title: &str) -> String {
    let mut slug = String::new();
    for word in title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_ascii_lowercase();
        let needed = if slug.is_empty() { word.len() } else { word.len() + 1 };
        if slug.len() + needed > SLUG_MAX_LEN {
            if slug.is_empty() {
                slug.push_str(&word[..SLUG_MAX_LEN]);
            }
            break;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&word);
    }

    if slug.is_empty() {
        format!("P{issue}")
    } else {
        format!("P{issue}-{slug}")
    }
}

/// Pick the local branch keyed by `issue`.
///
/// An exact `P<issue>` wins; otherwise the first (sorted) `P<issue>-…`.
pub fn find_branch_for_issue<'a>(issue: u64, branches: &'a [String]) -> Option<&'a str> {
    let mut matches: Vec<&str> = branches
        .iter()
        .map(String::as_str)
        .filter(|b| parse_branch_issue(b) == Some(issue))
        .collect();
    matches.sort_unstable();

    let exact = format!("P{issue}");
    if let Some(exact) = matches.iter().copied().find(|b| *b == exact) {
        return Some(exact);
    }
    if matches.len() > 1 {
        log::debug!("Several branches for issue {issue}: {}; using {}", matches.join(", "), matches[0]);
    }
    matches.first().copied()
}

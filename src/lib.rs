//! Pooled git worktrees keyed by issue.
//!
//! erk keeps a fixed-size pool of worktree directories (slots) next to a
//! repository, tracks which branch occupies which slot in a locked registry,
//! and resolves an issue number from an argument, the current branch name or
//! `.impl/issue.json`. Destructive commands run through a two-phase protocol
//! ([`mutation`]) that collects every confirmation before changing anything.
//!
//! The library API is not stable; the `erk` binary is the supported surface.

pub mod activation;
pub mod config;
pub mod error;
pub mod git;
pub mod lifecycle;
pub mod mutation;
pub mod path;
pub mod pool;
pub mod resolve;
pub mod shell_exec;
pub mod styling;
pub mod utils;

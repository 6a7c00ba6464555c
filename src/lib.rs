//! Reconciles a workspace of Git repositories against a declarative plan
//! file: clones, single-branch clones, worktrees, branch/repo creation on
//! the forge, and per-repository pipeline scripts.
//!
//! The library API mirrors the CLI's pipeline: [`planlist::parse`] →
//! [`plan::Planner`] → [`reconcile::Reconciler`] → [`pipeline::Runner`].

pub mod cli;
pub mod concise;
pub mod config;
pub mod emit;
pub mod forge;
pub mod git;
pub mod pipeline;
pub mod plan;
pub mod planlist;
pub mod reconcile;
pub mod remote;
pub mod signals;
pub mod styling;

/// Map a top-level error to a process exit code. Plan errors and forge
/// auth failures abort before any mutation and exit `2`; everything else
/// that reaches `main` as an opaque `anyhow::Error` exits `1`.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<planlist::ListParseError>().is_some()
        || err.downcast_ref::<plan::PlanError>().is_some()
    {
        return 2;
    }
    1
}

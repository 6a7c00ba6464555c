//! Git Driver — a thin, subprocess-based abstraction over the local `git`
//! tool (spec.md §4.2).

mod driver;
mod error;

pub use driver::{Driver, OpResult, WorktreeEntry};
pub use error::GitError;

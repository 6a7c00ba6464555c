//! Git Driver error taxonomy (spec.md §4.2).

use std::fmt;

/// Structured outcomes from a Git Driver operation, distinct from raw
/// subprocess stderr — callers match on these instead of grepping text.
#[derive(Debug)]
pub enum GitError {
    /// Remote asked for credentials non-interactively.
    AuthRequired,
    /// Target directory exists, is non-empty, and is not already a valid
    /// repo with the expected origin.
    NotEmpty { path: std::path::PathBuf },
    /// Target directory already exists as a Git repository, but its
    /// `origin` points at a different remote than the one being reconciled.
    OriginMismatch {
        path: std::path::PathBuf,
        expected: String,
        found: String,
    },
    /// `worktree add` failed because of a stale registration; the Driver
    /// already pruned once and retried, and it failed again.
    StaleWorktree { detail: String },
    /// Network or filesystem error reaching the remote.
    RemoteUnreachable { detail: String },
    /// The requested ref does not exist on the remote.
    RefNotFound { ref_: String },
    /// Any other non-zero exit from the `git` subprocess.
    CommandFailed { command: String, detail: String },
}

impl GitError {
    pub fn message(msg: impl Into<String>) -> Self {
        GitError::CommandFailed {
            command: String::new(),
            detail: msg.into(),
        }
    }
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitError::AuthRequired => write!(f, "git asked for credentials non-interactively"),
            GitError::NotEmpty { path } => {
                write!(f, "target directory is non-empty: {}", path.display())
            }
            GitError::OriginMismatch { path, expected, found } => write!(
                f,
                "{} already exists as a clone of '{found}', not the expected '{expected}'",
                path.display()
            ),
            GitError::StaleWorktree { detail } => {
                write!(f, "stale worktree registration, retry failed: {detail}")
            }
            GitError::RemoteUnreachable { detail } => write!(f, "remote unreachable: {detail}"),
            GitError::RefNotFound { ref_ } => write!(f, "ref not found on remote: {ref_}"),
            GitError::CommandFailed { command, detail } => {
                if command.is_empty() {
                    write!(f, "{detail}")
                } else {
                    write!(f, "{command} failed: {detail}")
                }
            }
        }
    }
}

impl std::error::Error for GitError {}

/// Classify raw `git` stderr into a [`GitError`] variant.
///
/// Git's own error text is not a stable API, so this is necessarily a set of
/// heuristics over common phrasing — mirroring the pragmatic string-matching
/// the teacher's own `GitError`/`From<io::Error>` conversions rely on.
pub fn classify_stderr(command: &str, stderr: &str) -> GitError {
    let lower = stderr.to_lowercase();
    if lower.contains("could not read username")
        || lower.contains("could not read password")
        || lower.contains("terminal prompts disabled")
        || lower.contains("authentication failed")
    {
        return GitError::AuthRequired;
    }
    if lower.contains("already exists and is not an empty directory")
        || lower.contains("destination path") && lower.contains("already exists")
    {
        return GitError::NotEmpty {
            path: std::path::PathBuf::new(),
        };
    }
    if lower.contains("is not a valid ref") || lower.contains("couldn't find remote ref") {
        return GitError::RefNotFound {
            ref_: String::new(),
        };
    }
    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
        || lower.contains("could not connect to")
    {
        return GitError::RemoteUnreachable {
            detail: stderr.trim().to_string(),
        };
    }
    GitError::CommandFailed {
        command: command.to_string(),
        detail: stderr.trim().to_string(),
    }
}

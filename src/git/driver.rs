//! Git Driver — a small set of typed operations over the system `git`
//! binary (spec.md §4.2). All subprocess invocation in the crate goes
//! through this module; no other module spawns `git` directly.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::error::{GitError, classify_stderr};
use crate::remote::Remote;

/// One entry from `git worktree list --porcelain` (spec.md §3, glossary
/// "Worktree").
#[derive(Debug, Clone, PartialEq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub bare: bool,
}

/// Outcome of a Driver clone/worktree-add call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpResult {
    Created,
    AlreadyExisted,
}

pub struct Driver;

impl Driver {
    pub fn new() -> Self {
        Driver
    }

    /// Runs `git <args>`, isolated in its own process group so a terminating
    /// signal received by this process can be forwarded to it explicitly
    /// (spec.md §5, "Cancellation and timeouts") rather than relying on the
    /// terminal delivering it to both processes at once.
    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<(bool, String, String), GitError> {
        log::debug!("$ git {}", args.join(" "));
        let mut cmd = Command::new("git");
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        crate::signals::isolate_process_group(&mut cmd);
        let mut child = cmd.spawn().map_err(|e| GitError::RemoteUnreachable {
            detail: format!("failed to spawn git: {e}"),
        })?;

        let mut stdout_pipe = child.stdout.take().expect("stdout piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr piped");
        let stdout_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            std::io::Read::read_to_end(&mut stdout_pipe, &mut buf).ok();
            buf
        });
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            std::io::Read::read_to_end(&mut stderr_pipe, &mut buf).ok();
            buf
        });

        let status = crate::signals::wait_with_forwarding(child).map_err(|e| GitError::RemoteUnreachable {
            detail: format!("failed to wait for git: {e}"),
        })?;
        let stdout_bytes = stdout_reader.join().unwrap_or_default();
        let stderr_bytes = stderr_reader.join().unwrap_or_default();

        let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_bytes).replace('\r', "\n");
        Ok((status.success(), stdout, stderr))
    }

    fn run_ok(&self, dir: Option<&Path>, args: &[&str]) -> Result<String, GitError> {
        let (ok, stdout, stderr) = self.run(dir, args)?;
        if !ok {
            return Err(classify_stderr(&format!("git {}", args.join(" ")), &stderr));
        }
        Ok(stdout)
    }

    /// Full clone of `remote` into `target`.
    pub fn clone_full(
        &self,
        remote: &Remote,
        target: &Path,
        fetch_all_refs: bool,
    ) -> Result<OpResult, GitError> {
        if let Some(existing) = self.existing_clone_state(target, remote)? {
            return Ok(existing);
        }
        // A full clone already fetches all refs; `fetch_all_refs` (the
        // plan-file `-a` flag) only has bite on an otherwise single-branch
        // operation, so it's accepted here for call-site symmetry but has
        // no effect of its own.
        let _ = fetch_all_refs;
        let url = remote.clone_url();
        let target_str = target.to_string_lossy().into_owned();
        self.run_ok(None, &["clone", url.as_str(), target_str.as_str()])?;
        Ok(OpResult::Created)
    }

    /// Single-branch clone of `remote` on `ref_` into `target`, checked out
    /// on `ref_`. When `fetch_all_refs` is set (the plan-file `-a` flag,
    /// spec.md §4.3), `--single-branch` is omitted so the clone fetches
    /// every branch instead of just `ref_`.
    pub fn clone_single_branch(
        &self,
        remote: &Remote,
        ref_: &str,
        target: &Path,
        fetch_all_refs: bool,
    ) -> Result<OpResult, GitError> {
        if let Some(existing) = self.existing_clone_state(target, remote)? {
            return Ok(existing);
        }
        let url = remote.clone_url();
        let target_str = target.to_string_lossy().into_owned();
        let mut args = vec!["clone"];
        if !fetch_all_refs {
            args.push("--single-branch");
        }
        args.extend(["--branch", ref_, url.as_str(), target_str.as_str()]);
        self.run_ok(None, &args)?;

        if !fetch_all_refs {
            // Append a wildcard refspec so later worktree operations can
            // resolve other branches; tracking-setup errors are non-fatal
            // (spec.md §4.2). Not needed when `-a` already fetched every
            // branch above.
            let _ = self.run(
                Some(target),
                &[
                    "config",
                    "--add",
                    "remote.origin.fetch",
                    "+refs/heads/*:refs/remotes/origin/*",
                ],
            );
        }

        Ok(OpResult::Created)
    }

    /// If `target` already exists as a valid clone of `remote`, report that;
    /// otherwise error if it's a non-empty, non-repo directory.
    fn existing_clone_state(
        &self,
        target: &Path,
        remote: &Remote,
    ) -> Result<Option<OpResult>, GitError> {
        if !target.exists() {
            return Ok(None);
        }
        if target.join(".git").exists() {
            if let Some(origin) = self.remote_origin_url(target)? {
                if origin.canonical_key() != remote.canonical_key() {
                    return Err(GitError::OriginMismatch {
                        path: target.to_path_buf(),
                        expected: remote.canonical_key(),
                        found: origin.canonical_key(),
                    });
                }
            }
            return Ok(Some(OpResult::AlreadyExisted));
        }
        let is_empty = std::fs::read_dir(target)
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if is_empty {
            return Ok(None);
        }
        Err(GitError::NotEmpty {
            path: target.to_path_buf(),
        })
    }

    /// Add a worktree at `target` for `branch`, based on `base_repo`.
    /// Always prunes stale worktree registrations first; if the add still
    /// fails because of a stale entry, prunes once more and retries
    /// (spec.md §4.2).
    pub fn worktree_add(
        &self,
        base_repo: &Path,
        branch: &str,
        target: &Path,
    ) -> Result<OpResult, GitError> {
        if let Some(existing) = self.existing_worktree_state(base_repo, branch, target)? {
            return Ok(existing);
        }

        self.worktree_prune(base_repo)?;

        let target_str = target.to_string_lossy().into_owned();
        let result = self.run(
            Some(base_repo),
            &["worktree", "add", target_str.as_str(), branch],
        )?;

        if result.0 {
            return Ok(OpResult::Created);
        }

        let stderr_lower = result.2.to_lowercase();
        if stderr_lower.contains("is not a working tree") || stderr_lower.contains("already exists")
        {
            self.worktree_prune(base_repo)?;
            let retry = self.run(
                Some(base_repo),
                &["worktree", "add", target_str.as_str(), branch],
            )?;
            if retry.0 {
                return Ok(OpResult::Created);
            }
            return Err(GitError::StaleWorktree {
                detail: retry.2.trim().to_string(),
            });
        }

        Err(classify_stderr("git worktree add", &result.2))
    }

    fn existing_worktree_state(
        &self,
        base_repo: &Path,
        branch: &str,
        target: &Path,
    ) -> Result<Option<OpResult>, GitError> {
        if !target.exists() {
            return Ok(None);
        }
        let worktrees = self.worktree_list(base_repo)?;
        let is_live = worktrees
            .iter()
            .any(|w| w.path == target && w.branch.as_deref() == Some(branch));
        if is_live {
            return Ok(Some(OpResult::AlreadyExisted));
        }
        let is_empty = std::fs::read_dir(target)
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if is_empty {
            return Ok(None);
        }
        Err(GitError::NotEmpty {
            path: target.to_path_buf(),
        })
    }

    /// List all worktrees registered against `repo`.
    pub fn worktree_list(&self, repo: &Path) -> Result<Vec<WorktreeEntry>, GitError> {
        let stdout = self.run_ok(Some(repo), &["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_porcelain(&stdout))
    }

    /// Purge stale worktree registrations on `repo`.
    pub fn worktree_prune(&self, repo: &Path) -> Result<(), GitError> {
        self.run_ok(Some(repo), &["worktree", "prune"])?;
        Ok(())
    }

    /// Whether `branch` exists on `remote` (used when the Forge Client is
    /// unavailable, spec.md §4.2).
    pub fn branch_exists_on_remote(&self, remote: &Remote, branch: &str) -> Result<bool, GitError> {
        let url = remote.clone_url();
        let heads_ref = format!("refs/heads/{branch}");
        let (ok, stdout, _) = self.run(None, &["ls-remote", "--heads", url.as_str(), &heads_ref])?;
        Ok(ok && !stdout.trim().is_empty())
    }

    /// The remote named `origin` on `repo`, parsed back into a [`Remote`].
    pub fn remote_origin_url(&self, repo: &Path) -> Result<Option<Remote>, GitError> {
        let (ok, stdout, _) = self.run(Some(repo), &["remote", "get-url", "origin"])?;
        if !ok {
            return Ok(None);
        }
        let url = stdout.trim();
        if url.is_empty() {
            return Ok(None);
        }
        Ok(Some(Remote::parse(url)))
    }

    /// The default branch for `repo`'s `origin` remote, via `origin/HEAD`.
    pub fn default_branch(&self, repo: &Path) -> Result<String, GitError> {
        let (ok, stdout, _) = self.run(
            Some(repo),
            &["rev-parse", "--abbrev-ref", "origin/HEAD"],
        )?;
        if ok {
            let name = stdout.trim();
            if let Some(branch) = name.strip_prefix("origin/") {
                return Ok(branch.to_string());
            }
        }
        // Fall back to the symbolic ref directly, and finally to "main".
        let (ok, stdout, _) = self.run(
            Some(repo),
            &["symbolic-ref", "--short", "HEAD"],
        )?;
        if ok && !stdout.trim().is_empty() {
            return Ok(stdout.trim().to_string());
        }
        Ok("main".to_string())
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_worktree_porcelain(stdout: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;
    let mut bare = false;

    let flush = |path: &mut Option<PathBuf>, branch: &mut Option<String>, bare: &mut bool, out: &mut Vec<WorktreeEntry>| {
        if let Some(p) = path.take() {
            out.push(WorktreeEntry {
                path: p,
                branch: branch.take(),
                bare: *bare,
            });
        }
        *bare = false;
    };

    for line in stdout.lines() {
        if line.is_empty() {
            flush(&mut path, &mut branch, &mut bare, &mut entries);
            continue;
        }
        if let Some(p) = line.strip_prefix("worktree ") {
            flush(&mut path, &mut branch, &mut bare, &mut entries);
            path = Some(PathBuf::from(p));
        } else if let Some(b) = line.strip_prefix("branch ") {
            branch = Some(b.strip_prefix("refs/heads/").unwrap_or(b).to_string());
        } else if line == "bare" {
            bare = true;
        }
    }
    flush(&mut path, &mut branch, &mut bare, &mut entries);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_worktree_porcelain_with_branches() {
        let stdout = "worktree /p/alpha\nHEAD abcdef\nbranch refs/heads/main\n\nworktree /p/w-dev\nHEAD 123456\nbranch refs/heads/dev\n\n";
        let entries = parse_worktree_porcelain(stdout);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, PathBuf::from("/p/alpha"));
        assert_eq!(entries[0].branch.as_deref(), Some("main"));
        assert_eq!(entries[1].branch.as_deref(), Some("dev"));
    }

    #[test]
    fn parses_bare_worktree() {
        let stdout = "worktree /p/repo.git\nbare\n\n";
        let entries = parse_worktree_porcelain(stdout);
        assert!(entries[0].bare);
    }

    #[test]
    fn detached_head_has_no_branch() {
        let stdout = "worktree /p/detached\nHEAD abcdef\ndetached\n\n";
        let entries = parse_worktree_porcelain(stdout);
        assert_eq!(entries[0].branch, None);
    }
}

//! Reconciler — executes a [`Plan`] against the forge and the local
//! filesystem, one action at a time, in order (spec.md §4.5).

use std::fmt;

use crate::forge::{Client as ForgeClient, Existence, ForgeError, OwnerKind};
use crate::git::{Driver, GitError, OpResult};
use crate::plan::{Plan, ResolvedAction};
use crate::planlist::Visibility;

/// What happened when reconciling a single action.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Cloned,
    AlreadyCloned,
    WorktreeCreated,
    WorktreeAlreadyExisted,
    Skipped { reason: String },
    Failed { message: String },
}

impl ActionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Cloned => write!(f, "cloned"),
            ActionOutcome::AlreadyCloned => write!(f, "already present"),
            ActionOutcome::WorktreeCreated => write!(f, "worktree created"),
            ActionOutcome::WorktreeAlreadyExisted => write!(f, "worktree already present"),
            ActionOutcome::Skipped { reason } => write!(f, "skipped ({reason})"),
            ActionOutcome::Failed { message } => write!(f, "failed: {message}"),
        }
    }
}

/// One reconciled action, carrying its resolved target for reporting.
#[derive(Debug, Clone)]
pub struct ReconcileEntry {
    pub action: ResolvedAction,
    pub outcome: ActionOutcome,
}

/// Tally of a full reconciliation run (spec.md §4.5, summary reporting).
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    pub entries: Vec<ReconcileEntry>,
}

impl ReconcileSummary {
    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failure()).count()
    }

    pub fn had_failures(&self) -> bool {
        self.failures() > 0
    }
}

pub struct Reconciler {
    git: Driver,
    forge: ForgeClient,
    auto_init: bool,
}

impl Reconciler {
    pub fn new(forge: ForgeClient) -> Self {
        Self {
            git: Driver::new(),
            forge,
            auto_init: true,
        }
    }

    /// Reconcile every action in `plan`, in order. A failed action does not
    /// abort the run: later, independent actions still execute (spec.md
    /// §4.5, "a failure in one line must not abort the run").
    pub fn run(&self, plan: &Plan) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        for action in &plan.actions {
            let outcome = self.reconcile_action(action);
            if outcome.is_failure() {
                log::warn!("{action:?}: {outcome}");
            } else {
                log::info!("{action:?}: {outcome}");
            }
            summary.entries.push(ReconcileEntry {
                action: action.clone(),
                outcome,
            });
        }
        summary
    }

    fn reconcile_action(&self, action: &ResolvedAction) -> ActionOutcome {
        match action {
            ResolvedAction::Skip { reason } => ActionOutcome::Skipped {
                reason: reason.clone(),
            },
            ResolvedAction::FullClone {
                remote,
                target,
                fetch_all_refs,
                visibility,
            } => {
                if let Some((owner, repo)) = remote.forge_owner_repo() {
                    self.ensure_repo_exists(owner, repo, *visibility);
                }
                match self.git.clone_full(remote, target, *fetch_all_refs) {
                    Ok(OpResult::Created) => ActionOutcome::Cloned,
                    Ok(OpResult::AlreadyExisted) => ActionOutcome::AlreadyCloned,
                    Err(e) => ActionOutcome::Failed {
                        message: e.to_string(),
                    },
                }
            }
            ResolvedAction::SingleBranchClone {
                remote,
                ref_,
                target,
                fetch_all_refs,
                visibility,
            } => {
                if let Some((owner, repo)) = remote.forge_owner_repo() {
                    self.ensure_repo_exists(owner, repo, *visibility);
                    self.ensure_branch_exists(owner, repo, ref_);
                }
                match self.git.clone_single_branch(remote, ref_, target, *fetch_all_refs) {
                    Ok(OpResult::Created) => ActionOutcome::Cloned,
                    Ok(OpResult::AlreadyExisted) => ActionOutcome::AlreadyCloned,
                    Err(e) => ActionOutcome::Failed {
                        message: e.to_string(),
                    },
                }
            }
            ResolvedAction::WorktreeAdd {
                base_repo,
                branch,
                target,
            } => {
                if let Err(message) = self.ensure_branch_exists_for_worktree(base_repo, branch) {
                    return ActionOutcome::Failed { message };
                }
                match self.git.worktree_add(base_repo, branch, target) {
                    Ok(OpResult::Created) => ActionOutcome::WorktreeCreated,
                    Ok(OpResult::AlreadyExisted) => ActionOutcome::WorktreeAlreadyExisted,
                    Err(e) => ActionOutcome::Failed {
                        message: e.to_string(),
                    },
                }
            }
        }
    }

    /// Create `owner/repo` on the forge if it doesn't already exist. Errors
    /// here are swallowed (logged only): a repo-creation failure must not
    /// prevent a subsequent local clone attempt (spec.md §9(b)) — if the
    /// repo genuinely doesn't exist, the clone itself will fail and surface
    /// the real error.
    fn ensure_repo_exists(&self, owner: &str, repo: &str, visibility: Visibility) {
        match self.forge.repo_exists(owner, repo) {
            Ok(Existence::Exists) => {}
            Ok(Existence::NotFound) => {
                let owner_kind = self.forge.classify_owner(owner).unwrap_or(OwnerKind::Unknown);
                if let Err(e) = self
                    .forge
                    .create_repo(owner, repo, visibility, self.auto_init, owner_kind)
                {
                    log::warn!("could not create {owner}/{repo} on the forge: {e}");
                }
            }
            Err(ForgeError::NetworkError) => {
                log::debug!("forge unavailable; skipping repo-existence check for {owner}/{repo}");
            }
            Err(e) => log::warn!("forge error checking {owner}/{repo}: {e}"),
        }
    }

    /// Create `branch` on the forge if it doesn't already exist there.
    fn ensure_branch_exists(&self, owner: &str, repo: &str, branch: &str) {
        match self.forge.branch_exists(owner, repo, branch) {
            Ok(Existence::Exists) => {}
            Ok(Existence::NotFound) => {
                if let Err(e) = self.forge.create_branch(owner, repo, branch) {
                    log::warn!("could not create branch '{branch}' on {owner}/{repo}: {e}");
                }
            }
            Err(ForgeError::NetworkError) => {}
            Err(e) => log::warn!("forge error checking branch '{branch}' on {owner}/{repo}: {e}"),
        }
    }

    /// Resolve whether `branch` can be checked out as a worktree of
    /// `base_repo`. When the Forge Client is in read-only-local mode, falls
    /// back to `git ls-remote` against the repo's own `origin` (spec.md
    /// §4.2, "branch_exists_on_remote").
    fn ensure_branch_exists_for_worktree(&self, base_repo: &std::path::Path, branch: &str) -> Result<(), String> {
        let remote = match self.git.remote_origin_url(base_repo) {
            Ok(Some(r)) => r,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e.to_string()),
        };

        if let Some((owner, repo)) = remote.forge_owner_repo() {
            match self.forge.branch_exists(owner, repo, branch) {
                Ok(Existence::Exists) => return Ok(()),
                Ok(Existence::NotFound) => {
                    if let Err(e) = self.forge.create_branch(owner, repo, branch) {
                        log::warn!("could not create branch '{branch}' on {owner}/{repo}: {e}");
                    }
                    return Ok(());
                }
                Err(ForgeError::NetworkError) => {}
                Err(e) => log::warn!("forge error checking branch '{branch}' on {owner}/{repo}: {e}"),
            }
        }

        match self.git.branch_exists_on_remote(&remote, branch) {
            Ok(true) | Ok(false) => Ok(()),
            Err(GitError::RemoteUnreachable { detail }) => Err(detail),
            Err(e) => Err(e.to_string()),
        }
    }
}

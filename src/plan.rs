//! Planner — walks parsed entries in order, tracks the fallback repository,
//! counts multi-reference remotes, and resolves each entry into a concrete
//! filesystem action (spec.md §4.4).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::planlist::{CloneEntry, EntryLine, GlobalFlags, ParsedList, Visibility, WorktreeEntry};
use crate::remote::{Remote, sanitize};

/// The working directory and its parent, against which all targets resolve
/// (spec.md §3, "Workspace context").
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub working_dir: PathBuf,
    pub parent_dir: PathBuf,
}

impl WorkspaceContext {
    pub fn new(working_dir: PathBuf) -> Self {
        let parent_dir = working_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| working_dir.clone());
        Self {
            working_dir,
            parent_dir,
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.parent_dir.join(name)
    }
}

/// The implicit base repository used by bare `@branch` lines (spec.md §3).
#[derive(Debug, Clone)]
pub enum FallbackRepo {
    Unset,
    Set { remote: Remote, path: PathBuf },
}

/// One resolved action in a [`Plan`] (spec.md §3, `ResolvedAction`).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAction {
    FullClone {
        remote: Remote,
        target: PathBuf,
        fetch_all_refs: bool,
        visibility: Visibility,
    },
    SingleBranchClone {
        remote: Remote,
        ref_: String,
        target: PathBuf,
        fetch_all_refs: bool,
        visibility: Visibility,
    },
    WorktreeAdd {
        base_repo: PathBuf,
        branch: String,
        target: PathBuf,
    },
    Skip {
        reason: String,
    },
}

impl ResolvedAction {
    pub fn target(&self) -> Option<&Path> {
        match self {
            ResolvedAction::FullClone { target, .. }
            | ResolvedAction::SingleBranchClone { target, .. }
            | ResolvedAction::WorktreeAdd { target, .. } => Some(target),
            ResolvedAction::Skip { .. } => None,
        }
    }

    /// Whether reconciling this action requires a ref (branch) to exist:
    /// `SingleBranchClone` and `WorktreeAdd` both name one.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            ResolvedAction::SingleBranchClone { ref_, .. } => Some(ref_),
            ResolvedAction::WorktreeAdd { branch, .. } => Some(branch),
            _ => None,
        }
    }
}

/// A non-fatal note recorded while resolving a line — used for the
/// `--worktree` fallback path (spec.md §4.4, last bullet).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub line_no: usize,
    pub message: String,
}

/// The ordered, resolved plan (spec.md §3, `Plan`).
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub actions: Vec<ResolvedAction>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A plan-stage error: detected while resolving entries, before any
/// filesystem mutation (spec.md §7, "Plan errors").
#[derive(Debug, Clone)]
pub struct PlanError {
    pub line_no: usize,
    pub raw: String,
    pub message: String,
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {}\n    {}",
            self.line_no, self.message, self.raw
        )
    }
}

impl std::error::Error for PlanError {}

/// Visibility resolved for a repo-creation call: per-line flag overrides the
/// global default, which overrides the per-invocation CLI default, which
/// defaults to private (spec.md §4.5).
pub fn effective_visibility(
    per_line: Visibility,
    global_default: Visibility,
    invocation_default: Visibility,
) -> Visibility {
    match per_line {
        Visibility::Unset => match global_default {
            Visibility::Unset => match invocation_default {
                Visibility::Unset => Visibility::Private,
                v => v,
            },
            v => v,
        },
        v => v,
    }
}

/// Planner options supplied once per invocation (CLI defaults), distinct
/// from the plan file's own [`GlobalFlags`].
#[derive(Debug, Clone, Default)]
pub struct PlannerOptions {
    pub invocation_default_visibility: Visibility,
}

pub struct Planner<'a> {
    ws: &'a WorkspaceContext,
    flags: &'a GlobalFlags,
    opts: &'a PlannerOptions,
    /// Seed state for the fallback repo, e.g. derived from the current
    /// working directory's origin (spec.md §4.4, "Initialization").
    initial_fallback: FallbackRepo,
}

impl<'a> Planner<'a> {
    pub fn new(
        ws: &'a WorkspaceContext,
        flags: &'a GlobalFlags,
        opts: &'a PlannerOptions,
        initial_fallback: FallbackRepo,
    ) -> Self {
        Self {
            ws,
            flags,
            opts,
            initial_fallback,
        }
    }

    pub fn plan(&self, parsed: &ParsedList) -> Result<Plan, PlanError> {
        let counts = self.count_references(parsed);

        let mut fallback = self.initial_fallback.clone();
        let mut actions = Vec::new();
        let mut diagnostics = Vec::new();
        let mut seen_targets: HashMap<PathBuf, usize> = HashMap::new();

        for entry in &parsed.entries {
            let (action, new_fallback, diag) = match entry {
                EntryLine::Clone(c) => self.resolve_clone(c, &fallback, &counts)?,
                EntryLine::Worktree(w) => self.resolve_worktree(w, &fallback)?,
            };

            if let Some(target) = action.target() {
                let line_no = entry.raw_line().line_no;
                if let Some(prev_line) = seen_targets.insert(target.clone(), line_no) {
                    return Err(PlanError {
                        line_no,
                        raw: entry.raw_line().text.clone(),
                        message: format!(
                            "target '{}' is also used by line {prev_line}",
                            target.display()
                        ),
                    });
                }
            }

            if let Some(d) = diag {
                diagnostics.push(d);
            }
            if let Some(nf) = new_fallback {
                fallback = nf;
            }
            actions.push(action);
        }

        Ok(Plan {
            actions,
            diagnostics,
        })
    }

    /// Pass 1: count Clone-variant entries per canonical remote (spec.md
    /// §4.4). Bare `@branch` lines are not counted.
    fn count_references(&self, parsed: &ParsedList) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for entry in &parsed.entries {
            if let EntryLine::Clone(c) = entry {
                *counts.entry(c.remote.canonical_key()).or_insert(0) += 1;
            }
        }
        counts
    }

    fn resolve_clone(
        &self,
        c: &CloneEntry,
        fallback: &FallbackRepo,
        counts: &HashMap<String, usize>,
    ) -> Result<(ResolvedAction, Option<FallbackRepo>, Option<Diagnostic>), PlanError> {
        let visibility = effective_visibility(
            c.visibility,
            self.flags.default_visibility,
            self.opts.invocation_default_visibility,
        );

        match &c.ref_ {
            None => {
                let target = self.ws.resolve(
                    c.target.as_deref().unwrap_or(&c.remote.base_name()),
                );
                let action = ResolvedAction::FullClone {
                    remote: c.remote.clone(),
                    target: target.clone(),
                    fetch_all_refs: c.fetch_all_refs,
                    visibility,
                };
                let new_fallback = FallbackRepo::Set {
                    remote: c.remote.clone(),
                    path: target,
                };
                Ok((action, Some(new_fallback), None))
            }
            Some(ref_) => {
                // Per-line `--worktree` converts this entry to a WorktreeAdd
                // against the current FallbackRepo, but only when that
                // fallback is the *same* remote this line names — see
                // SPEC_FULL.md §4.4 for why this repo is the resolution
                // chosen for the ambiguous "--worktree as conversion
                // trigger" behavior (spec.md §9(a)). The separate
                // `force-worktree` *global* flag never triggers this
                // conversion; it only affects target-suffixing below.
                if c.worktree_preferred {
                    if let FallbackRepo::Set {
                        remote: fb_remote,
                        path: fb_path,
                    } = fallback
                        && fb_remote.canonical_key() == c.remote.canonical_key()
                    {
                        let target = self.ws.resolve(
                            c.target
                                .clone()
                                .unwrap_or_else(|| format!("{}-{}", fb_path_name(fb_path), sanitize(ref_)))
                                .as_str(),
                        );
                        let action = ResolvedAction::WorktreeAdd {
                            base_repo: fb_path.clone(),
                            branch: ref_.clone(),
                            target,
                        };
                        return Ok((action, None, None));
                    }
                    let diag = Diagnostic {
                        line_no: c.line.line_no,
                        message: format!(
                            "--worktree requested for '{}' but no matching base clone is in scope yet; falling back to a single-branch clone",
                            c.remote
                        ),
                    };
                    let (action, new_fallback) =
                        self.single_branch_action(c, ref_, counts, visibility);
                    return Ok((action, Some(new_fallback), Some(diag)));
                }

                let (action, new_fallback) = self.single_branch_action(c, ref_, counts, visibility);
                Ok((action, Some(new_fallback), None))
            }
        }
    }

    fn single_branch_action(
        &self,
        c: &CloneEntry,
        ref_: &str,
        counts: &HashMap<String, usize>,
        visibility: Visibility,
    ) -> (ResolvedAction, FallbackRepo) {
        let target = match &c.target {
            Some(explicit) => self.ws.resolve(explicit),
            None => {
                let count = counts.get(&c.remote.canonical_key()).copied().unwrap_or(0);
                // Suffix when this remote is referenced by 2+ Clone entries
                // (spec.md §8 property 3) or when the plan-wide
                // `force-worktree` flag is in effect (spec.md §4.4).
                let name = if count >= 2 || self.flags.force_worktree {
                    format!("{}-{}", c.remote.base_name(), sanitize(ref_))
                } else {
                    c.remote.base_name()
                };
                self.ws.resolve(&name)
            }
        };
        let action = ResolvedAction::SingleBranchClone {
            remote: c.remote.clone(),
            ref_: ref_.to_string(),
            target: target.clone(),
            fetch_all_refs: c.fetch_all_refs,
            visibility,
        };
        let new_fallback = FallbackRepo::Set {
            remote: c.remote.clone(),
            path: target,
        };
        (action, new_fallback)
    }

    fn resolve_worktree(
        &self,
        w: &WorktreeEntry,
        fallback: &FallbackRepo,
    ) -> Result<(ResolvedAction, Option<FallbackRepo>, Option<Diagnostic>), PlanError> {
        let FallbackRepo::Set { remote, path } = fallback else {
            return Err(PlanError {
                line_no: w.line.line_no,
                raw: w.line.text.clone(),
                message: "bare '@branch' line has no fallback repository in scope".to_string(),
            });
        };

        if w.no_worktree_override {
            let target = self.ws.resolve(
                w.target
                    .as_deref()
                    .unwrap_or(&format!("{}-{}", fb_path_name(path), sanitize(&w.branch))),
            );
            let action = ResolvedAction::SingleBranchClone {
                remote: remote.clone(),
                ref_: w.branch.clone(),
                target,
                fetch_all_refs: false,
                visibility: Visibility::Unset,
            };
            // FallbackRepo is not updated for bare '@branch' lines.
            return Ok((action, None, None));
        }

        let target = self.ws.resolve(
            w.target
                .clone()
                .unwrap_or_else(|| format!("{}-{}", fb_path_name(path), sanitize(&w.branch)))
                .as_str(),
        );
        let action = ResolvedAction::WorktreeAdd {
            base_repo: path.clone(),
            branch: w.branch.clone(),
            target,
        };
        Ok((action, None, None))
    }
}

fn fb_path_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "w".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planlist::parse;

    fn ws(dir: &str) -> WorkspaceContext {
        WorkspaceContext::new(PathBuf::from(dir))
    }

    fn plan_for(input: &str, working_dir: &str) -> Plan {
        let parsed = parse(input).unwrap();
        let ws = ws(working_dir);
        let opts = PlannerOptions::default();
        let planner = Planner::new(&ws, &parsed.flags, &opts, FallbackRepo::Unset);
        planner.plan(&parsed).unwrap()
    }

    // Scenario A — Clone + worktree.
    #[test]
    fn scenario_a_clone_and_worktree() {
        let plan = plan_for("acme/alpha\n@dev\n", "/p/w");
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(
            plan.actions[0].target().unwrap(),
            Path::new("/p/alpha")
        );
        match &plan.actions[1] {
            ResolvedAction::WorktreeAdd {
                base_repo,
                branch,
                target,
            } => {
                assert_eq!(base_repo, Path::new("/p/alpha"));
                assert_eq!(branch, "dev");
                assert_eq!(target, Path::new("/p/w-dev"));
            }
            other => panic!("expected WorktreeAdd, got {other:?}"),
        }
    }

    // Scenario B — Multi-reference suffixing.
    #[test]
    fn scenario_b_multi_reference_suffixing() {
        let plan = plan_for("acme/beta@main\nacme/beta@experimental\n", "/p/w");
        assert_eq!(plan.actions[0].target().unwrap(), Path::new("/p/beta-main"));
        assert_eq!(
            plan.actions[1].target().unwrap(),
            Path::new("/p/beta-experimental")
        );
    }

    // Scenario C — Single-reference no suffix.
    #[test]
    fn scenario_c_single_reference_no_suffix() {
        let plan = plan_for("acme/gamma@release\n", "/p/w");
        assert_eq!(plan.actions[0].target().unwrap(), Path::new("/p/gamma"));
    }

    // Scenario D — Fallback with custom target.
    #[test]
    fn scenario_d_fallback_with_custom_target() {
        let tmp = tempfile::tempdir().unwrap();
        let slides = tmp.path().join("slides");
        std::fs::create_dir(&slides).unwrap();
        let ws = WorkspaceContext::new(tmp.path().join("w"));
        let parsed = parse("acme/delta@slides slides\n@data data\n").unwrap();
        let opts = PlannerOptions::default();
        let planner = Planner::new(&ws, &parsed.flags, &opts, FallbackRepo::Unset);
        let plan = planner.plan(&parsed).unwrap();
        assert_eq!(plan.actions[0].target().unwrap(), tmp.path().join("slides"));
        match &plan.actions[1] {
            ResolvedAction::WorktreeAdd {
                base_repo, target, ..
            } => {
                assert_eq!(base_repo, &tmp.path().join("slides"));
                assert_eq!(target, &tmp.path().join("data"));
            }
            other => panic!("expected WorktreeAdd, got {other:?}"),
        }
        assert!(
            plan.actions
                .iter()
                .all(|a| a.target() != Some(tmp.path().join("delta").as_path()))
        );
    }

    // Scenario E — Slashed branch.
    #[test]
    fn scenario_e_slashed_branch() {
        let plan = plan_for("acme/epsilon\n@feature/x\n", "/p/w");
        match &plan.actions[1] {
            ResolvedAction::WorktreeAdd { branch, target, .. } => {
                assert_eq!(branch, "feature/x");
                assert_eq!(target, Path::new("/p/w-feature-x"));
            }
            other => panic!("expected WorktreeAdd, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_targets_are_plan_errors() {
        let parsed = parse("acme/alpha a\nacme/beta a\n").unwrap();
        let ws = ws("/w");
        let opts = PlannerOptions::default();
        let planner = Planner::new(&ws, &parsed.flags, &opts, FallbackRepo::Unset);
        assert!(planner.plan(&parsed).is_err());
    }

    #[test]
    fn bare_at_without_fallback_is_plan_error() {
        let parsed = parse("@dev\n").unwrap();
        let ws = ws("/w");
        let opts = PlannerOptions::default();
        let planner = Planner::new(&ws, &parsed.flags, &opts, FallbackRepo::Unset);
        assert!(planner.plan(&parsed).is_err());
    }

    #[test]
    fn effective_visibility_precedence() {
        assert_eq!(
            effective_visibility(Visibility::Public, Visibility::Private, Visibility::Private),
            Visibility::Public
        );
        assert_eq!(
            effective_visibility(Visibility::Unset, Visibility::Public, Visibility::Private),
            Visibility::Public
        );
        assert_eq!(
            effective_visibility(Visibility::Unset, Visibility::Unset, Visibility::Public),
            Visibility::Public
        );
        assert_eq!(
            effective_visibility(Visibility::Unset, Visibility::Unset, Visibility::Unset),
            Visibility::Private
        );
    }

    #[test]
    fn fetch_all_refs_flag_propagates_to_single_branch_clone() {
        let plan = plan_for("acme/gamma@release -a\n", "/p/w");
        match &plan.actions[0] {
            ResolvedAction::SingleBranchClone { fetch_all_refs, .. } => assert!(fetch_all_refs),
            other => panic!("expected SingleBranchClone, got {other:?}"),
        }
    }

    #[rstest::rstest]
    #[case::single_reference("acme/gamma@release\n", "/p/gamma")]
    #[case::three_references(
        "acme/zeta@a\nacme/zeta@b\nacme/zeta@c\n",
        "/p/zeta-a"
    )]
    fn reference_count_suffix_rule(#[case] input: &str, #[case] first_target: &str) {
        let plan = plan_for(input, "/p/w");
        assert_eq!(plan.actions[0].target().unwrap(), Path::new(first_target));
    }
}

//! Drives List Parser -> Planner -> Reconciler together against real,
//! file-path-only remotes, so no network access is required. Forge-hosted
//! remotes are covered by the Forge Client's own unit tests instead.

use std::process::Command;

use repofleet::forge::Client as ForgeClient;
use repofleet::plan::{FallbackRepo, Planner, PlannerOptions, WorkspaceContext};
use repofleet::planlist;
use repofleet::reconcile::Reconciler;

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = Command::new("git").args(args).current_dir(dir).status().unwrap();
    assert!(status.success());
}

fn init_source_repo(dir: &std::path::Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--initial-branch=main"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "test"]);
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", "initial"]);
    git(dir, &["branch", "dev"]);
}

/// Lays out `<tmp>/upstream/source` (the real repo being cloned from) and
/// `<tmp>/workspace/current` (the invoking working directory, whose parent
/// `<tmp>/workspace` is where clone/worktree targets resolve) so a clone
/// target named after the remote's base name never collides with the
/// upstream repo itself.
struct Layout {
    _tmp: tempfile::TempDir,
    upstream: std::path::PathBuf,
    working_dir: std::path::PathBuf,
    parent_dir: std::path::PathBuf,
}

fn layout() -> Layout {
    let tmp = tempfile::tempdir().unwrap();
    let upstream = tmp.path().join("upstream").join("source");
    init_source_repo(&upstream);
    let parent_dir = tmp.path().join("workspace");
    let working_dir = parent_dir.join("current");
    std::fs::create_dir_all(&working_dir).unwrap();
    Layout {
        _tmp: tmp,
        upstream,
        working_dir,
        parent_dir,
    }
}

#[test]
fn clone_and_worktree_plan_reconciles_cleanly() {
    let l = layout();
    let list = format!("file://{}\n@dev\n", l.upstream.display());
    let parsed = planlist::parse(&list).unwrap();

    let ws = WorkspaceContext::new(l.working_dir.clone());
    let opts = PlannerOptions::default();
    let planner = Planner::new(&ws, &parsed.flags, &opts, FallbackRepo::Unset);
    let plan = planner.plan(&parsed).unwrap();
    assert_eq!(plan.actions.len(), 2);

    let forge = ForgeClient::new();
    let reconciler = Reconciler::new(forge);
    let summary = reconciler.run(&plan);
    assert!(!summary.had_failures(), "{:#?}", summary.entries);

    let expected_clone = l.parent_dir.join("source");
    assert!(expected_clone.join(".git").exists());

    let expected_worktree = l.parent_dir.join("w-dev");
    assert!(expected_worktree.join("README.md").exists());
}

#[test]
fn reconciling_twice_is_idempotent() {
    let l = layout();
    let list = format!("file://{}\n", l.upstream.display());
    let parsed = planlist::parse(&list).unwrap();
    let ws = WorkspaceContext::new(l.working_dir);
    let opts = PlannerOptions::default();
    let planner = Planner::new(&ws, &parsed.flags, &opts, FallbackRepo::Unset);
    let plan = planner.plan(&parsed).unwrap();

    let forge = ForgeClient::new();
    let reconciler = Reconciler::new(forge);
    let first = reconciler.run(&plan);
    assert!(!first.had_failures());

    let forge = ForgeClient::new();
    let reconciler = Reconciler::new(forge);
    let second = reconciler.run(&plan);
    assert!(!second.had_failures());
}

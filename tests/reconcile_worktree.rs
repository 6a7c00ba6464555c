//! Exercises the Git Driver and Reconciler against real on-disk repositories
//! via the system `git` binary — no mocking of subprocess calls.

use std::path::Path;
use std::process::Command;

use repofleet::git::{Driver, OpResult};
use repofleet::remote::Remote;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git must be on PATH for this test");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

fn init_source_repo(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--initial-branch=main"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "test"]);
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", "initial"]);
    git(dir, &["branch", "feature"]);
}

#[test]
fn clone_then_worktree_add_creates_both() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    init_source_repo(&source);

    let driver = Driver::new();
    let remote = Remote::FileUrl { path: source.clone() };
    let clone_target = tmp.path().join("clone");

    let result = driver.clone_full(&remote, &clone_target, false).unwrap();
    assert_eq!(result, OpResult::Created);
    assert!(clone_target.join(".git").exists());

    let worktree_target = tmp.path().join("clone-feature");
    let result = driver
        .worktree_add(&clone_target, "feature", &worktree_target)
        .unwrap();
    assert_eq!(result, OpResult::Created);
    assert!(worktree_target.join("README.md").exists());
}

#[test]
fn worktree_add_is_idempotent_on_rerun() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    init_source_repo(&source);

    let driver = Driver::new();
    let remote = Remote::FileUrl { path: source.clone() };
    let clone_target = tmp.path().join("clone");
    driver.clone_full(&remote, &clone_target, false).unwrap();

    let worktree_target = tmp.path().join("clone-feature");
    let first = driver
        .worktree_add(&clone_target, "feature", &worktree_target)
        .unwrap();
    assert_eq!(first, OpResult::Created);

    let second = driver
        .worktree_add(&clone_target, "feature", &worktree_target)
        .unwrap();
    assert_eq!(second, OpResult::AlreadyExisted);
}

/// Scenario F: the worktree directory is removed out from under git (not via
/// `git worktree remove`), leaving a stale registration. A repeat
/// `worktree_add` call for the same target must prune the stale entry and
/// retry rather than failing outright (spec.md §4.2).
#[test]
fn stale_worktree_registration_is_pruned_and_retried() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    init_source_repo(&source);

    let driver = Driver::new();
    let remote = Remote::FileUrl { path: source.clone() };
    let clone_target = tmp.path().join("clone");
    driver.clone_full(&remote, &clone_target, false).unwrap();

    let worktree_target = tmp.path().join("clone-feature");
    driver
        .worktree_add(&clone_target, "feature", &worktree_target)
        .unwrap();

    // Delete the worktree directory directly, simulating external removal
    // (a crashed process, manual `rm -rf`) without updating git's registry.
    std::fs::remove_dir_all(&worktree_target).unwrap();

    let retried = driver
        .worktree_add(&clone_target, "feature", &worktree_target)
        .unwrap();
    assert_eq!(retried, OpResult::Created);
    assert!(worktree_target.join("README.md").exists());
}

#[test]
fn clone_into_non_empty_directory_fails_without_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    init_source_repo(&source);

    let driver = Driver::new();
    let remote = Remote::FileUrl { path: source.clone() };
    let target = tmp.path().join("occupied");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("existing.txt"), "not a repo\n").unwrap();

    let err = driver.clone_full(&remote, &target, false).unwrap_err();
    assert!(matches!(err, repofleet::git::GitError::NotEmpty { .. }));
    assert!(target.join("existing.txt").exists());
}

#[test]
fn re_cloning_an_existing_checkout_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    init_source_repo(&source);

    let driver = Driver::new();
    let remote = Remote::FileUrl { path: source.clone() };
    let target = tmp.path().join("clone");

    let first = driver.clone_full(&remote, &target, false).unwrap();
    assert_eq!(first, OpResult::Created);

    let second = driver.clone_full(&remote, &target, false).unwrap();
    assert_eq!(second, OpResult::AlreadyExisted);
}

#[test]
fn clone_target_with_different_origin_is_a_conflict() {
    let tmp = tempfile::tempdir().unwrap();
    let source_a = tmp.path().join("source-a");
    let source_b = tmp.path().join("source-b");
    init_source_repo(&source_a);
    init_source_repo(&source_b);

    let driver = Driver::new();
    let target = tmp.path().join("clone");
    driver
        .clone_full(&Remote::FileUrl { path: source_a.clone() }, &target, false)
        .unwrap();

    let err = driver
        .clone_full(&Remote::FileUrl { path: source_b.clone() }, &target, false)
        .unwrap_err();
    assert!(matches!(err, repofleet::git::GitError::OriginMismatch { .. }));
}

#[test]
fn single_branch_clone_with_fetch_all_refs_sees_other_branches() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    init_source_repo(&source);

    let driver = Driver::new();
    let remote = Remote::FileUrl { path: source.clone() };
    let target = tmp.path().join("clone");

    driver
        .clone_single_branch(&remote, "main", &target, true)
        .unwrap();

    let status = Command::new("git")
        .args(["branch", "-r"])
        .current_dir(&target)
        .output()
        .unwrap();
    let remote_branches = String::from_utf8_lossy(&status.stdout);
    assert!(remote_branches.contains("origin/feature"));
}

#[test]
fn single_branch_clone_without_fetch_all_refs_omits_other_branches() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    init_source_repo(&source);

    let driver = Driver::new();
    let remote = Remote::FileUrl { path: source.clone() };
    let target = tmp.path().join("clone");

    driver
        .clone_single_branch(&remote, "main", &target, false)
        .unwrap();

    let status = Command::new("git")
        .args(["branch", "-r"])
        .current_dir(&target)
        .output()
        .unwrap();
    let remote_branches = String::from_utf8_lossy(&status.stdout);
    assert!(!remote_branches.contains("origin/feature"));
}

//! Concise plan format — spec.md §4.6, Pipeline Runner input (b): a plain
//! list of directory names, one per line, optionally followed by a
//! per-entry script-name override. Used by `run` when reconciliation has
//! not been requested for this invocation (no `--ensure-setup`), so the
//! Pipeline Runner doesn't need the full repos-list grammar just to find
//! directories that (presumably) already exist.

use std::path::Path;

use crate::pipeline::PipelineTarget;
use crate::planlist::strip_comment;

/// Parse `text` into [`PipelineTarget`]s, resolving each bare directory name
/// against `parent_dir` — the same directory every Clone/WorktreeAdd target
/// resolves against in the full Plan (spec.md §3, "Workspace context"), so
/// both input forms describe the same on-disk layout.
pub fn parse(text: &str, parent_dir: &Path) -> Vec<PipelineTarget> {
    let mut targets = Vec::new();
    for raw_line in text.lines() {
        let stripped = strip_comment(raw_line);
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };
        let script_override = tokens.next().map(str::to_string);
        targets.push(PipelineTarget {
            dir: parent_dir.join(name),
            script_override,
        });
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn plain_directory_names_resolve_against_parent_dir() {
        let targets = parse("alpha\nbeta\n", Path::new("/p"));
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].dir, PathBuf::from("/p/alpha"));
        assert_eq!(targets[0].script_override, None);
        assert_eq!(targets[1].dir, PathBuf::from("/p/beta"));
    }

    #[test]
    fn per_entry_script_override_is_parsed() {
        let targets = parse("alpha deploy.sh\n", Path::new("/p"));
        assert_eq!(targets[0].script_override.as_deref(), Some("deploy.sh"));
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let targets = parse("\n# a comment\n   \nalpha\n", Path::new("/p"));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].dir, PathBuf::from("/p/alpha"));
    }
}

//! List Parser — turns a plan-file's text into [`RawLine`]s classified by
//! kind, plus the [`GlobalFlags`] recognized at any point in the file
//! (spec.md §4.3).

use std::fmt;

use crate::remote::Remote;

/// Visibility chosen for a repository, either globally or per-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    Private,
    #[default]
    Unset,
}

/// Flags recognized at the top of (or anywhere in) a plan file.
#[derive(Debug, Clone, Default)]
pub struct GlobalFlags {
    pub default_visibility: Visibility,
    pub force_worktree: bool,
    pub enable_codespaces: bool,
}

/// One input line, preserved for error messages (spec.md §3, `RawLine`).
#[derive(Debug, Clone)]
pub struct RawLine {
    pub line_no: usize,
    pub text: String,
}

/// A parsed Clone-variant entry (spec.md §3, `Entry::Clone`).
#[derive(Debug, Clone)]
pub struct CloneEntry {
    pub remote: Remote,
    pub ref_: Option<String>,
    pub target: Option<String>,
    pub fetch_all_refs: bool,
    pub visibility: Visibility,
    pub worktree_preferred: bool,
    pub line: RawLine,
}

/// A parsed bare `@branch` entry (spec.md §3, `Entry::Worktree`).
#[derive(Debug, Clone)]
pub struct WorktreeEntry {
    pub branch: String,
    pub target: Option<String>,
    pub no_worktree_override: bool,
    pub line: RawLine,
}

/// A single parsed entry line.
#[derive(Debug, Clone)]
pub enum EntryLine {
    Clone(CloneEntry),
    Worktree(WorktreeEntry),
}

impl EntryLine {
    pub fn raw_line(&self) -> &RawLine {
        match self {
            EntryLine::Clone(c) => &c.line,
            EntryLine::Worktree(w) => &w.line,
        }
    }
}

/// Output of the List Parser: the ordered entries plus the flags gathered
/// while scanning the file.
#[derive(Debug, Clone, Default)]
pub struct ParsedList {
    pub entries: Vec<EntryLine>,
    pub flags: GlobalFlags,
}

/// A syntax error detected while parsing the plan file. Carries the
/// offending line number and raw text so the caller can print both
/// (spec.md §7, "Plan errors").
#[derive(Debug, Clone)]
pub struct ListParseError {
    pub line_no: usize,
    pub raw: String,
    pub message: String,
}

impl fmt::Display for ListParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {}\n    {}",
            self.line_no, self.message, self.raw
        )
    }
}

impl std::error::Error for ListParseError {}

const GLOBAL_FLAG_TOKENS: &[&str] = &[
    "default-public",
    "default-private",
    "force-worktree",
    "enable-codespaces",
];

/// Parse a plan file's contents into a [`ParsedList`].
pub fn parse(text: &str) -> Result<ParsedList, ListParseError> {
    let mut flags = GlobalFlags::default();
    let mut entries = Vec::new();

    for (idx, raw_text) in text.lines().enumerate() {
        let line_no = idx + 1;
        let stripped = strip_comment(raw_text);
        let trimmed = stripped.trim();

        if trimmed.is_empty() {
            continue; // blank, or comment-only
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();

        if tokens.len() == 1 && GLOBAL_FLAG_TOKENS.contains(&tokens[0]) {
            apply_global_flag(&mut flags, tokens[0]);
            continue;
        }

        let entry = parse_entry_tokens(&tokens, line_no, raw_text)?;
        entries.push(entry);
    }

    Ok(ParsedList { entries, flags })
}

/// '#' only starts a comment when it begins a whitespace-delimited token, so
/// branch names/paths containing '#' are never misparsed. Shared with
/// [`crate::concise`], which uses the same line-comment convention.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut in_token_start = true;
    for (i, c) in line.char_indices() {
        if c == '#' && in_token_start {
            return &line[..i];
        }
        in_token_start = c.is_whitespace();
    }
    line
}

fn apply_global_flag(flags: &mut GlobalFlags, token: &str) {
    match token {
        "default-public" => flags.default_visibility = Visibility::Public,
        "default-private" => flags.default_visibility = Visibility::Private,
        "force-worktree" => flags.force_worktree = true,
        "enable-codespaces" => flags.enable_codespaces = true,
        _ => unreachable!("caller filtered tokens against GLOBAL_FLAG_TOKENS"),
    }
}

fn parse_entry_tokens(
    tokens: &[&str],
    line_no: usize,
    raw_text: &str,
) -> Result<EntryLine, ListParseError> {
    let raw_line = RawLine {
        line_no,
        text: raw_text.to_string(),
    };
    let err = |message: &str| ListParseError {
        line_no,
        raw: raw_text.to_string(),
        message: message.to_string(),
    };

    if tokens.is_empty() {
        return Err(err("empty entry line"));
    }

    if let Some(branch) = tokens[0].strip_prefix('@') {
        if branch.is_empty() {
            return Err(err("bare '@' line is missing a branch name"));
        }
        let (target, no_worktree_override) = parse_worktree_rest(&tokens[1..]);
        return Ok(EntryLine::Worktree(WorktreeEntry {
            branch: branch.to_string(),
            target,
            no_worktree_override,
            line: raw_line,
        }));
    }

    let remote_token = tokens[0];
    let (remote_part, ref_) = split_remote_and_ref(remote_token);
    let remote = Remote::parse(remote_part);

    let mut target = None;
    let mut fetch_all_refs = false;
    let mut visibility = Visibility::Unset;
    let mut worktree_preferred = false;

    for tok in &tokens[1..] {
        match *tok {
            "--public" => visibility = Visibility::Public,
            "--private" => visibility = Visibility::Private,
            "--worktree" => worktree_preferred = true,
            "--no-worktree" => worktree_preferred = false,
            "-a" => fetch_all_refs = true,
            flag if flag.starts_with('-') => {
                // Unknown flags on entry lines are silently ignored
                // (spec.md §4.3): they may matter to downstream emitters.
            }
            value => {
                if target.is_some() {
                    return Err(err(&format!("unexpected extra token '{value}'")));
                }
                target = Some(value.to_string());
            }
        }
    }

    Ok(EntryLine::Clone(CloneEntry {
        remote,
        ref_,
        target,
        fetch_all_refs,
        visibility,
        worktree_preferred,
        line: raw_line,
    }))
}

/// Split a `remote` token from an optional trailing `@ref-suffix`.
///
/// The SSH remote form `git@host:path` (spec.md §3/§4.3) has its own `@`
/// before the ref-suffix's, so naively splitting on the *first* `@` tears
/// the `git@` prefix off the host. For a `git@`-prefixed token, only an `@`
/// appearing after that prefix is a ref separator.
fn split_remote_and_ref(token: &str) -> (&str, Option<String>) {
    if let Some(rest) = token.strip_prefix("git@") {
        return match rest.find('@') {
            Some(idx) => {
                let split_at = "git@".len() + idx;
                let ref_ = &token[split_at + 1..];
                if ref_.is_empty() {
                    (token, None)
                } else {
                    (&token[..split_at], Some(ref_.to_string()))
                }
            }
            None => (token, None),
        };
    }
    match token.split_once('@') {
        Some((r, b)) if !r.is_empty() && !b.is_empty() => (r, Some(b.to_string())),
        _ => (token, None),
    }
}

/// Parse the tokens following a bare `@branch` entry's branch name:
/// an optional target, then any number of flags (only `--no-worktree` is
/// meaningful here; others are ignored per spec.md §4.3).
fn parse_worktree_rest(tokens: &[&str]) -> (Option<String>, bool) {
    let mut target = None;
    let mut no_worktree_override = false;
    for tok in tokens {
        match *tok {
            "--no-worktree" => no_worktree_override = true,
            flag if flag.starts_with('-') => {}
            value => target = Some(value.to_string()),
        }
    }
    (target, no_worktree_override)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let parsed = parse("\n# a comment\n   \n# another\n").unwrap();
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn global_flags_recognized() {
        let parsed = parse("default-public\nforce-worktree\nenable-codespaces\n").unwrap();
        assert_eq!(parsed.flags.default_visibility, Visibility::Public);
        assert!(parsed.flags.force_worktree);
        assert!(parsed.flags.enable_codespaces);
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn global_flag_with_trailing_comment_still_recognized() {
        let parsed = parse("force-worktree # always worktree\n").unwrap();
        assert!(parsed.flags.force_worktree);
    }

    #[test]
    fn full_clone_entry() {
        let parsed = parse("acme/alpha\n").unwrap();
        assert_eq!(parsed.entries.len(), 1);
        match &parsed.entries[0] {
            EntryLine::Clone(c) => {
                assert_eq!(c.remote.canonical_key(), "acme/alpha");
                assert!(c.ref_.is_none());
            }
            _ => panic!("expected Clone entry"),
        }
    }

    #[test]
    fn ssh_remote_without_ref_is_not_split_on_its_own_at() {
        let parsed = parse("git@github.com:acme/alpha\n").unwrap();
        match &parsed.entries[0] {
            EntryLine::Clone(c) => {
                assert!(c.remote.is_forge_hosted());
                assert_eq!(c.remote.canonical_key(), "acme/alpha");
                assert!(c.ref_.is_none());
            }
            _ => panic!("expected Clone entry"),
        }
    }

    #[test]
    fn ssh_remote_with_ref_suffix_splits_on_the_right_at() {
        let parsed = parse("git@github.com:acme/alpha@branch\n").unwrap();
        match &parsed.entries[0] {
            EntryLine::Clone(c) => {
                assert!(c.remote.is_forge_hosted());
                assert_eq!(c.remote.canonical_key(), "acme/alpha");
                assert_eq!(c.ref_.as_deref(), Some("branch"));
            }
            _ => panic!("expected Clone entry"),
        }
    }

    #[test]
    fn single_branch_clone_entry_with_flags() {
        let parsed = parse("acme/beta@main custom-dir --private -a\n").unwrap();
        match &parsed.entries[0] {
            EntryLine::Clone(c) => {
                assert_eq!(c.ref_.as_deref(), Some("main"));
                assert_eq!(c.target.as_deref(), Some("custom-dir"));
                assert_eq!(c.visibility, Visibility::Private);
                assert!(c.fetch_all_refs);
            }
            _ => panic!("expected Clone entry"),
        }
    }

    #[test]
    fn bare_worktree_entry() {
        let parsed = parse("@feature/x some-dir\n").unwrap();
        match &parsed.entries[0] {
            EntryLine::Worktree(w) => {
                assert_eq!(w.branch, "feature/x");
                assert_eq!(w.target.as_deref(), Some("some-dir"));
                assert!(!w.no_worktree_override);
            }
            _ => panic!("expected Worktree entry"),
        }
    }

    #[test]
    fn bare_worktree_no_worktree_flag() {
        let parsed = parse("@topic --no-worktree\n").unwrap();
        match &parsed.entries[0] {
            EntryLine::Worktree(w) => assert!(w.no_worktree_override),
            _ => panic!("expected Worktree entry"),
        }
    }

    #[test]
    fn unknown_flags_on_entry_lines_are_ignored() {
        let parsed = parse("acme/gamma --codespaces\n").unwrap();
        assert_eq!(parsed.entries.len(), 1);
    }

    #[test]
    fn bare_at_with_no_branch_is_error() {
        assert!(parse("@\n").is_err());
    }
}

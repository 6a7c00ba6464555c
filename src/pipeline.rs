//! Pipeline Runner — runs a named script inside each resolved directory and
//! aggregates per-entry results into a summary (spec.md §4.6).

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One directory the Pipeline Runner should visit, plus an optional
/// per-entry script-name override (from the concise plan format, spec.md
/// §4.6 input (b)).
#[derive(Debug, Clone)]
pub struct PipelineTarget {
    pub dir: PathBuf,
    pub script_override: Option<String>,
}

/// What happened for one target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Success,
    Failed { exit_code: i32 },
    NoScript,
    Missing,
    Filtered,
    Planned,
}

impl EntryOutcome {
    fn is_failure(&self) -> bool {
        matches!(self, EntryOutcome::Failed { .. })
    }

    fn is_skip(&self) -> bool {
        matches!(
            self,
            EntryOutcome::NoScript | EntryOutcome::Missing | EntryOutcome::Filtered
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineEntry {
    pub dir: PathBuf,
    pub script: String,
    pub outcome: EntryOutcome,
}

impl fmt::Display for PipelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = self.dir.display();
        match &self.outcome {
            EntryOutcome::Success => write!(f, "\u{2705} {dir}/{} \u{2014} success", self.script),
            EntryOutcome::Failed { exit_code } => {
                write!(f, "\u{274c} {dir}/{} \u{2014} failed (exit code {exit_code})", self.script)
            }
            EntryOutcome::NoScript => write!(f, "\u{23ed} {dir} \u{2014} no {} found", self.script),
            EntryOutcome::Missing => write!(f, "\u{23ed} {dir} \u{2014} directory does not exist"),
            EntryOutcome::Filtered => write!(f, "\u{23ed} {dir} \u{2014} filtered out"),
            EntryOutcome::Planned => write!(f, "+ {dir}/{}", self.script),
        }
    }
}

/// Tally of a Pipeline Runner invocation (spec.md §4.6, "Summary shape").
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub entries: Vec<PipelineEntry>,
}

impl PipelineSummary {
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome == EntryOutcome::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skip()).count()
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Pipeline Summary ===")?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        write!(
            f,
            "Total: {} repositories | {} succeeded | {} failed | {} skipped",
            self.total(),
            self.succeeded(),
            self.failed(),
            self.skipped()
        )
    }
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub default_script: String,
    pub include: Option<HashSet<String>>,
    pub exclude: Option<HashSet<String>>,
    pub continue_on_error: bool,
    pub dry_run: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            default_script: "run.sh".to_string(),
            include: None,
            exclude: None,
            continue_on_error: false,
            dry_run: false,
        }
    }
}

pub struct Runner {
    opts: RunnerOptions,
}

impl Runner {
    pub fn new(opts: RunnerOptions) -> Self {
        Self { opts }
    }

    /// Run every target in order, respecting the continuation policy
    /// (spec.md §4.6): by default the first failure stops the run and its
    /// exit code becomes the Pipeline Runner's exit code; with
    /// `continue_on_error`, every target runs and the exit code is `1` iff
    /// any entry failed.
    pub fn run(&self, targets: &[PipelineTarget]) -> (PipelineSummary, i32) {
        let mut summary = PipelineSummary::default();
        let mut first_failure_code: Option<i32> = None;

        for target in targets {
            let script_name = target
                .script_override
                .clone()
                .unwrap_or_else(|| self.opts.default_script.clone());
            let entry = self.run_one(target, &script_name);
            let stop = entry.outcome.is_failure() && !self.opts.continue_on_error;
            if let EntryOutcome::Failed { exit_code } = entry.outcome
                && first_failure_code.is_none()
            {
                first_failure_code = Some(exit_code);
            }
            summary.entries.push(entry);
            if stop {
                break;
            }
        }

        let exit_code = if self.opts.continue_on_error {
            i32::from(summary.failed() > 0)
        } else {
            first_failure_code.unwrap_or(0)
        };

        (summary, exit_code)
    }

    fn run_one(&self, target: &PipelineTarget, script_name: &str) -> PipelineEntry {
        let base_name = base_name(&target.dir);

        if let Some(include) = &self.opts.include
            && !include.contains(&base_name)
        {
            return self.entry(target, script_name, EntryOutcome::Filtered);
        }
        if let Some(exclude) = &self.opts.exclude
            && exclude.contains(&base_name)
        {
            return self.entry(target, script_name, EntryOutcome::Filtered);
        }
        if !target.dir.is_dir() {
            return self.entry(target, script_name, EntryOutcome::Missing);
        }

        let script_path = target.dir.join(script_name);
        if !script_path.is_file() {
            return self.entry(target, script_name, EntryOutcome::NoScript);
        }

        if self.opts.dry_run {
            return self.entry(target, script_name, EntryOutcome::Planned);
        }

        make_executable(&script_path);

        log::debug!("$ {} (cwd={})", script_path.display(), target.dir.display());
        let mut command = Command::new(&script_path);
        command.current_dir(&target.dir);
        crate::signals::isolate_process_group(&mut command);
        let status = command.spawn().and_then(crate::signals::wait_with_forwarding);

        let outcome = match status {
            Ok(status) if status.success() => EntryOutcome::Success,
            Ok(status) => EntryOutcome::Failed {
                exit_code: status.code().unwrap_or(1),
            },
            Err(e) => {
                log::warn!("failed to spawn {}: {e}", script_path.display());
                EntryOutcome::Failed { exit_code: 1 }
            }
        };
        self.entry(target, script_name, outcome)
    }

    fn entry(&self, target: &PipelineTarget, script_name: &str, outcome: EntryOutcome) -> PipelineEntry {
        PipelineEntry {
            dir: target.dir.clone(),
            script: script_name.to_string(),
            outcome,
        }
    }
}

fn base_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Best-effort `chmod +x`; a failure here does not prevent running the
/// script (spec.md §4.6, "Make the script executable (best-effort)").
#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mut perms = metadata.permissions();
        let mode = perms.mode() | 0o100;
        perms.set_mode(mode);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

//! Command-line surface: `setup` and `run` subcommands (spec.md §6, "CLI
//! surface").

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::styling::cli_styles;

const HELP_TEMPLATE: &str = "\
{name} - {about-with-newline}
Usage: {usage}

{all-args}{after-help}";

/// Build the top-level `Command`, with the shared help template applied to
/// every subcommand so `--help` always contains the literal word `Usage:`.
pub fn build_command() -> clap::Command {
    apply_help_template(Cli::command())
}

fn apply_help_template(mut cmd: clap::Command) -> clap::Command {
    cmd = cmd.help_template(HELP_TEMPLATE);
    for sub in cmd.get_subcommands_mut() {
        let taken = std::mem::take(sub);
        *sub = apply_help_template(taken);
    }
    cmd
}

use clap::CommandFactory;

#[derive(Parser)]
#[command(name = "repofleet")]
#[command(about = "Reconcile a workspace of Git repositories against a declarative list")]
#[command(version)]
#[command(styles = cli_styles())]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase logging verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug-level logging (shorthand for `-vv`)
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    /// Enable debug logging, optionally to a file
    #[arg(long = "debug-file", global = true, value_name = "path", num_args = 0..=1, default_missing_value = "")]
    pub debug_file: Option<String>,

    /// Override the user config file location
    #[arg(long = "config", global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the workspace against the repos list
    Setup(SetupArgs),
    /// Run a named script in every resolved directory
    Run(RunArgs),
}

#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Plan file to read (default `repos.list`, falling back to `repos-to-clone.list`)
    #[arg(short = 'f', long = "file", value_name = "path")]
    pub file: Option<PathBuf>,

    /// Invocation-default visibility for created repos is public
    #[arg(short = 'p', long = "public")]
    pub public: bool,

    /// Enable devcontainer/codespaces permission injection
    #[arg(long = "codespaces")]
    pub codespaces: bool,

    /// One or more devcontainer-style JSON files to inject into (implies --codespaces)
    #[arg(short = 'd', long = "devcontainer", value_name = "path")]
    pub devcontainer: Vec<PathBuf>,

    /// Permissions token passed through to the container-config injector
    #[arg(long = "permissions", value_name = "token")]
    pub permissions: Option<String>,

    /// Tool token passed through to the container-config injector
    #[arg(short = 't', long = "tool", value_name = "token")]
    pub tool: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Plan file to read (default `repos.list`, falling back to `repos-to-clone.list`)
    #[arg(short = 'f', long = "file", value_name = "path")]
    pub file: Option<PathBuf>,

    /// Script name to run in each directory
    #[arg(long = "script", value_name = "name")]
    pub script: Option<String>,

    /// Comma-separated list of directory names to include
    #[arg(short = 'i', long = "include", value_name = "csv")]
    pub include: Option<String>,

    /// Comma-separated list of directory names to exclude
    #[arg(short = 'e', long = "exclude", value_name = "csv")]
    pub exclude: Option<String>,

    /// Run reconciliation before the pipeline
    #[arg(long = "ensure-setup")]
    pub ensure_setup: bool,

    /// Skip dependency-manager invocation inside target repos
    #[arg(long = "skip-deps")]
    pub skip_deps: bool,

    /// Print the planned invocations without running them
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Run every entry even after a failure
    #[arg(long = "continue-on-error")]
    pub continue_on_error: bool,
}

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::FromArgMatches;

use repofleet::cli::{Cli, Commands, RunArgs, SetupArgs};
use repofleet::config::UserConfig;
use repofleet::emit::{devcontainer, workspace_file};
use repofleet::forge::{Client as ForgeClient, ForgeError, TokenValidity};
use repofleet::git::Driver;
use repofleet::pipeline::{PipelineTarget, Runner, RunnerOptions};
use repofleet::plan::{FallbackRepo, Plan, PlannerOptions, Planner, ResolvedAction, WorkspaceContext};
use repofleet::planlist::{self, Visibility};
use repofleet::reconcile::Reconciler;
use repofleet::styling::{eprintln, println};

fn main() {
    let matches = repofleet::cli::build_command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let verbosity = if cli.debug { cli.verbose.max(2) } else { cli.verbose };
    repofleet::styling::set_verbosity(verbosity);
    init_logging(verbosity, cli.debug_file.as_deref());

    let config_path = cli
        .config
        .clone()
        .or_else(repofleet::config::default_config_path)
        .unwrap_or_else(|| PathBuf::from("repofleet.toml"));
    let user_config = match UserConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", repofleet::styling::warning_message(format!("{e}")));
            UserConfig::default()
        }
    };

    let result = match &cli.command {
        Commands::Setup(args) => run_setup(args, &user_config),
        Commands::Run(args) => run_pipeline(args, &user_config),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", repofleet::styling::error_message(format!("{e}")));
            std::process::exit(repofleet::exit_code(&e));
        }
    }
}

fn init_logging(verbose: u8, debug_file: Option<&str>) {
    let default_filter = match verbose {
        0 => "off",
        1 => "info",
        _ => "debug",
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = debug_file
        && !path.is_empty()
        && let Ok(file) = std::fs::File::create(path)
    {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    let _ = builder.try_init();
}

/// Find the plan file, preferring an explicit `-f` argument, then
/// `repos.list`, then `repos-to-clone.list` (spec.md §6).
fn resolve_plan_file(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    for candidate in ["repos.list", "repos-to-clone.list"] {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Ok(path);
        }
    }
    bail!("no plan file found (looked for repos.list, repos-to-clone.list)")
}

fn initial_fallback(working_dir: &Path) -> FallbackRepo {
    let driver = Driver::new();
    match driver.remote_origin_url(working_dir) {
        Ok(Some(remote)) => FallbackRepo::Set {
            remote,
            path: working_dir.to_path_buf(),
        },
        _ => FallbackRepo::Unset,
    }
}

fn build_plan(file: &Path, invocation_default_visibility: Visibility) -> anyhow::Result<(Plan, PathBuf)> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading plan file {}", file.display()))?;
    let parsed = planlist::parse(&text).map_err(|e| anyhow::anyhow!("{e}"))?;

    let working_dir = std::env::current_dir().context("reading current directory")?;
    let ws = WorkspaceContext::new(working_dir.clone());
    let opts = PlannerOptions {
        invocation_default_visibility,
    };
    let fallback = initial_fallback(&working_dir);
    let planner = Planner::new(&ws, &parsed.flags, &opts, fallback);
    let plan = planner.plan(&parsed).map_err(|e| anyhow::anyhow!("{e}"))?;

    for diag in &plan.diagnostics {
        eprintln!(
            "{}",
            repofleet::styling::warning_message(format!("line {}: {}", diag.line_no, diag.message))
        );
    }

    Ok((plan, ws.parent_dir))
}

fn run_setup(args: &SetupArgs, user_config: &UserConfig) -> anyhow::Result<i32> {
    let file = resolve_plan_file(args.file.as_deref())?;
    let invocation_default = if args.public {
        Visibility::Public
    } else {
        user_config.visibility()
    };
    let (plan, parent_dir) = build_plan(&file, invocation_default)?;

    let forge = ForgeClient::with_config(&user_config.forge_host(), user_config.github_token_env.as_deref());
    if forge.is_read_only_local() {
        eprintln!(
            "{}",
            repofleet::styling::warning_message(
                "no forge credential available; running in read-only-local mode"
            )
        );
    } else {
        // spec.md §4.1: validated once, before the first repo-creation
        // attempt in a run; a hard-invalid token fails identically for
        // every action, so abort the whole run instead of repeating the
        // same failure per entry (spec.md §7, "Auth invalid aborts the
        // run").
        match forge.validate_token() {
            Ok(TokenValidity::Invalid { reason }) => {
                bail!("forge credential is invalid: {reason}");
            }
            Ok(TokenValidity::Valid) => {}
            Err(ForgeError::NetworkError) => {
                eprintln!(
                    "{}",
                    repofleet::styling::warning_message(
                        "could not reach the forge to validate the credential; continuing"
                    )
                );
            }
            Err(e) => {
                eprintln!(
                    "{}",
                    repofleet::styling::warning_message(format!(
                        "could not validate forge credential: {e}"
                    ))
                );
            }
        }
    }
    let reconciler = Reconciler::new(forge);
    let summary = reconciler.run(&plan);

    for entry in &summary.entries {
        let line = format!("{:?} \u{2014} {}", entry.action, entry.outcome);
        if entry.outcome.is_failure() {
            eprintln!("{}", repofleet::styling::error_message(line));
        } else {
            eprintln!("{}", repofleet::styling::success_message(line));
        }
    }

    let targets: Vec<PathBuf> = plan
        .actions
        .iter()
        .filter_map(ResolvedAction::target)
        .map(Path::to_path_buf)
        .collect();

    if args.codespaces || !args.devcontainer.is_empty() {
        inject_devcontainers(args, &plan)?;
    }

    write_workspace_file(&parent_dir, &targets)?;

    Ok(i32::from(summary.had_failures()))
}

fn write_workspace_file(parent_dir: &Path, targets: &[PathBuf]) -> anyhow::Result<()> {
    let rendered = workspace_file::render(parent_dir, targets);
    let path = parent_dir.join("entire-project.code-workspace");
    std::fs::write(&path, rendered)
        .with_context(|| format!("writing workspace file {}", path.display()))?;
    Ok(())
}

fn inject_devcontainers(args: &SetupArgs, plan: &Plan) -> anyhow::Result<()> {
    let owner_repos: Vec<String> = plan
        .actions
        .iter()
        .filter_map(|a| match a {
            ResolvedAction::FullClone { remote, .. } | ResolvedAction::SingleBranchClone { remote, .. } => {
                remote.forge_owner_repo().map(|(o, r)| format!("{o}/{r}"))
            }
            _ => None,
        })
        .collect();

    let permissions = serde_json::json!({
        "permissions": args.permissions.clone().unwrap_or_else(|| "write".to_string()),
        "tool": args.tool.clone(),
    });

    for devcontainer_path in &args.devcontainer {
        let text = std::fs::read_to_string(devcontainer_path).unwrap_or_default();
        let mut document = devcontainer::parse(&text).map_err(|e| anyhow::anyhow!("{e}"))?;
        for owner_repo in &owner_repos {
            devcontainer::inject(&mut document, owner_repo, permissions.clone())
                .map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        std::fs::write(devcontainer_path, devcontainer::render(&document))
            .with_context(|| format!("writing {}", devcontainer_path.display()))?;
    }
    Ok(())
}

fn run_pipeline(args: &RunArgs, user_config: &UserConfig) -> anyhow::Result<i32> {
    let file = resolve_plan_file(args.file.as_deref())?;

    // Pipeline Runner accepts either input spec.md §4.6 names: (a) a full
    // Plan's resolved target directories, when `--ensure-setup` reconciles
    // the workspace first, or (b) the concise plan format — a bare
    // directory-name list with an optional per-entry script override —
    // for the common case of running scripts against a workspace that's
    // already materialized.
    let targets: Vec<PipelineTarget> = if args.ensure_setup {
        let (plan, _parent_dir) = build_plan(&file, user_config.visibility())?;
        let forge = ForgeClient::with_config(&user_config.forge_host(), user_config.github_token_env.as_deref());
        let reconciler = Reconciler::new(forge);
        let summary = reconciler.run(&plan);
        if summary.had_failures() {
            eprintln!(
                "{}",
                repofleet::styling::warning_message("setup reconciliation had failures; continuing to run")
            );
        }
        plan.actions
            .iter()
            .filter_map(ResolvedAction::target)
            .map(|target| PipelineTarget {
                dir: target.to_path_buf(),
                script_override: None,
            })
            .collect()
    } else {
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("reading plan file {}", file.display()))?;
        let working_dir = std::env::current_dir().context("reading current directory")?;
        let ws = WorkspaceContext::new(working_dir);
        repofleet::concise::parse(&text, &ws.parent_dir)
    };

    let script = args.script.clone().unwrap_or_else(|| user_config.script());
    let include = args
        .include
        .as_ref()
        .map(|csv| csv.split(',').map(str::trim).map(str::to_string).collect());
    let exclude = args
        .exclude
        .as_ref()
        .map(|csv| csv.split(',').map(str::trim).map(str::to_string).collect());

    let opts = RunnerOptions {
        default_script: script,
        include,
        exclude,
        continue_on_error: args.continue_on_error,
        dry_run: args.dry_run,
    };
    let runner = Runner::new(opts);
    let (summary, code) = runner.run(&targets);

    println!("{summary}");

    Ok(code)
}

//! Goal-driven agent loop.
//!
//! Persists its state in `.agent/agent_memory.json` under the project
//! directory so that re-running `goal-agent run` resumes where it stopped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goal_agent::context::{AgentContext, LoopSettings};
use goal_agent::controller::{LoopStop, run_loop};
use goal_agent::exit_codes;
use goal_agent::io::completion::OpenAiCompletion;
use goal_agent::io::config::{init_config, load_config};
use goal_agent::io::health;
use goal_agent::io::paths::AgentPaths;
use goal_agent::io::state_store::StateStore;
use goal_agent::logging;
use goal_agent::status::status_from_root;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "goal-agent",
    version,
    about = "Goal-driven plan/execute/review agent loop"
)]
struct Cli {
    /// Project directory (contains .agent/).
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default `.agent/config.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(long)]
        force: bool,
    },
    /// Run the agent until the goal is complete or the tick ceiling is hit.
    Run {
        /// Goal for a fresh run. Ignored when resuming saved state.
        #[arg(long, env = "USER_GOAL")]
        goal: Option<String>,
        /// Override the configured tick ceiling for this invocation.
        #[arg(long)]
        max_ticks: Option<u32>,
        /// Do not serve /health and /ready while running.
        #[arg(long)]
        no_health: bool,
    },
    /// Print a JSON summary of the saved state.
    Status,
    /// Delete the saved state so the next run starts fresh.
    Reset,
    /// Serve /health and /ready in the foreground until Ctrl-C.
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("warning: could not load .env: {err}");
    }
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = cli.project_dir.as_path();
    match cli.command {
        Command::Run {
            goal,
            max_ticks,
            no_health,
        } => cmd_run(root, goal.as_deref(), max_ticks, no_health),
        Command::Init { force } => cmd_init(root, force),
        Command::Status => cmd_status(root),
        Command::Reset => cmd_reset(root),
        Command::Serve { bind, port } => cmd_serve(root, bind, port),
    }
}

fn cmd_run(
    root: &Path,
    goal: Option<&str>,
    max_ticks: Option<u32>,
    no_health: bool,
) -> Result<i32> {
    let paths = AgentPaths::new(root);
    let mut cfg = load_config(&paths.config_path)?;
    if let Some(max_ticks) = max_ticks {
        cfg.max_ticks = max_ticks;
        cfg.validate()?;
    }

    if cfg.health.enabled && !no_health {
        let addr = health::socket_addr(&cfg.health.bind, cfg.health.port)?;
        if let Err(err) = health::spawn_background(addr) {
            warn!(error = %format!("{err:#}"), "health endpoints unavailable");
        }
    }

    let completion = OpenAiCompletion::from_env(&cfg.completion)?;
    let ctx = AgentContext::new(completion, LoopSettings::from(&cfg))?;
    let store = StateStore::new(&paths.state_path);
    let goal = cfg.resolve_goal(goal);

    let outcome = run_loop(&ctx, &store, &goal, |state| {
        if let Some(line) = state.log.last() {
            println!("{line}");
        }
    })?;

    match outcome.stop {
        LoopStop::Completed => {
            println!(
                "Finished: {} subtask(s) completed for goal: {}",
                outcome.state.subtask_progress.len(),
                outcome.state.goal
            );
            Ok(exit_codes::OK)
        }
        LoopStop::AlreadyComplete => {
            println!("Agent has already completed its tasks. Nothing more to do.");
            Ok(exit_codes::OK)
        }
        LoopStop::CeilingReached { ticks, max_ticks } => {
            eprintln!(
                "Stopped after {ticks} of {max_ticks} ticks without completing the goal; \
                 progress saved to {}",
                store.path().display()
            );
            Ok(exit_codes::CEILING)
        }
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = AgentPaths::new(root);
    init_config(&paths.config_path, force)?;
    println!("Wrote default config to {}", paths.config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_status(root: &Path) -> Result<i32> {
    let report = status_from_root(root);
    let json = serde_json::to_string_pretty(&report).context("serialize status")?;
    println!("{json}");
    Ok(exit_codes::OK)
}

fn cmd_reset(root: &Path) -> Result<i32> {
    let store = StateStore::new(AgentPaths::new(root).state_path);
    if store.reset()? {
        println!("Removed {}", store.path().display());
    } else {
        println!("No saved state at {}", store.path().display());
    }
    Ok(exit_codes::OK)
}

fn cmd_serve(root: &Path, bind: Option<String>, port: Option<u16>) -> Result<i32> {
    let cfg = load_config(&AgentPaths::new(root).config_path)?;
    let bind = bind.unwrap_or(cfg.health.bind);
    let addr = health::socket_addr(&bind, port.unwrap_or(cfg.health.port))?;
    let runtime = tokio::runtime::Runtime::new().context("build tokio runtime")?;
    runtime.block_on(health::serve(
        addr,
        health::shutdown_on(tokio::signal::ctrl_c()),
    ))?;
    Ok(exit_codes::OK)
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays scripted match situations through the
//! team task planner and prints the task it publishes on every cycle.

mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use team_tasking_core::{AgentTask, Situation, TaskAssignmentConfig};
use team_tasking_system_formation::FormationCatalog;
use team_tasking_system_task_assignment::TaskAssignment;
use team_tasking_world::{self as world, query, World};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(name = "team-tasking", version)]
#[command(about = "Replays scripted match situations through the team task planner")]
struct Cli {
    /// Log filter directive such as `debug` or `team_tasking_system_formation=debug`.
    /// Takes precedence over RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a scenario and print the published task per cycle.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Scenario file describing the observations of every cycle.
    #[arg(long)]
    scenario: PathBuf,

    /// Planner configuration; overrides the one named by the scenario.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Formation file, added to those named by the scenario. Repeatable.
    #[arg(long = "formation", value_name = "FILE")]
    formations: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Run(args) => run(&args),
    }
}

fn init_logging(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log level `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let scenario = Scenario::from_path(&args.scenario)?;
    let config = match args.config.as_deref().or(scenario.config.as_deref()) {
        Some(path) => load_config(path)?,
        None => {
            info!("no planner configuration given; using defaults");
            TaskAssignmentConfig::default()
        }
    };

    let paths: Vec<&PathBuf> = args.formations.iter().chain(&scenario.formations).collect();
    if paths.is_empty() {
        bail!("no formation files given; pass --formation or list them in the scenario");
    }
    let catalog = FormationCatalog::load_files(paths).context("failed to load formations")?;
    if catalog.is_empty() {
        bail!("no formation file follows the formation_<phase>_<N>player[_kickoffus]_<version>.cfg naming");
    }

    info!(
        robot = %scenario.robot,
        cycles = scenario.cycle_count(),
        formations = catalog.len(),
        "replaying scenario"
    );

    let mut world = World::new();
    let mut planner = TaskAssignment::new(catalog);
    let mut task = AgentTask::default();
    let mut events = Vec::new();

    for (cycle, commands) in scenario.command_batches().into_iter().enumerate() {
        events.clear();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }

        let situation = query::situation(&world);
        planner
            .handle(&events, &situation, &config, &mut task)
            .with_context(|| format!("planning failed in cycle {cycle}"))?;
        println!("{}", describe(cycle, &situation, &task));
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<TaskAssignmentConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read planner configuration at {}", path.display()))?;
    TaskAssignmentConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid planner configuration {}", path.display()))
}

fn describe(cycle: usize, situation: &Situation, task: &AgentTask) -> String {
    let target = task.target().translation();
    let cell = task
        .cell_index()
        .map_or_else(|| "-".to_owned(), |index| index.to_string());
    format!(
        "cycle={cycle} t={}ms phase={:?} role={:?} cell={cell} target=({:.0}, {:.0}) ball_free={}",
        situation.now.as_millis(),
        situation.game.phase,
        task.role(),
        target.x,
        target.y,
        task.ball_is_free(),
    )
}

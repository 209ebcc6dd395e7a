use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use team_tasking_core::{
    Command, FallState, GamePhase, GameSnapshot, MotionState, PlayerNumber, Pose2, Role,
    TeammateSnapshot, TeammateStatus, Timestamp, Vec2,
};

/// Scenario format understood by this adapter.
pub(crate) const SUPPORTED_SCENARIO_VERSION: u32 = 1;

const DEFAULT_CYCLE_MS: u64 = 100;

/// Scripted match seen from one agent, expanded into world commands per cycle.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Scenario {
    /// Player number of the simulated agent.
    pub(crate) robot: PlayerNumber,
    /// Configuration file named by the scenario, resolved against its directory.
    pub(crate) config: Option<PathBuf>,
    /// Formation files named by the scenario, resolved against its directory.
    pub(crate) formations: Vec<PathBuf>,
    own_team: u8,
    start_ms: u64,
    cycle_ms: u64,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    version: u32,
    robot: u8,
    own_team: u8,
    #[serde(default)]
    start_ms: u64,
    #[serde(default = "default_cycle_ms")]
    cycle_ms: u64,
    #[serde(default)]
    config: Option<PathBuf>,
    #[serde(default)]
    formations: Vec<PathBuf>,
    #[serde(default, rename = "step")]
    steps: Vec<Step>,
}

const fn default_cycle_ms() -> u64 {
    DEFAULT_CYCLE_MS
}

/// Observations that change at the start of a step; anything omitted keeps
/// its previous value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Step {
    cycles: Option<u32>,
    phase: Option<GamePhase>,
    kickoff_team: Option<u8>,
    penalized: Option<bool>,
    fall_state: Option<FallState>,
    motion: Option<MotionState>,
    pose: Option<PoseSpec>,
    ball: Option<BallSpec>,
    team_ball: Option<BallSpec>,
    teammates: Option<Vec<TeammateSpec>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoseSpec {
    x: f32,
    y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "full_validity")]
    validity: f32,
}

const fn full_validity() -> f32 {
    1.0
}

/// Ball in field coordinates; `seen = false` reports a frame without the ball.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct BallSpec {
    x: f32,
    y: f32,
    #[serde(default = "seen_by_default")]
    seen: bool,
}

const fn seen_by_default() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct TeammateSpec {
    number: u8,
    x: f32,
    y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "playing")]
    status: TeammateStatus,
    #[serde(default)]
    goalkeeper: bool,
    #[serde(default)]
    role: Role,
}

const fn playing() -> TeammateStatus {
    TeammateStatus::Playing
}

impl TeammateSpec {
    fn snapshot(&self) -> TeammateSnapshot {
        TeammateSnapshot {
            number: PlayerNumber::new(self.number),
            pose: Pose2::new(self.x, self.y, self.rotation),
            status: self.status,
            is_goalkeeper: self.goalkeeper,
            role: self.role,
        }
    }
}

impl Scenario {
    /// Reads and validates the scenario stored at `path`.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&contents, &base)
            .with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parses scenario text, resolving relative file references against `base`.
    pub(crate) fn parse(contents: &str, base: &Path) -> Result<Self> {
        let manifest: Manifest =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if manifest.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                manifest.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }
        if manifest.cycle_ms == 0 {
            bail!("cycle_ms must be positive");
        }
        if manifest.steps.is_empty() {
            bail!("scenario contains no steps");
        }
        if let Some(index) = manifest.steps.iter().position(|step| step.cycles == Some(0)) {
            bail!("step {index} lasts zero cycles");
        }

        Ok(Self {
            robot: PlayerNumber::new(manifest.robot),
            config: manifest.config.map(|path| base.join(path)),
            formations: manifest
                .formations
                .into_iter()
                .map(|path| base.join(path))
                .collect(),
            own_team: manifest.own_team,
            start_ms: manifest.start_ms,
            cycle_ms: manifest.cycle_ms,
            steps: manifest.steps,
        })
    }

    /// Total number of cycles the scenario runs for.
    #[must_use]
    pub(crate) fn cycle_count(&self) -> usize {
        self.steps
            .iter()
            .map(|step| step.cycles.unwrap_or(1) as usize)
            .sum()
    }

    /// Expands the scenario into one command batch per cycle.
    #[must_use]
    pub(crate) fn command_batches(&self) -> Vec<Vec<Command>> {
        let mut script = Script::new(self.own_team);
        let mut batches = Vec::with_capacity(self.cycle_count());

        for step in &self.steps {
            for repeat in 0..step.cycles.unwrap_or(1) {
                let cycle = batches.len() as u64;
                let now = Timestamp::from_millis(self.start_ms + cycle * self.cycle_ms);
                let mut commands = Vec::new();
                if cycle == 0 {
                    commands.push(Command::ConfigureRobot { number: self.robot });
                }
                commands.push(Command::Tick { now });
                script.advance(step, repeat == 0, &mut commands);
                batches.push(commands);
            }
        }

        batches
    }
}

/// Running observation state while a scenario is expanded.
struct Script {
    game: GameSnapshot,
    pose: Pose2,
    validity: f32,
    ball: Option<BallSpec>,
    team_ball: Option<BallSpec>,
}

impl Script {
    fn new(own_team: u8) -> Self {
        Self {
            game: GameSnapshot {
                phase: GamePhase::Initial,
                kickoff_team: own_team,
                own_team,
            },
            pose: Pose2::default(),
            validity: 0.0,
            ball: None,
            team_ball: None,
        }
    }

    /// Emits the commands of one cycle. One-off changes are only emitted on
    /// the first cycle of a step; sensor readings repeat on every cycle.
    fn advance(&mut self, step: &Step, first: bool, out: &mut Vec<Command>) {
        if first {
            if let Some(phase) = step.phase {
                self.game.phase = phase;
            }
            if let Some(kickoff_team) = step.kickoff_team {
                self.game.kickoff_team = kickoff_team;
            }
            out.push(Command::UpdateGame { game: self.game });

            if let Some(penalized) = step.penalized {
                out.push(Command::SetPenalized { penalized });
            }
            if let Some(state) = step.fall_state {
                out.push(Command::UpdateFallState { state });
            }
            if let Some(state) = step.motion {
                out.push(Command::UpdateMotion { state });
            }
            if let Some(pose) = step.pose {
                self.pose = Pose2::new(pose.x, pose.y, pose.rotation);
                self.validity = pose.validity;
            }
            if let Some(teammates) = &step.teammates {
                out.push(Command::UpdateTeammates {
                    teammates: teammates.iter().map(TeammateSpec::snapshot).collect(),
                });
            }
            if step.ball.is_some() {
                self.ball = step.ball;
            }
            if step.team_ball.is_some() {
                self.team_ball = step.team_ball;
            }
        }

        out.push(Command::UpdatePose {
            pose: self.pose,
            validity: self.validity,
        });
        if let Some(ball) = self.ball {
            out.push(Command::UpdateBall {
                position: self.pose.field_to_robot(Vec2::new(ball.x, ball.y)),
                seen: ball.seen,
            });
        }
        if let Some(ball) = self.team_ball {
            out.push(Command::UpdateTeamBall {
                position: Vec2::new(ball.x, ball.y),
                valid: ball.seen,
            });
        }
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the team tasking engine.
//!
//! This crate defines the message surface that connects perception adapters,
//! the authoritative per-agent world, and the pure planning systems. Adapters
//! submit [`Command`] values describing fresh observations, the world applies
//! them via its `apply` entry point and broadcasts [`Event`] values, and the
//! planning systems read an immutable [`Situation`] snapshot once per control
//! cycle before publishing a single [`AgentTask`].

use std::fmt;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Player number reserved for the goalkeeper.
pub const GOALKEEPER_NUMBER: PlayerNumber = PlayerNumber::new(1);

/// Label carried by cells that belong to the defensive line.
pub const DEFENDER_LABEL: &str = "DF";

/// Time a team ball estimate stays usable after it was last valid.
pub const BALL_POSSESSION_TIMEOUT_MS: u64 = 3_000;

/// Number identifying an agent within its team.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlayerNumber(u8);

impl PlayerNumber {
    /// Creates a player number from its numeric value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the player number.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PlayerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic frame time measured in milliseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from a millisecond count.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Millisecond count represented by the timestamp.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub const fn millis_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Planar pose: a field position and a heading in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2 {
    translation: Vec2,
    rotation: f32,
}

impl Pose2 {
    /// Creates a pose from coordinates and a heading.
    #[must_use]
    pub const fn new(x: f32, y: f32, rotation: f32) -> Self {
        Self {
            translation: Vec2::new(x, y),
            rotation,
        }
    }

    /// Creates a pose located at `translation` with zero heading.
    #[must_use]
    pub const fn from_translation(translation: Vec2) -> Self {
        Self {
            translation,
            rotation: 0.0,
        }
    }

    /// Position component of the pose.
    #[must_use]
    pub const fn translation(&self) -> Vec2 {
        self.translation
    }

    /// Heading component of the pose in radians.
    #[must_use]
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Expresses a field point in the frame of an agent standing at this pose.
    #[must_use]
    pub fn field_to_robot(&self, point: Vec2) -> Vec2 {
        Vec2::from_angle(-self.rotation).rotate(point - self.translation)
    }

    /// Expresses a point given relative to this pose in field coordinates.
    #[must_use]
    pub fn robot_to_field(&self, local: Vec2) -> Vec2 {
        self.translation + Vec2::from_angle(self.rotation).rotate(local)
    }

    /// Returns the pose with its lateral coordinate negated.
    #[must_use]
    pub fn mirrored_y(self) -> Self {
        Self {
            translation: Vec2::new(self.translation.x, -self.translation.y),
            rotation: self.rotation,
        }
    }
}

/// Phase of the match as announced by the game controller.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Robots wait in place before the half starts.
    #[default]
    Initial,
    /// Robots walk to their kickoff positions.
    Ready,
    /// Robots stand still at their kickoff positions.
    Set,
    /// The ball is in play.
    Playing,
    /// The half is over.
    Finished,
}

impl GamePhase {
    /// Reports whether the planner should produce formations and roles.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Ready | Self::Set | Self::Playing)
    }

    /// Reports whether the phase precedes live play of the ball.
    #[must_use]
    pub const fn is_pre_play(self) -> bool {
        matches!(self, Self::Ready | Self::Set)
    }
}

/// Posture of the local agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallState {
    /// Standing and able to walk.
    #[default]
    Upright,
    /// Lying on the ground or getting up.
    Fallen,
}

/// Locomotion state of the local agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    /// Standing still; starting to walk costs extra time.
    #[default]
    Standing,
    /// Already walking.
    Walking,
}

/// Status broadcast by a teammate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeammateStatus {
    /// Participating in play.
    #[default]
    Playing,
    /// Temporarily down but still on the field.
    Fallen,
    /// Removed from play by the referee.
    Penalized,
}

/// Functional role an agent plays during one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Approaches and handles the ball.
    Leader,
    /// Backs up the leader.
    Supporter,
    /// Defensive context marker consumed by indicator output only.
    Defender,
    /// Reserved for the goalkeeper.
    GoalKeeper,
    /// Holds its assigned cell.
    #[default]
    None,
}

/// Last broadcast state of a single teammate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeammateSnapshot {
    /// Player number of the teammate.
    pub number: PlayerNumber,
    /// Field pose reported by the teammate.
    pub pose: Pose2,
    /// Participation status reported by the teammate.
    pub status: TeammateStatus,
    /// Whether the teammate plays as goalkeeper.
    pub is_goalkeeper: bool,
    /// Role the teammate published in its latest message.
    pub role: Role,
}

impl TeammateSnapshot {
    /// Reports whether the teammate takes part in post assignment.
    #[must_use]
    pub fn is_field_player(&self) -> bool {
        !self.is_goalkeeper && self.status != TeammateStatus::Penalized
    }
}

/// Read-only roster of teammates in deterministic order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TeamView {
    snapshots: Vec<TeammateSnapshot>,
}

impl TeamView {
    /// Creates a roster from the provided snapshots, ordered by player number.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TeammateSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.number);
        Self { snapshots }
    }

    /// Iterator over the teammates in ascending player number order.
    pub fn iter(&self) -> impl Iterator<Item = &TeammateSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a teammate by number; absence is an expected condition.
    #[must_use]
    pub fn find(&self, number: PlayerNumber) -> Option<&TeammateSnapshot> {
        self.snapshots
            .binary_search_by_key(&number, |snapshot| snapshot.number)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of teammates in the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the roster holds no teammates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Ball estimate produced by the local agent, relative to its own pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BallEstimate {
    /// Ball position in the agent's frame.
    pub position: Vec2,
    /// Frame time when the ball was last seen.
    pub last_seen: Timestamp,
}

/// Team-fused ball estimate in field coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamBallEstimate {
    /// Ball position on the field.
    pub position: Vec2,
    /// Whether the estimate is currently valid.
    pub is_valid: bool,
    /// Frame time when the estimate was last valid.
    pub last_valid: Timestamp,
}

/// Game controller state relevant to planning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Current phase of the match.
    pub phase: GamePhase,
    /// Team number holding the kickoff.
    pub kickoff_team: u8,
    /// Team number of the local agent.
    pub own_team: u8,
}

impl GameSnapshot {
    /// Reports whether the local team holds the kickoff.
    #[must_use]
    pub const fn kickoff_us(&self) -> bool {
        self.kickoff_team == self.own_team
    }
}

/// Identity and penalty state of the local agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotInfo {
    /// Player number of the local agent.
    pub number: PlayerNumber,
    /// Whether the local agent is currently penalized.
    pub penalized: bool,
}

impl RobotInfo {
    /// Reports whether the local agent is the goalkeeper.
    #[must_use]
    pub fn is_goalkeeper(&self) -> bool {
        self.number == GOALKEEPER_NUMBER
    }
}

/// Immutable per-cycle snapshot of everything the planner consumes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Situation {
    /// Frame time of the cycle.
    pub now: Timestamp,
    /// Identity of the local agent.
    pub robot: RobotInfo,
    /// Estimated field pose of the local agent.
    pub pose: Pose2,
    /// Confidence in the pose estimate within `0.0..=1.0`.
    pub pose_validity: f32,
    /// Posture of the local agent.
    pub fall_state: FallState,
    /// Locomotion state of the local agent.
    pub motion: MotionState,
    /// Game controller state.
    pub game: GameSnapshot,
    /// Locally observed ball.
    pub ball: BallEstimate,
    /// Team-fused ball.
    pub team_ball: TeamBallEstimate,
    /// Latest teammate broadcasts.
    pub teammates: TeamView,
}

impl Situation {
    /// Reports whether the team currently holds a usable ball estimate.
    #[must_use]
    pub fn has_ball_possession(&self) -> bool {
        self.team_ball.is_valid
            || self.now.millis_since(self.team_ball.last_valid) < BALL_POSSESSION_TIMEOUT_MS
    }

    /// Pose of the given agent: the own estimate for the local agent, the
    /// latest broadcast otherwise, or `None` when the number is not on the roster.
    #[must_use]
    pub fn pose_of(&self, number: PlayerNumber) -> Option<Pose2> {
        if number == self.robot.number {
            return Some(self.pose);
        }
        self.teammates.find(number).map(|teammate| teammate.pose)
    }

    /// Locally observed ball expressed in field coordinates.
    #[must_use]
    pub fn ball_on_field(&self) -> Vec2 {
        self.pose.robot_to_field(self.ball.position)
    }
}

/// Named region of the field that one agent occupies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    region_id: i32,
    occupation: Pose2,
    pointer: Pose2,
    label: String,
    supporter_capacity: u32,
}

impl Cell {
    /// Creates a cell from its parsed description.
    #[must_use]
    pub fn new(
        region_id: i32,
        occupation: Pose2,
        pointer: Pose2,
        label: impl Into<String>,
        supporter_capacity: u32,
    ) -> Self {
        Self {
            region_id,
            occupation,
            pointer,
            label: label.into(),
            supporter_capacity,
        }
    }

    /// Region identifier declared in the formation description.
    #[must_use]
    pub const fn region_id(&self) -> i32 {
        self.region_id
    }

    /// Nominal pose used for distance and role computations.
    #[must_use]
    pub const fn occupation(&self) -> Pose2 {
        self.occupation
    }

    /// Pose an agent assigned to this cell walks to.
    #[must_use]
    pub const fn pointer(&self) -> Pose2 {
        self.pointer
    }

    /// Human readable role-class label, possibly empty.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of supporters the cell admits.
    #[must_use]
    pub const fn supporter_capacity(&self) -> u32 {
        self.supporter_capacity
    }

    /// Reports whether the cell belongs to the defensive line.
    #[must_use]
    pub fn is_defender(&self) -> bool {
        self.label == DEFENDER_LABEL
    }

    /// Negates the lateral component of both poses. Applying it twice is the identity.
    pub fn mirror_y(&mut self) {
        self.occupation = self.occupation.mirrored_y();
        self.pointer = self.pointer.mirrored_y();
    }
}

/// Ordered set of cells sized to the active player count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    cells: Vec<Cell>,
}

impl Formation {
    /// Creates a formation from cells in declaration order.
    #[must_use]
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Cells of the formation indexed `0..len`.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Retrieves the cell at `index`, if any.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Number of cells in the formation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the formation holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Mirrors every cell across the field's longitudinal axis.
    pub fn mirror_y(&mut self) {
        for cell in &mut self.cells {
            cell.mirror_y();
        }
    }
}

/// Decision artifact published once per cycle for the behavior executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentTask {
    formation: Formation,
    role: Role,
    ball_is_free: bool,
    target: Pose2,
    cell_index: Option<usize>,
}

impl AgentTask {
    /// Assembles a task from the decisions of one cycle.
    #[must_use]
    pub fn new(
        formation: Formation,
        role: Role,
        ball_is_free: bool,
        target: Pose2,
        cell_index: Option<usize>,
    ) -> Self {
        Self {
            formation,
            role,
            ball_is_free,
            target,
            cell_index,
        }
    }

    /// Active formation snapshot.
    #[must_use]
    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    /// Role assigned to the local agent.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the ball may be played (no kickoff restriction applies).
    #[must_use]
    pub const fn ball_is_free(&self) -> bool {
        self.ball_is_free
    }

    /// Locomotion target of the local agent.
    #[must_use]
    pub const fn target(&self) -> Pose2 {
        self.target
    }

    /// Index of the cell occupied by the local agent, if one was assigned.
    #[must_use]
    pub const fn cell_index(&self) -> Option<usize> {
        self.cell_index
    }
}

impl Default for AgentTask {
    fn default() -> Self {
        Self {
            formation: Formation::default(),
            role: Role::None,
            ball_is_free: false,
            target: Pose2::new(-1_000.0, 0.0, 0.0),
            cell_index: None,
        }
    }
}

/// Recognized planner options; swapped in between cycles without restart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskAssignmentConfig {
    /// Assign cells by optimal matching instead of the static list.
    pub dynamic_post_assign: bool,
    /// Arbitrate roles by time-to-ball instead of ball-cell membership.
    pub dynamic_role_assign: bool,
    /// Formation version tag used in the selection key.
    pub formation_version: u32,
    /// Static player-to-cell list: entry `i` is the player occupying cell `i`.
    pub players: Vec<PlayerNumber>,
}

impl TaskAssignmentConfig {
    /// Parses a configuration from TOML, filling omitted options with defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::Parse)
    }
}

impl Default for TaskAssignmentConfig {
    fn default() -> Self {
        Self {
            dynamic_post_assign: false,
            dynamic_role_assign: true,
            formation_version: 1,
            players: vec![PlayerNumber::new(0); 4],
        }
    }
}

/// Errors raised while reading planner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text is not valid TOML for the expected schema.
    #[error("could not parse task assignment configuration: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Observations submitted by perception and communication collaborators.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Sets the identity of the local agent.
    ConfigureRobot {
        /// Player number of the local agent.
        number: PlayerNumber,
    },
    /// Advances the frame clock.
    Tick {
        /// Frame time of the new cycle.
        now: Timestamp,
    },
    /// Updates the penalty state of the local agent.
    SetPenalized {
        /// Whether the local agent is penalized.
        penalized: bool,
    },
    /// Updates the game controller state.
    UpdateGame {
        /// Latest game controller state.
        game: GameSnapshot,
    },
    /// Updates the self-localization estimate.
    UpdatePose {
        /// Estimated field pose.
        pose: Pose2,
        /// Confidence in the estimate.
        validity: f32,
    },
    /// Updates the posture of the local agent.
    UpdateFallState {
        /// Latest posture.
        state: FallState,
    },
    /// Updates the locomotion state of the local agent.
    UpdateMotion {
        /// Latest locomotion state.
        state: MotionState,
    },
    /// Updates the local ball estimate.
    UpdateBall {
        /// Ball position relative to the local agent.
        position: Vec2,
        /// Whether the ball was seen in this frame.
        seen: bool,
    },
    /// Updates the team-fused ball estimate.
    UpdateTeamBall {
        /// Ball position on the field.
        position: Vec2,
        /// Whether the estimate is valid in this frame.
        valid: bool,
    },
    /// Replaces the teammate roster with the latest broadcasts.
    UpdateTeammates {
        /// Latest teammate broadcasts.
        teammates: Vec<TeammateSnapshot>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces a transition between game phases.
    GamePhaseChanged {
        /// Phase before the transition.
        from: GamePhase,
        /// Phase after the transition.
        to: GamePhase,
        /// Whether the local team holds the kickoff after the transition.
        kickoff_us: bool,
    },
}

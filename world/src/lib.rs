#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative per-agent situation store for the team tasking engine.
//!
//! Perception, localization and team communication collaborators submit
//! observations as [`Command`] values; the world folds them into its state and
//! reports noteworthy transitions as [`Event`] values. Planning systems never
//! touch the world directly and instead read a [`Situation`] snapshot through
//! the [`query`] module once per cycle.

use team_tasking_core::{
    BallEstimate, Command, Event, FallState, GameSnapshot, MotionState, Pose2, RobotInfo,
    TeamBallEstimate, TeamView, Timestamp,
};

/// Represents everything the local agent currently knows about the match.
#[derive(Debug)]
pub struct World {
    robot: RobotInfo,
    pose: Pose2,
    pose_validity: f32,
    fall_state: FallState,
    motion: MotionState,
    game: GameSnapshot,
    ball: BallEstimate,
    team_ball: TeamBallEstimate,
    teammates: TeamView,
    now: Timestamp,
}

impl World {
    /// Creates an empty world for an unnumbered agent at the field origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            robot: RobotInfo::default(),
            pose: Pose2::default(),
            pose_validity: 0.0,
            fall_state: FallState::Upright,
            motion: MotionState::Standing,
            game: GameSnapshot::default(),
            ball: BallEstimate::default(),
            team_ball: TeamBallEstimate::default(),
            teammates: TeamView::default(),
            now: Timestamp::default(),
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureRobot { number } => {
            world.robot.number = number;
        }
        Command::Tick { now } => {
            world.now = world.now.max(now);
        }
        Command::SetPenalized { penalized } => {
            world.robot.penalized = penalized;
        }
        Command::UpdateGame { game } => {
            let previous = world.game;
            world.game = game;
            if previous.phase != game.phase {
                out_events.push(Event::GamePhaseChanged {
                    from: previous.phase,
                    to: game.phase,
                    kickoff_us: game.kickoff_us(),
                });
            }
        }
        Command::UpdatePose { pose, validity } => {
            world.pose = pose;
            world.pose_validity = validity.clamp(0.0, 1.0);
        }
        Command::UpdateFallState { state } => {
            world.fall_state = state;
        }
        Command::UpdateMotion { state } => {
            world.motion = state;
        }
        Command::UpdateBall { position, seen } => {
            if seen {
                world.ball = BallEstimate {
                    position,
                    last_seen: world.now,
                };
            }
        }
        Command::UpdateTeamBall { position, valid } => {
            world.team_ball.is_valid = valid;
            if valid {
                world.team_ball.position = position;
                world.team_ball.last_valid = world.now;
            }
        }
        Command::UpdateTeammates { teammates } => {
            world.teammates = TeamView::from_snapshots(teammates);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use team_tasking_core::Situation;

    /// Captures the immutable snapshot consumed by one planning cycle.
    #[must_use]
    pub fn situation(world: &World) -> Situation {
        Situation {
            now: world.now,
            robot: world.robot,
            pose: world.pose,
            pose_validity: world.pose_validity,
            fall_state: world.fall_state,
            motion: world.motion,
            game: world.game,
            ball: world.ball,
            team_ball: world.team_ball,
            teammates: world.teammates.clone(),
        }
    }
}

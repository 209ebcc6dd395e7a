use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use team_tasking_core::{
    AgentTask, Command, GamePhase, GameSnapshot, PlayerNumber, Pose2, Role, TaskAssignmentConfig,
    TeammateSnapshot, TeammateStatus, Timestamp, Vec2,
};
use team_tasking_system_formation::{parse_formation, FormationCatalog, FormationKey};
use team_tasking_system_task_assignment::TaskAssignment;
use team_tasking_world::{self as world, query, World};

const OWN_TEAM: u8 = 12;
const CYCLE_MS: u64 = 100;
const POSITION_NOISE: f32 = 20.0;
const HEADING_NOISE: f32 = 0.02;

const PLAYING_FORMATION: &str = "\
0,-3000,0:DF
1,-1500,1200
2,-1500,-1200
3,-200,0,1,-100,0
";

/// Field poses of players 2 to 5, each standing next to one cell.
const TEAM: [(u8, f32, f32); 4] = [
    (2, -2_950.0, 30.0),
    (3, -1_450.0, 1_150.0),
    (4, -1_800.0, -1_250.0),
    (5, -300.0, 50.0),
];

const GOALKEEPER: Pose2 = Pose2::new(-4_300.0, 0.0, 0.0);

#[derive(Clone, Debug, PartialEq)]
struct CycleRecord {
    number: u8,
    role: Role,
    cell: Option<usize>,
    ball_is_free: bool,
    leader: Option<PlayerNumber>,
}

struct Agent {
    number: PlayerNumber,
    world: World,
    planner: TaskAssignment,
    task: AgentTask,
}

fn catalog() -> FormationCatalog {
    let mut catalog = FormationCatalog::new();
    catalog.insert(
        FormationKey::select(GamePhase::Playing, false, 4, 1),
        parse_formation(PLAYING_FORMATION),
    );
    catalog
}

fn config() -> TaskAssignmentConfig {
    TaskAssignmentConfig {
        dynamic_post_assign: true,
        dynamic_role_assign: true,
        formation_version: 1,
        players: Vec::new(),
    }
}

fn noisy(rng: &mut ChaCha8Rng, pose: Pose2) -> Pose2 {
    let translation = pose.translation();
    Pose2::new(
        translation.x + rng.gen_range(-POSITION_NOISE..POSITION_NOISE),
        translation.y + rng.gen_range(-POSITION_NOISE..POSITION_NOISE),
        pose.rotation() + rng.gen_range(-HEADING_NOISE..HEADING_NOISE),
    )
}

fn team_poses() -> Vec<(PlayerNumber, Pose2)> {
    TEAM.iter()
        .map(|&(number, x, y)| (PlayerNumber::new(number), Pose2::new(x, y, 0.0)))
        .collect()
}

/// Drives every agent's world and planner through `ball_path`, one cycle per
/// ball position, and records what each agent published.
fn replay(seed: u64, ball_path: &[Vec2]) -> Vec<Vec<CycleRecord>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let poses = team_poses();
    let config = config();
    let game = GameSnapshot {
        phase: GamePhase::Playing,
        kickoff_team: OWN_TEAM + 1,
        own_team: OWN_TEAM,
    };

    let mut agents: Vec<Agent> = poses
        .iter()
        .map(|&(number, _)| {
            let mut agent = Agent {
                number,
                world: World::new(),
                planner: TaskAssignment::new(catalog()),
                task: AgentTask::default(),
            };
            let mut events = Vec::new();
            world::apply(&mut agent.world, Command::ConfigureRobot { number }, &mut events);
            agent
        })
        .collect();

    let mut cycles = Vec::new();
    for (cycle, ball) in ball_path.iter().enumerate() {
        let now = Timestamp::from_millis(1_000 + cycle as u64 * CYCLE_MS);
        let mut records = Vec::new();

        for agent in &mut agents {
            let own_pose = poses
                .iter()
                .find(|(number, _)| *number == agent.number)
                .map(|(_, pose)| noisy(&mut rng, *pose))
                .expect("agent is on the team");

            let mut teammates = vec![TeammateSnapshot {
                number: PlayerNumber::new(1),
                pose: GOALKEEPER,
                status: TeammateStatus::Playing,
                is_goalkeeper: true,
                role: Role::GoalKeeper,
            }];
            for &(number, pose) in &poses {
                if number != agent.number {
                    teammates.push(TeammateSnapshot {
                        number,
                        pose: noisy(&mut rng, pose),
                        status: TeammateStatus::Playing,
                        is_goalkeeper: false,
                        role: Role::None,
                    });
                }
            }

            let commands = vec![
                Command::Tick { now },
                Command::UpdateGame { game },
                Command::UpdatePose {
                    pose: own_pose,
                    validity: 1.0,
                },
                Command::UpdateTeammates { teammates },
                Command::UpdateBall {
                    position: own_pose.field_to_robot(*ball),
                    seen: true,
                },
                Command::UpdateTeamBall {
                    position: *ball,
                    valid: true,
                },
            ];

            let mut events = Vec::new();
            for command in commands {
                world::apply(&mut agent.world, command, &mut events);
            }

            let situation = query::situation(&agent.world);
            agent
                .planner
                .handle(&events, &situation, &config, &mut agent.task)
                .expect("formation is cataloged");

            records.push(CycleRecord {
                number: agent.number.get(),
                role: agent.task.role(),
                cell: agent.task.cell_index(),
                ball_is_free: agent.task.ball_is_free(),
                leader: agent.planner.leader(),
            });
        }

        cycles.push(records);
    }
    cycles
}

#[test]
fn replay_is_deterministic_for_a_seed() {
    let path = vec![Vec2::new(600.0, 0.0); 40];
    assert_eq!(replay(7, &path), replay(7, &path));
}

#[test]
fn decisions_hold_steady_under_positional_noise() {
    let path = vec![Vec2::new(600.0, 0.0); 120];

    for records in replay(0x5eed, &path) {
        for record in records {
            let (expected_role, expected_cell) = match record.number {
                2 => (Role::None, 0),
                3 => (Role::Supporter, 1),
                4 => (Role::None, 2),
                5 => (Role::Leader, 3),
                other => panic!("unexpected player {other}"),
            };
            assert_eq!(record.role, expected_role, "player {}", record.number);
            assert_eq!(record.cell, Some(expected_cell), "player {}", record.number);
            assert!(record.ball_is_free);
            assert_eq!(record.leader, Some(PlayerNumber::new(5)));
        }
    }
}

#[test]
fn leadership_changes_hands_once_as_the_ball_drifts() {
    let start = Vec2::new(600.0, 0.0);
    let end = Vec2::new(-1_300.0, 900.0);
    let steps = 150;
    let path: Vec<Vec2> = (0..=steps)
        .map(|step| start.lerp(end, step as f32 / steps as f32))
        .collect();

    let cycles = replay(42, &path);

    for agent in 0..TEAM.len() {
        let leaders: Vec<PlayerNumber> = cycles
            .iter()
            .filter_map(|records| records[agent].leader)
            .collect();
        let handovers = leaders.windows(2).filter(|pair| pair[0] != pair[1]).count();

        assert_eq!(leaders.first(), Some(&PlayerNumber::new(5)));
        assert_eq!(leaders.last(), Some(&PlayerNumber::new(3)));
        assert_eq!(handovers, 1, "agent {} saw {handovers} handovers", TEAM[agent].0);
    }
}

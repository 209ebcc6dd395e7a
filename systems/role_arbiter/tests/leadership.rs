use proptest::prelude::*;
use team_tasking_core::{
    GamePhase, GameSnapshot, PlayerNumber, Pose2, RobotInfo, Role, Situation, TeamBallEstimate,
    TeamView, TeammateSnapshot, TeammateStatus, Timestamp, Vec2,
};
use team_tasking_system_role_arbiter::{
    collect_ball_costs, ArbitrationContext, CostEntry, LocalStanding, INCUMBENCY_DISCOUNT,
};

fn perspective(me: usize, poses: &[Pose2], ball: Vec2, ball_valid: bool) -> Situation {
    let teammates = poses
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != me)
        .map(|(index, pose)| TeammateSnapshot {
            number: number_of(index),
            pose: *pose,
            status: TeammateStatus::Playing,
            is_goalkeeper: false,
            role: Role::None,
        })
        .collect();

    Situation {
        now: Timestamp::from_millis(60_000),
        robot: RobotInfo {
            number: number_of(me),
            penalized: false,
        },
        pose: poses[me],
        pose_validity: 1.0,
        game: GameSnapshot {
            phase: GamePhase::Playing,
            kickoff_team: 3,
            own_team: 3,
        },
        team_ball: TeamBallEstimate {
            position: ball,
            is_valid: ball_valid,
            last_valid: if ball_valid {
                Timestamp::from_millis(60_000)
            } else {
                Timestamp::from_millis(1_000)
            },
        },
        teammates: TeamView::from_snapshots(teammates),
        ..Situation::default()
    }
}

fn number_of(index: usize) -> PlayerNumber {
    PlayerNumber::new(index as u8 + 2)
}

fn poses() -> impl Strategy<Value = Vec<Pose2>> {
    prop::collection::vec(
        (-4_000.0_f32..4_000.0, -3_000.0_f32..3_000.0, -3.1_f32..3.1)
            .prop_map(|(x, y, rotation)| Pose2::new(x, y, rotation)),
        1..=5,
    )
}

fn roles(poses: &[Pose2], ball: Vec2, ball_valid: bool) -> (Vec<Role>, Vec<CostEntry>) {
    let mut entries = Vec::new();
    let mut reference = Vec::new();
    let mut roles = Vec::new();

    for me in 0..poses.len() {
        let situation = perspective(me, poses, ball, ball_valid);
        collect_ball_costs(&situation, None, &mut entries);
        if me == 0 {
            reference = entries.clone();
        }
        let mut context = ArbitrationContext::new();
        roles.push(context.arbitrate(&situation, &entries, LocalStanding::default()));
    }

    (roles, reference)
}

proptest! {
    #[test]
    fn exactly_one_agent_leads(
        poses in poses(),
        ball in (-4_500.0_f32..4_500.0, -3_000.0_f32..3_000.0),
    ) {
        let ball = Vec2::new(ball.0, ball.1);
        let (roles, entries) = roles(&poses, ball, true);

        let mut costs: Vec<f32> = entries.iter().map(|entry| entry.cost).collect();
        costs.dedup();
        prop_assume!(costs.len() == entries.len());

        let leaders = roles.iter().filter(|role| **role == Role::Leader).count();
        prop_assert_eq!(leaders, 1);
    }

    #[test]
    fn nobody_leads_without_possession(poses in poses()) {
        let (roles, _) = roles(&poses, Vec2::ZERO, false);
        prop_assert!(roles.iter().all(|role| *role == Role::None));
    }
}

#[test]
fn incumbent_keeps_leading_through_near_ties() {
    // true times to the ball differ by well under the incumbency discount
    let poses = [Pose2::new(-1_000.0, 0.0, 0.0), Pose2::new(-1_100.0, 0.0, 0.0)];
    let ball = Vec2::ZERO;
    let incumbent = number_of(1);

    let mut entries = Vec::new();
    collect_ball_costs(&perspective(0, &poses, ball, true), None, &mut entries);
    let gap = entries[1].cost - entries[0].cost;
    assert_eq!(entries[0].agent, number_of(0));
    assert!(gap > 0.0 && gap < INCUMBENCY_DISCOUNT, "gap {gap}");

    for me in 0..poses.len() {
        let situation = perspective(me, &poses, ball, true);
        collect_ball_costs(&situation, Some(incumbent), &mut entries);
        assert_eq!(entries[0].agent, incumbent);

        let mut context = ArbitrationContext::new();
        let role = context.arbitrate(&situation, &entries, LocalStanding::default());
        assert_eq!(role == Role::Leader, situation.robot.number == incumbent);
        assert_eq!(context.leader(), Some(incumbent));
    }
}

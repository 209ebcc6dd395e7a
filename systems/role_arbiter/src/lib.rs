#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-cycle role arbitration.
//!
//! Every agent ranks the eligible team members by their time to reach the
//! ball, discounting last cycle's leader, and derives its own role from its
//! rank, its cell and the ball position. The only state carried between
//! cycles lives in [`ArbitrationContext`].

use team_tasking_core::{
    FallState, Formation, GamePhase, PlayerNumber, Role, Situation, TeammateStatus, Vec2,
};
use team_tasking_system_hysteresis::{DynamicBorder, HysteresisClassifier};
use team_tasking_system_kinodynamics::ApproachProfile;
use tracing::debug;

/// Discount granted to last cycle's leader while walking to kickoff positions.
pub const INCUMBENCY_DISCOUNT_READY: f32 = 1.0;

/// Discount granted to last cycle's leader in every other phase.
pub const INCUMBENCY_DISCOUNT: f32 = 2.0;

/// Cost assigned to a fallen teammate so it ranks behind every upright agent.
pub const FALLEN_TEAMMATE_COST: f32 = 1_000.0;

/// Team ball `x` below which the ball counts as deep in the own half.
pub const BALL_IN_OWN_HALF: DynamicBorder = DynamicBorder::new(-1_500.0, 300.0);

/// Relative ball distance below which the static rule grants leadership.
pub const DISTANCE_TO_TARGET: DynamicBorder = DynamicBorder::new(750.0, 100.0);

/// Agent paired with its time-to-ball estimate for one cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostEntry {
    /// Ranked agent.
    pub agent: PlayerNumber,
    /// Seconds to reach the ball, after the incumbency discount.
    pub cost: f32,
}

/// Ranks the eligible agents by time to the ball, cheapest first.
///
/// The local agent takes part while upright and not the goalkeeper;
/// teammates take part unless they are goalkeepers or penalized, and fallen
/// teammates are charged [`FALLEN_TEAMMATE_COST`]. During the pre-play
/// phases the field centre stands in for the ball. The sort is stable, so on
/// equal costs the local agent precedes teammates, which keep roster order.
pub fn collect_ball_costs(
    situation: &Situation,
    previous_leader: Option<PlayerNumber>,
    out: &mut Vec<CostEntry>,
) {
    out.clear();

    let phase = situation.game.phase;
    let target = if phase.is_pre_play() {
        Vec2::ZERO
    } else {
        situation.team_ball.position
    };
    let discount = if phase == GamePhase::Ready {
        INCUMBENCY_DISCOUNT_READY
    } else {
        INCUMBENCY_DISCOUNT
    };
    let incumbency = |agent: PlayerNumber| {
        if previous_leader == Some(agent) {
            discount
        } else {
            0.0
        }
    };

    let me = situation.robot;
    if !me.is_goalkeeper() && !me.penalized && situation.fall_state == FallState::Upright {
        let local = situation.pose.field_to_robot(target);
        out.push(CostEntry {
            agent: me.number,
            cost: ApproachProfile::TO_BALL.cost(local, None) - incumbency(me.number),
        });
    }

    for teammate in situation.teammates.iter() {
        if teammate.is_goalkeeper || teammate.number == me.number {
            continue;
        }
        let cost = match teammate.status {
            TeammateStatus::Penalized => continue,
            TeammateStatus::Fallen => FALLEN_TEAMMATE_COST,
            TeammateStatus::Playing => {
                let local = teammate.pose.field_to_robot(target);
                ApproachProfile::TO_BALL.cost(local, None) - incumbency(teammate.number)
            }
        };
        out.push(CostEntry {
            agent: teammate.number,
            cost,
        });
    }

    out.sort_by(|a, b| a.cost.total_cmp(&b.cost));
}

/// Agent that leads this cycle: the cheapest entry.
#[must_use]
pub fn elect_leader(entries: &[CostEntry]) -> Option<PlayerNumber> {
    entries.first().map(|entry| entry.agent)
}

/// Facts about the local agent's cell that shape its secondary role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocalStanding {
    /// The agent occupies a defender-tagged cell during live play.
    pub is_defender: bool,
    /// The leader's cell admits a supporter.
    pub supporter_slot: bool,
    /// The post-kickoff supporter cooldown has elapsed.
    pub supporter_cooldown_elapsed: bool,
}

/// Named conditions evaluated top to bottom; the first that matches decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Guard {
    LeaderByCost,
    SupporterSlot,
    DefenderOverride,
}

const GUARDS: [Guard; 3] = [
    Guard::LeaderByCost,
    Guard::SupporterSlot,
    Guard::DefenderOverride,
];

struct GuardInputs {
    me: PlayerNumber,
    first: PlayerNumber,
    second: Option<PlayerNumber>,
    standing: LocalStanding,
    ball_in_own_half: bool,
    leader_ahead_of_ball: bool,
}

impl Guard {
    fn evaluate(self, inputs: &GuardInputs) -> Option<Role> {
        let second = inputs.second == Some(inputs.me);
        match self {
            Self::LeaderByCost => (inputs.first == inputs.me).then_some(Role::Leader),
            Self::SupporterSlot => (second && inputs.standing.supporter_slot).then(|| {
                if inputs.standing.supporter_cooldown_elapsed && !inputs.standing.is_defender {
                    Role::Supporter
                } else {
                    Role::None
                }
            }),
            Self::DefenderOverride => (second
                && inputs.standing.is_defender
                && inputs.ball_in_own_half
                && inputs.leader_ahead_of_ball)
                .then_some(Role::Leader),
        }
    }
}

/// State carried by one agent's arbitration from one cycle to the next.
#[derive(Clone, Debug, PartialEq)]
pub struct ArbitrationContext {
    leader: Option<PlayerNumber>,
    ball_cell: Option<usize>,
    ball_in_own_half: DynamicBorder,
    distance_to_target: DynamicBorder,
    classifier: HysteresisClassifier,
}

impl Default for ArbitrationContext {
    fn default() -> Self {
        Self {
            leader: None,
            ball_cell: None,
            ball_in_own_half: BALL_IN_OWN_HALF,
            distance_to_target: DISTANCE_TO_TARGET,
            classifier: HysteresisClassifier::default(),
        }
    }
}

impl ArbitrationContext {
    /// Creates a context with no leader and no ball cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leader elected in the latest arbitration.
    #[must_use]
    pub const fn leader(&self) -> Option<PlayerNumber> {
        self.leader
    }

    /// Cell the ball was last classified into by the static rule.
    #[must_use]
    pub const fn ball_cell(&self) -> Option<usize> {
        self.ball_cell
    }

    /// Forgets the leader, as done outside the active game phases.
    pub fn clear_leader(&mut self) {
        self.leader = None;
    }

    /// Decides the local agent's role from this cycle's ranked entries.
    ///
    /// Without ball possession or without entries the role is
    /// [`Role::None`] and the carried leader is kept. Otherwise the cheapest
    /// entry becomes the leader and the guards decide the local role.
    pub fn arbitrate(
        &mut self,
        situation: &Situation,
        entries: &[CostEntry],
        standing: LocalStanding,
    ) -> Role {
        let team_ball = situation.team_ball.position;
        let ball_in_own_half = self.ball_in_own_half.is_below(team_ball.x);

        if !situation.has_ball_possession() {
            return Role::None;
        }
        let Some(first) = elect_leader(entries) else {
            return Role::None;
        };

        if self.leader != Some(first) {
            debug!(from = ?self.leader, to = %first, "leader changed");
        }
        self.leader = Some(first);

        let leader_ahead_of_ball = situation
            .teammates
            .find(first)
            .is_some_and(|leader| leader.pose.translation().x > team_ball.x);

        let inputs = GuardInputs {
            me: situation.robot.number,
            first,
            second: entries.get(1).map(|entry| entry.agent),
            standing,
            ball_in_own_half,
            leader_ahead_of_ball,
        };

        GUARDS
            .iter()
            .find_map(|guard| guard.evaluate(&inputs))
            .unwrap_or(Role::None)
    }

    /// Role under the static rule: lead when the ball lies in the agent's cell
    /// or close in front of it.
    ///
    /// While walking to kickoff positions the ball is assumed at the field
    /// centre and possession is not required.
    pub fn static_role(
        &mut self,
        situation: &Situation,
        formation: &Formation,
        current_cell: Option<usize>,
    ) -> Role {
        let near_ball = self
            .distance_to_target
            .is_below(situation.ball.position.length());

        let leader = if situation.game.phase == GamePhase::Ready {
            self.ball_cell = self.classifier.classify(formation, Vec2::ZERO, None);
            current_cell.is_some() && current_cell == self.ball_cell
        } else {
            self.ball_cell =
                self.classifier
                    .classify(formation, situation.ball_on_field(), self.ball_cell);
            let in_ball_cell = current_cell.is_some() && current_cell == self.ball_cell;
            (in_ball_cell || near_ball) && situation.has_ball_possession()
        };

        if leader {
            Role::Leader
        } else {
            Role::None
        }
    }
}

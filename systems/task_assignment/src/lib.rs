#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-cycle orchestration of formation selection, post assignment and role
//! arbitration for one agent.
//!
//! [`TaskAssignment::handle`] consumes the world events of the cycle and the
//! matching [`Situation`] snapshot and overwrites the published
//! [`AgentTask`]. All state carried between cycles is owned by the
//! [`TaskAssignment`] value, so several agents can be simulated side by side.

mod kickoff;

use team_tasking_core::{
    AgentTask, Event, Formation, GamePhase, PlayerNumber, Pose2, Role, Situation,
    TaskAssignmentConfig,
};
use team_tasking_system_assignment::{build_cost_matrix, solve, Assignment, Pin};
use team_tasking_system_formation::{FormationCatalog, FormationError, FormationSelector};
use team_tasking_system_hysteresis::HysteresisClassifier;
use team_tasking_system_role_arbiter::{
    collect_ball_costs, elect_leader, ArbitrationContext, CostEntry, LocalStanding,
};
use thiserror::Error;
use tracing::{debug, warn};

pub use kickoff::{
    KickoffPlan, BALL_FRESHNESS_MS, BALL_MOVE_LIMIT, KICKOFF_WAIT_MS, MIN_POSE_VALIDITY,
    SUPPORTER_COOLDOWN_MS, TEAM_BALL_MOVE_LIMIT,
};

/// Errors that abort a planning cycle because the configuration is unusable.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The formation for the current situation is not available.
    #[error(transparent)]
    Formation(#[from] FormationError),
    /// The static post list does not name the local agent.
    #[error("player {number} is not listed in the static post assignment")]
    PlayerNotListed {
        /// Player number of the local agent.
        number: PlayerNumber,
    },
    /// The static post list points past the end of the active formation.
    #[error("static post {index} is outside the active formation of {cells} cells")]
    CellOutOfRange {
        /// Post index taken from the static list.
        index: usize,
        /// Cells in the active formation.
        cells: usize,
    },
}

/// Planner owned by one agent.
#[derive(Debug)]
pub struct TaskAssignment {
    catalog: FormationCatalog,
    selector: FormationSelector,
    kickoff: KickoffPlan,
    arbitration: ArbitrationContext,
    classifier: HysteresisClassifier,
    formation: Formation,
    cell_index: Option<usize>,
    target: Pose2,
    agents: Vec<PlayerNumber>,
    assignment: Option<Assignment>,
    costs: Vec<CostEntry>,
}

impl TaskAssignment {
    /// Creates a planner drawing formations from `catalog`.
    #[must_use]
    pub fn new(catalog: FormationCatalog) -> Self {
        Self {
            catalog,
            selector: FormationSelector::new(),
            kickoff: KickoffPlan::new(),
            arbitration: ArbitrationContext::new(),
            classifier: HysteresisClassifier::default(),
            formation: Formation::default(),
            cell_index: None,
            target: AgentTask::default().target(),
            agents: Vec::new(),
            assignment: None,
            costs: Vec::new(),
        }
    }

    /// Formations available to the planner.
    #[must_use]
    pub fn catalog(&self) -> &FormationCatalog {
        &self.catalog
    }

    /// Leader elected in the latest cycle.
    #[must_use]
    pub fn leader(&self) -> Option<PlayerNumber> {
        self.arbitration.leader()
    }

    /// Runs one planning cycle and overwrites `out` with its decisions.
    ///
    /// The goalkeeper always publishes [`Role::GoalKeeper`] and a penalized
    /// agent [`Role::None`]; neither updates formation, post or role.
    /// Formation, post and role are only updated in the ready, set and
    /// playing phases.
    pub fn handle(
        &mut self,
        events: &[Event],
        situation: &Situation,
        config: &TaskAssignmentConfig,
        out: &mut AgentTask,
    ) -> Result<(), PlanningError> {
        for event in events {
            if let Event::GamePhaseChanged {
                from,
                to: GamePhase::Ready,
                kickoff_us: true,
            } = event
            {
                if config.dynamic_post_assign {
                    debug!(?from, "kickoff won after a goal; mirroring formations");
                    self.catalog.mirror_all();
                }
            }
        }

        let robot = situation.robot;
        if robot.is_goalkeeper() {
            self.publish(out, Role::GoalKeeper);
            return Ok(());
        }
        // penalized agents publish None, never GoalKeeper
        if robot.penalized {
            self.publish(out, Role::None);
            return Ok(());
        }

        self.kickoff.update(situation);

        let phase = situation.game.phase;
        if !phase.is_active() {
            self.arbitration.clear_leader();
            self.publish(out, Role::None);
            return Ok(());
        }

        let players = if config.dynamic_post_assign {
            1 + situation
                .teammates
                .iter()
                .filter(|teammate| teammate.is_field_player() && teammate.number != robot.number)
                .count()
        } else {
            config.players.len()
        };

        self.update_formation(situation, config, players)?;
        if config.dynamic_post_assign {
            self.assign_post_dynamically(situation, players);
        } else {
            self.assign_post_statically(situation, config)?;
        }

        let role = self.update_role(situation, config);
        self.publish(out, role);
        Ok(())
    }

    fn update_formation(
        &mut self,
        situation: &Situation,
        config: &TaskAssignmentConfig,
        players: usize,
    ) -> Result<(), PlanningError> {
        let selected = self.selector.reselect(
            situation.game.phase,
            situation.game.kickoff_us(),
            players,
            config.formation_version,
            &self.catalog,
        )?;
        if let Some(formation) = selected {
            self.formation = formation.clone();
        }
        Ok(())
    }

    fn assign_post_statically(
        &mut self,
        situation: &Situation,
        config: &TaskAssignmentConfig,
    ) -> Result<(), PlanningError> {
        let number = situation.robot.number;
        let index = config
            .players
            .iter()
            .position(|player| *player == number)
            .ok_or(PlanningError::PlayerNotListed { number })?;
        let cell = self
            .formation
            .cell(index)
            .ok_or(PlanningError::CellOutOfRange {
                index,
                cells: self.formation.len(),
            })?;

        self.cell_index = Some(index);
        self.target = cell.pointer();
        self.assignment = None;
        Ok(())
    }

    fn assign_post_dynamically(&mut self, situation: &Situation, players: usize) {
        let me = situation.robot.number;
        self.agents.clear();
        self.agents.extend(
            situation
                .teammates
                .iter()
                .filter(|teammate| teammate.is_field_player() && teammate.number != me)
                .map(|teammate| teammate.number),
        );
        self.agents.push(me);

        if self.agents.len() != players {
            warn!(
                agents = self.agents.len(),
                players, "agent list disagrees with the active player count"
            );
            return;
        }

        let pin = self.leader_pin(situation);
        let Some(matrix) = build_cost_matrix(situation, &self.agents, &self.formation) else {
            return;
        };
        let Some(assignment) = solve(&matrix, pin) else {
            return;
        };

        let Some(index) = assignment.cell_of(self.agents.len() - 1) else {
            return;
        };
        let Some(cell) = self.formation.cell(index) else {
            return;
        };

        self.cell_index = Some(index);
        self.target = cell.pointer();
        self.assignment = Some(assignment);
    }

    /// Keeps last cycle's leader in the cell it stands in, unless that cell
    /// belongs to the defensive line.
    fn leader_pin(&self, situation: &Situation) -> Option<Pin> {
        let leader = self.arbitration.leader()?;
        let agent = self.agents.iter().position(|number| *number == leader)?;
        let pose = situation.pose_of(leader)?;
        let cell = self
            .classifier
            .classify(&self.formation, pose.translation(), None)?;

        if self.formation.cell(cell)?.is_defender() {
            return None;
        }
        Some(Pin { agent, cell })
    }

    fn update_role(&mut self, situation: &Situation, config: &TaskAssignmentConfig) -> Role {
        if !config.dynamic_role_assign {
            return self
                .arbitration
                .static_role(situation, &self.formation, self.cell_index);
        }

        collect_ball_costs(situation, self.arbitration.leader(), &mut self.costs);

        let is_defender = situation.game.phase == GamePhase::Playing
            && self
                .cell_index
                .and_then(|index| self.formation.cell(index))
                .is_some_and(|cell| cell.is_defender());

        let leader_cell = elect_leader(&self.costs)
            .filter(|_| config.dynamic_post_assign)
            .and_then(|leader| self.agents.iter().position(|number| *number == leader))
            .map(|agent| {
                self.assignment
                    .as_ref()
                    .and_then(|assignment| assignment.cell_of(agent))
            });

        let supporter_slot = match leader_cell {
            Some(cell) => cell
                .and_then(|index| self.formation.cell(index))
                .is_some_and(|cell| cell.supporter_capacity() > 0),
            None => !is_defender,
        };

        let standing = LocalStanding {
            is_defender,
            supporter_slot,
            supporter_cooldown_elapsed: self.kickoff.supporter_cooldown_elapsed(),
        };

        self.arbitration.arbitrate(situation, &self.costs, standing)
    }

    fn publish(&self, out: &mut AgentTask, role: Role) {
        *out = AgentTask::new(
            self.formation.clone(),
            role,
            self.kickoff.ball_is_free(),
            self.target,
            self.cell_index,
        );
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Optimal agent-to-cell assignment with an optional pinned pair.
//!
//! Teams of up to [`MAX_EXHAUSTIVE_AGENTS`] agents are solved by enumerating
//! every permutation of cell indices in lexicographic order, which keeps the
//! tie-breaking rule trivial: the first minimum found wins. Larger teams fall
//! back to the Hungarian method on millisecond-scaled integer costs.

use pathfinding::{kuhn_munkres::kuhn_munkres_min, matrix::Matrix};
use team_tasking_core::{Formation, PlayerNumber, Situation};
use team_tasking_system_kinodynamics::ApproachProfile;
use tracing::warn;

/// Largest team solved by exhaustive enumeration.
pub const MAX_EXHAUSTIVE_AGENTS: usize = 6;

/// Integer cost that keeps the Hungarian solver away from entries excluded by a pin.
const PROHIBITIVE_COST_MS: i64 = 1_000_000_000;

/// Square matrix of agent-to-cell costs in seconds.
///
/// Entry `(agent, cell)` is `None` when the cost could not be computed this
/// cycle; such entries contribute nothing to a permutation total.
#[derive(Clone, Debug, PartialEq)]
pub struct CostMatrix {
    size: usize,
    entries: Vec<Option<f32>>,
}

impl CostMatrix {
    /// Creates a `size` by `size` matrix with every entry undefined.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            entries: vec![None; size * size],
        }
    }

    /// Creates a matrix from fully defined rows; `None` unless the rows are square.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f32>]) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }
        let entries = rows.iter().flatten().map(|&cost| Some(cost)).collect();
        Some(Self { size, entries })
    }

    /// Number of agents and cells covered by the matrix.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Cost for `agent` to occupy `cell`, if defined.
    #[must_use]
    pub fn get(&self, agent: usize, cell: usize) -> Option<f32> {
        if agent >= self.size || cell >= self.size {
            return None;
        }
        self.entries.get(agent * self.size + cell).copied().flatten()
    }

    /// Stores the cost for `agent` to occupy `cell`; out-of-range pairs are ignored.
    pub fn set(&mut self, agent: usize, cell: usize, cost: f32) {
        if agent >= self.size || cell >= self.size {
            return;
        }
        if let Some(entry) = self.entries.get_mut(agent * self.size + cell) {
            *entry = Some(cost);
        }
    }

    /// Total cost of `permutation`, where entry `i` is the cell of agent `i`.
    ///
    /// The pinned entry, when given, is counted as zero.
    #[must_use]
    pub fn total(&self, permutation: &[usize], pin: Option<Pin>) -> f32 {
        permutation
            .iter()
            .enumerate()
            .map(|(agent, &cell)| match pin {
                Some(pin) if pin.agent == agent && pin.cell == cell => 0.0,
                _ => self.get(agent, cell).unwrap_or(0.0),
            })
            .sum()
    }
}

/// Forced agent-to-cell pair that bypasses cost optimisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pin {
    /// Row of the pinned agent.
    pub agent: usize,
    /// Cell the agent must occupy.
    pub cell: usize,
}

/// Best permutation found by [`solve`].
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    permutation: Vec<usize>,
    total_cost: f32,
}

impl Assignment {
    /// Cell index per agent row.
    #[must_use]
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Cell assigned to the agent in row `agent`.
    #[must_use]
    pub fn cell_of(&self, agent: usize) -> Option<usize> {
        self.permutation.get(agent).copied()
    }

    /// Summed cost of the permutation, counting the pinned entry as zero.
    #[must_use]
    pub const fn total_cost(&self) -> f32 {
        self.total_cost
    }
}

/// Finds the permutation of cells minimising the total cost.
///
/// A pin outside the matrix is ignored. An empty matrix has no assignment.
#[must_use]
pub fn solve(matrix: &CostMatrix, pin: Option<Pin>) -> Option<Assignment> {
    let size = matrix.size();
    if size == 0 {
        return None;
    }

    let pin = pin.filter(|pin| {
        let inside = pin.agent < size && pin.cell < size;
        if !inside {
            warn!(agent = pin.agent, cell = pin.cell, size, "ignoring pin outside the cost matrix");
        }
        inside
    });

    if size <= MAX_EXHAUSTIVE_AGENTS {
        Some(solve_exhaustive(matrix, pin))
    } else {
        Some(solve_hungarian(matrix, pin))
    }
}

fn solve_exhaustive(matrix: &CostMatrix, pin: Option<Pin>) -> Assignment {
    let mut permutation: Vec<usize> = (0..matrix.size()).collect();
    let mut best: Option<Assignment> = None;

    loop {
        let admissible = pin.map_or(true, |pin| permutation[pin.agent] == pin.cell);
        if admissible {
            let total = matrix.total(&permutation, pin);
            let improves = best
                .as_ref()
                .map_or(true, |current| total < current.total_cost);
            if improves {
                best = Some(Assignment {
                    permutation: permutation.clone(),
                    total_cost: total,
                });
            }
        }

        if !next_permutation(&mut permutation) {
            break;
        }
    }

    // the identity permutation is always visited, and with a pin at least one
    // admissible permutation exists, so `best` is populated here
    best.unwrap_or_else(|| {
        let identity: Vec<usize> = (0..matrix.size()).collect();
        let total_cost = matrix.total(&identity, pin);
        Assignment {
            permutation: identity,
            total_cost,
        }
    })
}

fn solve_hungarian(matrix: &CostMatrix, pin: Option<Pin>) -> Assignment {
    let size = matrix.size();
    let mut weights = Matrix::new(size, size, 0_i64);

    for agent in 0..size {
        for cell in 0..size {
            let cost = match pin {
                Some(pin) if pin.agent == agent && pin.cell == cell => 0,
                Some(pin) if pin.agent == agent || pin.cell == cell => PROHIBITIVE_COST_MS,
                _ => to_millis(matrix.get(agent, cell)),
            };
            weights[(agent, cell)] = cost;
        }
    }

    let (_, permutation) = kuhn_munkres_min(&weights);
    let total_cost = matrix.total(&permutation, pin);
    Assignment {
        permutation,
        total_cost,
    }
}

fn to_millis(cost: Option<f32>) -> i64 {
    cost.map_or(0, |seconds| (seconds * 1_000.0).round() as i64)
}

/// Advances `values` to the next permutation in lexicographic order.
///
/// Returns `false` once the last permutation has been reached.
fn next_permutation(values: &mut [usize]) -> bool {
    if values.len() < 2 {
        return false;
    }

    let mut pivot = values.len() - 1;
    while pivot > 0 && values[pivot - 1] >= values[pivot] {
        pivot -= 1;
    }
    if pivot == 0 {
        return false;
    }

    let mut successor = values.len() - 1;
    while values[successor] <= values[pivot - 1] {
        successor -= 1;
    }
    values.swap(pivot - 1, successor);
    values[pivot..].reverse();
    true
}

/// Builds the cost of every agent walking to every cell of `formation`.
///
/// Row `i` belongs to `agents[i]`; the local agent uses its own pose and
/// locomotion state, teammates use their latest broadcast pose. A teammate
/// missing from the roster leaves its row undefined for this cycle. Returns
/// `None` when the formation size does not match the agent count.
#[must_use]
pub fn build_cost_matrix(
    situation: &Situation,
    agents: &[PlayerNumber],
    formation: &Formation,
) -> Option<CostMatrix> {
    if agents.len() != formation.len() {
        warn!(
            agents = agents.len(),
            cells = formation.len(),
            "formation size does not match the agent count"
        );
        return None;
    }

    let mut matrix = CostMatrix::new(agents.len());
    for (row, &number) in agents.iter().enumerate() {
        let Some(pose) = situation.pose_of(number) else {
            warn!(player = %number, "teammate missing from roster; cost row left undefined");
            continue;
        };
        let motion = (number == situation.robot.number).then_some(situation.motion);

        for (column, cell) in formation.cells().iter().enumerate() {
            let local = pose.field_to_robot(cell.occupation().translation());
            matrix.set(row, column, ApproachProfile::TO_POST.cost(local, motion));
        }
    }

    Some(matrix)
}

//! Elevation-aware A* over the cell graph
//!
//! Shared by the river and tributary generators. Costs favor downhill steps,
//! marshes and cells that keep draining; the heuristic looks at every target
//! and takes the cheapest estimate.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use thiserror::Error;
use tracing::trace;

use crate::graph::CellGraph;

/// Cells above this elevation block the search unless they hold water
pub const MAX_PASSABLE_ELEVATION: f64 = 150.0;

const DOWNHILL_RATE: f64 = 0.05;
const UPHILL_RATE: f64 = 0.1;
const MIN_STEP_COST: f64 = 0.01;
const MARSH_FACTOR: f64 = 0.5;
const HIGHLAND_ELEVATION: f64 = 80.0;
const HIGHLAND_FACTOR: f64 = 1.1;
const DRAINING_FACTOR: f64 = 0.3;
const HEURISTIC_UPHILL: f64 = 0.1;
const HEURISTIC_DOWNHILL: f64 = 0.3;

/// Why a search produced no path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchFailure {
    /// The start cell does not exist or cannot be entered
    #[error("start cell {0} is not usable")]
    InvalidStart(usize),
    /// No reachable target was given
    #[error("no targets to search for")]
    NoTargets,
    /// The open set ran dry before reaching a target
    #[error("no path to any target")]
    Unreachable,
    /// The iteration cap was hit
    #[error("search gave up after {0} iterations")]
    Exhausted(usize),
}

/// How the search treats cells already taken by a river or tributary
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClaimPolicy {
    /// Claimed cells are impassable
    Block,
    /// Entering a claimed cell multiplies the step cost
    Penalize(f64),
}

/// Cost of moving from `from` to its neighbor `to`
///
/// Downhill steps get cheaper down to a floor, uphill steps cost more in
/// proportion to the climb. Marsh halves the cost, highland above 80 adds
/// ten percent and a destination that still has somewhere lower to drain to
/// costs a third.
pub fn step_cost(graph: &CellGraph, from: usize, to: usize) -> f64 {
    let from_height = graph.height(from);
    let to_height = graph.height(to);
    let delta = to_height - from_height;

    let mut cost = if delta < 0.0 {
        (1.0 + DOWNHILL_RATE * delta).max(MIN_STEP_COST)
    } else {
        1.0 + UPHILL_RATE * delta
    };

    if graph.get(to).is_some_and(|c| c.metadata.is_marsh()) {
        cost *= MARSH_FACTOR;
    }
    if to_height > HIGHLAND_ELEVATION {
        cost *= HIGHLAND_FACTOR;
    }
    if graph.neighbors(to).iter().any(|&n| graph.height(n) < to_height) {
        cost *= DRAINING_FACTOR;
    }

    cost
}

/// Open-set entry, ordered so the smallest `f` pops first
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    cell: usize,
    f_score: f64,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* search configured for one graph and one set of claimed cells
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder<'a> {
    graph: &'a CellGraph,
    claimed: &'a BTreeSet<usize>,
    policy: ClaimPolicy,
    max_iterations: usize,
}

impl<'a> Pathfinder<'a> {
    /// Search that treats `claimed` cells as walls, capped at 1000 iterations
    pub fn new(graph: &'a CellGraph, claimed: &'a BTreeSet<usize>) -> Self {
        Self {
            graph,
            claimed,
            policy: ClaimPolicy::Block,
            max_iterations: 1000,
        }
    }

    pub fn with_policy(mut self, policy: ClaimPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// True when the search may enter `id`
    ///
    /// Lakes and marshes ignore the elevation limit but not the claim policy.
    pub fn is_passable(&self, id: usize) -> bool {
        let Some(cell) = self.graph.get(id) else {
            return false;
        };
        if self.policy == ClaimPolicy::Block && self.claimed.contains(&id) {
            return false;
        }
        let holds_water = cell.metadata.lake || cell.metadata.is_marsh();
        holds_water || cell.height() <= MAX_PASSABLE_ELEVATION
    }

    /// Cost of a single step under the claim policy
    pub fn cost(&self, from: usize, to: usize) -> f64 {
        let base = step_cost(self.graph, from, to);
        match self.policy {
            ClaimPolicy::Penalize(factor) if self.claimed.contains(&to) => base * factor,
            _ => base,
        }
    }

    /// Cheapest estimate from `id` to any target
    ///
    /// Straight-line distance, plus a tenth of the climb for targets above
    /// `id` or minus three tenths of the drop for targets below.
    pub fn heuristic(&self, id: usize, targets: &[usize]) -> f64 {
        let Some(position) = self.graph.position(id) else {
            return f64::INFINITY;
        };
        let height = self.graph.height(id);

        targets
            .iter()
            .filter_map(|&target| {
                let target_position = self.graph.position(target)?;
                let delta = self.graph.height(target) - height;
                let slope = if delta > 0.0 {
                    HEURISTIC_UPHILL * delta
                } else {
                    HEURISTIC_DOWNHILL * delta
                };
                Some(position.distance(target_position) + slope)
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Find a path from `start` to any cell in `targets`
    ///
    /// The path includes both endpoints. The search stops as soon as a target
    /// is pushed onto the open set.
    pub fn find_path(&self, start: usize, targets: &BTreeSet<usize>) -> Result<Vec<usize>, SearchFailure> {
        if start >= self.graph.len() {
            return Err(SearchFailure::InvalidStart(start));
        }
        let target_list: Vec<usize> = targets
            .iter()
            .copied()
            .filter(|&t| self.is_passable(t))
            .collect();
        if target_list.is_empty() {
            return Err(SearchFailure::NoTargets);
        }
        if targets.contains(&start) {
            return Ok(vec![start]);
        }

        let len = self.graph.len();
        let mut g_score = vec![f64::INFINITY; len];
        let mut came_from: Vec<Option<usize>> = vec![None; len];
        let mut closed = vec![false; len];
        let mut open = BinaryHeap::new();

        g_score[start] = 0.0;
        open.push(SearchNode {
            cell: start,
            f_score: self.heuristic(start, &target_list),
        });

        let mut iterations = 0;
        while let Some(current) = open.pop() {
            if closed[current.cell] {
                continue;
            }
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(SearchFailure::Exhausted(self.max_iterations));
            }
            closed[current.cell] = true;

            for &neighbor in self.graph.neighbors(current.cell) {
                if closed[neighbor] || !self.is_passable(neighbor) {
                    continue;
                }

                let step = self.cost(current.cell, neighbor);
                let tentative = g_score[current.cell] + step;
                if tentative >= g_score[neighbor] {
                    continue;
                }

                g_score[neighbor] = tentative;
                came_from[neighbor] = Some(current.cell);
                let h = self.heuristic(neighbor, &target_list);
                trace!(
                    from = current.cell,
                    to = neighbor,
                    cost = step,
                    g = tentative,
                    h,
                    "open"
                );

                if targets.contains(&neighbor) {
                    return Ok(reconstruct(&came_from, neighbor));
                }
                open.push(SearchNode {
                    cell: neighbor,
                    f_score: tentative + h,
                });
            }
        }

        Err(SearchFailure::Unreachable)
    }
}

fn reconstruct(came_from: &[Option<usize>], end: usize) -> Vec<usize> {
    let mut path = vec![end];
    let mut node = end;
    while let Some(previous) = came_from[node] {
        path.push(previous);
        node = previous;
    }
    path.reverse();
    path
}

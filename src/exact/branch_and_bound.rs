//! Sequential best-first branch-and-bound.
//!
//! # Algorithm
//!
//! 1. Seed the upper bound with a nearest-neighbor tour from city 0.
//! 2. The root node holds the fully reduced matrix; its bound is the
//!    reduction.
//! 3. Repeatedly pop the node with the smallest bound. A node whose bound
//!    reaches the best known cost is pruned. A node whose path covers every
//!    city is closed with the true matrix cost and may become the new best.
//!    Otherwise one child is generated per usable edge to an unvisited city,
//!    with bound `parent + reduced(from, to) + additional reduction`.
//! 4. When the frontier empties, the best tour is optimal.
//!
//! Ties in the frontier are broken by insertion order, so the search (and
//! the returned tour) is fully deterministic.
//!
//! # Complexity
//!
//! O(n!) nodes in the worst case, O(n²) work and memory per node.
//!
//! # Reference
//!
//! Little, J.D.C., Murty, K.G., Sweeney, D.W. & Karel, C. (1963). "An
//! algorithm for the traveling salesman problem", *Operations Research*
//! 11(6), 972-989.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, info, warn};

use super::MAX_BITMASK_CITIES;
use crate::bound::{bounded_add, ReducedMatrix, UNUSABLE};
use crate::cancel::CancellationToken;
use crate::config::SolverConfig;
use crate::constructive::nearest_neighbor_tour;
use crate::error::{Result, TspError};
use crate::models::{Graph, Solution, Statistics};
use crate::solver::{ProgressCallback, ProgressReporter, TspSolver};

/// A partial tour in the frontier.
#[derive(Debug, Clone)]
struct SearchNode {
    path: Vec<usize>,
    visited: u64,
    matrix: ReducedMatrix,
    bound: f64,
}

impl SearchNode {
    fn last(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    fn child(&self, to: usize) -> Self {
        let from = self.last();
        let (matrix, additional) = self.matrix.branch(from, to);
        let bound = bounded_add(bounded_add(self.bound, self.matrix.get(from, to)), additional);
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(to);
        Self {
            path,
            visited: self.visited | (1 << to),
            matrix,
            bound,
        }
    }

    fn memory_bytes(&self) -> u64 {
        (std::mem::size_of::<Self>() + self.path.capacity() * std::mem::size_of::<usize>())
            as u64
            + self.matrix.memory_bytes()
    }
}

/// Frontier entry: smallest bound first, then first inserted.
#[derive(Debug)]
struct Queued {
    seq: u64,
    node: SearchNode,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap
        other
            .node
            .bound
            .total_cmp(&self.node.bound)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Best-first branch-and-bound with matrix-reduction bounds.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::exact::BranchAndBound;
/// use u_tsp::TspSolver;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0],
///     vec![12.0, 0.0, 20.0],
///     vec![18.0, 25.0, 0.0],
/// ]).unwrap();
///
/// let with_pruning = BranchAndBound::default().solve(&graph, true).unwrap();
/// let without = BranchAndBound::default().solve(&graph, false).unwrap();
/// assert_eq!(with_pruning.total_cost(), 48.0);
/// assert_eq!(with_pruning.total_cost(), without.total_cost());
/// ```
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    config: SolverConfig,
    progress: ProgressReporter,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl BranchAndBound {
    /// Creates a sequential branch-and-bound solver.
    pub fn new(config: SolverConfig) -> Self {
        let progress = ProgressReporter::new(None, config.progress_interval);
        Self { config, progress }
    }

    /// Sets the progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.set_progress_callback(callback);
        self
    }
}

impl TspSolver for BranchAndBound {
    fn name(&self) -> &'static str {
        "Branch and Bound"
    }

    fn solve_with_cancellation(
        &self,
        graph: &Graph,
        pruning: bool,
        token: &CancellationToken,
    ) -> Result<Solution> {
        self.config.validate()?;
        let n = graph.size();
        if n > MAX_BITMASK_CITIES {
            return Err(TspError::SizeCeilingExceeded {
                algorithm: self.name(),
                cities: n,
                limit: MAX_BITMASK_CITIES,
            });
        }

        let mut stats = Statistics::started();
        info!(event = "solve_start", algorithm = self.name(), cities = n, pruning);

        let seed = self.config.seed_with_greedy.then(|| nearest_neighbor_tour(graph, 0));
        let mut best_cost = seed.as_ref().map_or(UNUSABLE, |(_, cost)| *cost);
        let mut best_tour: Option<Vec<usize>> = None;
        stats.initial_bound = seed.as_ref().map_or(0.0, |(_, cost)| *cost);
        let mut closed_any = false;

        let mut matrix = ReducedMatrix::from_graph(graph);
        let bound = matrix.reduce();
        let root = SearchNode {
            path: vec![0],
            visited: 1,
            matrix,
            bound,
        };
        let node_bytes = root.memory_bytes();

        let mut seq = 0u64;
        let mut frontier = BinaryHeap::new();
        frontier.push(Queued { seq, node: root });

        while let Some(Queued { node, .. }) = frontier.pop() {
            token.check()?;
            stats.record_explored();
            self.progress
                .tick(stats.nodes_explored, stats.nodes_pruned, best_cost);

            if pruning && node.bound >= best_cost {
                stats.record_pruned();
                continue;
            }

            if node.path.len() == n {
                closed_any = true;
                let mut tour = node.path;
                tour.push(0);
                let cost = graph.path_cost(&tour);
                if cost < best_cost {
                    debug!(event = "incumbent", cost, explored = stats.nodes_explored);
                    best_cost = cost;
                    best_tour = Some(tour);
                }
                continue;
            }

            let from = node.last();
            for to in 0..n {
                if node.visited & (1 << to) != 0 || !node.matrix.is_usable(from, to) {
                    continue;
                }
                let child = node.child(to);
                if pruning && child.bound >= best_cost {
                    stats.record_pruned();
                    continue;
                }
                seq += 1;
                frontier.push(Queued { seq, node: child });
            }
            stats.record_memory(frontier.len() as u64 * node_bytes);
        }

        if !closed_any && (!pruning || seed.is_none()) {
            warn!(
                event = "no_tour_closed",
                algorithm = self.name(),
                cities = n,
                "search ended without closing a tour, returning nearest-neighbor tour"
            );
        }

        let (tour, cost) = match best_tour {
            Some(tour) => (tour, best_cost),
            None => {
                let (tour, _) = seed.unwrap_or_else(|| nearest_neighbor_tour(graph, 0));
                let cost = graph.path_cost(&tour);
                (tour, cost)
            }
        };

        stats.finish(cost);
        self.progress
            .report(stats.nodes_explored, stats.nodes_pruned, cost);
        info!(
            event = "solve_end",
            algorithm = self.name(),
            cost,
            explored = stats.nodes_explored,
            pruned = stats.nodes_pruned,
            duration_ms = stats.execution_time.as_millis() as u64,
        );

        Ok(Solution::new(tour, cost, stats, self.name()))
    }

    fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = ProgressReporter::new(Some(callback), self.config.progress_interval);
    }
}

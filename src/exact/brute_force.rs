//! Exhaustive enumeration.
//!
//! # Algorithm
//!
//! Fix city 0 as the origin and walk every ordering of cities 1..n−1 in
//! lexicographic order, keeping the first strictly cheapest tour.
//!
//! # Complexity
//!
//! O(n · (n−1)!) time, O(n) space.

use tracing::info;

use crate::cancel::CancellationToken;
use crate::config::SolverConfig;
use crate::error::{Result, TspError};
use crate::models::{Graph, Solution, Statistics};
use crate::solver::{ProgressCallback, ProgressReporter, TspSolver};

/// Brute-force solver for very small instances.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::exact::BruteForce;
/// use u_tsp::TspSolver;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let solution = BruteForce::default().solve(&graph, false).unwrap();
/// assert_eq!(solution.tour(), &[0, 1, 3, 2, 0]);
/// assert_eq!(solution.statistics().nodes_explored, 6); // 3!
/// ```
#[derive(Debug, Clone)]
pub struct BruteForce {
    config: SolverConfig,
    progress: ProgressReporter,
}

impl Default for BruteForce {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl BruteForce {
    /// Creates a brute-force solver.
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

impl TspSolver for BruteForce {
    fn name(&self) -> &'static str {
        "Brute Force"
    }

    fn solve_with_cancellation(
        &self,
        graph: &Graph,
        _pruning: bool,
        token: &CancellationToken,
    ) -> Result<Solution> {
        self.config.validate()?;
        let n = graph.size();
        let limit = self.config.brute_force_max_cities;
        if n > limit {
            return Err(TspError::SizeCeilingExceeded {
                algorithm: self.name(),
                cities: n,
                limit,
            });
        }

        let mut stats = Statistics::started();
        info!(event = "solve_start", algorithm = self.name(), cities = n);

        let mut order: Vec<usize> = (1..n).collect();
        let mut best_order = order.clone();
        let mut best_cost = f64::INFINITY;

        loop {
            token.check()?;
            stats.record_explored();

            let cost = tour_cost(graph, &order);
            if cost < best_cost {
                best_cost = cost;
                best_order.copy_from_slice(&order);
            }
            self.progress.tick(stats.nodes_explored, 0, best_cost);

            if !next_permutation(&mut order) {
                break;
            }
        }

        let mut tour = Vec::with_capacity(n + 1);
        tour.push(0);
        tour.extend_from_slice(&best_order);
        tour.push(0);

        stats.record_memory((2 * n * std::mem::size_of::<usize>()) as u64);
        stats.finish(best_cost);
        info!(
            event = "solve_end",
            algorithm = self.name(),
            cost = best_cost,
            permutations = stats.nodes_explored,
            duration_ms = stats.execution_time.as_millis() as u64,
        );

        Ok(Solution::new(tour, best_cost, stats, self.name()))
    }

    fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = ProgressReporter::new(Some(callback), self.config.progress_interval);
    }
}

/// Cost of `0 → order… → 0`.
fn tour_cost(graph: &Graph, order: &[usize]) -> f64 {
    let mut prev = 0;
    let mut cost = 0.0;
    for &city in order {
        cost += graph.get(prev, city);
        prev = city;
    }
    cost + graph.get(prev, 0)
}

/// Advances `items` to the next lexicographic permutation.
///
/// Returns `false` (leaving `items` sorted descending) after the last one.
fn next_permutation(items: &mut [usize]) -> bool {
    if items.len() < 2 {
        return false;
    }
    let mut i = items.len() - 1;
    while i > 0 && items[i - 1] >= items[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = items.len() - 1;
    while items[j] <= items[i - 1] {
        j -= 1;
    }
    items.swap(i - 1, j);
    items[i..].reverse();
    true
}

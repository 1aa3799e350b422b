//! Nearest-neighbor constructive heuristic.
//!
//! Builds a tour greedily: starting from a city, always travel to the
//! nearest unvisited city, then return to the start. The multi-start variant
//! repeats this from every city and keeps the cheapest tour.
//!
//! # Complexity
//!
//! O(n²) per start, O(n³) total work for multi-start (spread over the pool).
//!
//! # Reference
//!
//! Rosenkrantz, D.J., Stearns, R.E. & Lewis, P.M. (1977). "An analysis of
//! several heuristics for the traveling salesman problem", *SIAM Journal on
//! Computing* 6(3), 563-581.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::config::SolverConfig;
use crate::error::Result;
use crate::models::{Graph, Solution, Statistics};
use crate::solver::{ProgressCallback, ProgressReporter, TspSolver};

/// Builds a closed nearest-neighbor tour from `start`.
///
/// Ties go to the smallest city index. Returns the tour (with `start`
/// repeated at the end) and its cost.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::constructive::nearest_neighbor_tour;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let (tour, cost) = nearest_neighbor_tour(&graph, 0);
/// assert_eq!(tour, vec![0, 1, 3, 2, 0]);
/// assert!((cost - 80.0).abs() < 1e-10);
/// ```
pub fn nearest_neighbor_tour(graph: &Graph, start: usize) -> (Vec<usize>, f64) {
    let n = graph.size();
    let mut visited = vec![false; n];
    let mut tour = Vec::with_capacity(n + 1);
    let mut cost = 0.0;

    visited[start] = true;
    tour.push(start);
    let mut current = start;

    for _ in 1..n {
        let mut best: Option<(usize, f64)> = None;
        for (j, &d) in graph.row(current).iter().enumerate() {
            if visited[j] {
                continue;
            }
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((j, d));
            }
        }
        let Some((next, d)) = best else { break };
        visited[next] = true;
        tour.push(next);
        cost += d;
        current = next;
    }

    cost += graph.get(current, start);
    tour.push(start);
    (tour, cost)
}

/// Rotates a closed tour so that it starts and ends at city 0.
pub(crate) fn rotate_to_origin(tour: &[usize]) -> Vec<usize> {
    let open = match tour.split_last() {
        Some((_, open)) if tour.len() > 1 && tour.first() == tour.last() => open,
        _ => tour,
    };
    let pos = open.iter().position(|&c| c == 0).unwrap_or(0);
    let mut rotated = Vec::with_capacity(open.len() + 1);
    rotated.extend_from_slice(&open[pos..]);
    rotated.extend_from_slice(&open[..pos]);
    if let Some(&first) = rotated.first() {
        rotated.push(first);
    }
    rotated
}

/// Runs nearest neighbor from every city on the current rayon pool.
///
/// Returns the cheapest tour rotated to start at city 0; ties go to the
/// smallest start city.
pub(crate) fn best_of_all_starts(
    graph: &Graph,
    token: &CancellationToken,
) -> Result<(Vec<usize>, f64)> {
    let runs = (0..graph.size())
        .into_par_iter()
        .map(|start| {
            token.check()?;
            Ok(nearest_neighbor_tour(graph, start))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut best: Option<(Vec<usize>, f64)> = None;
    for (tour, cost) in runs {
        if best.as_ref().map_or(true, |(_, bc)| cost < *bc) {
            best = Some((tour, cost));
        }
    }
    let (tour, _) = best.unwrap_or_else(|| nearest_neighbor_tour(graph, 0));
    let tour = rotate_to_origin(&tour);
    let cost = graph.path_cost(&tour);
    Ok((tour, cost))
}

/// Nearest-neighbor heuristic solver.
///
/// Single-start from city 0 for small instances. From
/// [`greedy_parallel_threshold`](SolverConfig::greedy_parallel_threshold)
/// cities on, and while multi-start is enabled, every city is tried as a
/// start in parallel and the cheapest tour is kept.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::constructive::GreedySolver;
/// use u_tsp::TspSolver;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0],
///     vec![12.0, 0.0, 20.0],
///     vec![18.0, 25.0, 0.0],
/// ]).unwrap();
///
/// let solution = GreedySolver::default().solve(&graph, false).unwrap();
/// assert_eq!(solution.tour(), &[0, 1, 2, 0]);
/// assert!((solution.total_cost() - 48.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct GreedySolver {
    config: SolverConfig,
    multi_start: bool,
    progress: ProgressReporter,
}

impl Default for GreedySolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl GreedySolver {
    /// Creates a greedy solver with multi-start enabled.
    pub fn new(config: SolverConfig) -> Self {
        let progress = ProgressReporter::new(None, config.progress_interval);
        Self {
            config,
            multi_start: true,
            progress,
        }
    }

    /// Enables or disables the parallel multi-start variant.
    pub fn with_multi_start(mut self, enabled: bool) -> Self {
        self.multi_start = enabled;
        self
    }

    /// Sets the progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.set_progress_callback(callback);
        self
    }

    fn uses_multi_start(&self, n: usize) -> bool {
        self.multi_start && n >= self.config.greedy_parallel_threshold
    }
}

impl TspSolver for GreedySolver {
    fn name(&self) -> &'static str {
        "Greedy"
    }

    fn solve_with_cancellation(
        &self,
        graph: &Graph,
        _pruning: bool,
        token: &CancellationToken,
    ) -> Result<Solution> {
        self.config.validate()?;
        let n = graph.size();
        let multi_start = self.uses_multi_start(n);
        let mut stats = Statistics::started();
        info!(event = "solve_start", algorithm = self.name(), cities = n, multi_start);

        token.check()?;
        let (tour, cost) = if multi_start {
            let pool = self.config.thread_pool()?;
            pool.install(|| best_of_all_starts(graph, token))?
        } else {
            let (tour, _) = nearest_neighbor_tour(graph, 0);
            let cost = graph.path_cost(&tour);
            (tour, cost)
        };

        let starts = if multi_start { n } else { 1 };
        stats.record_explored_n((starts * n) as u64);
        stats.record_memory((starts * (n + 1) * (std::mem::size_of::<usize>() + 1)) as u64);
        stats.finish(cost);
        self.progress.report(stats.nodes_explored, 0, cost);
        debug!(event = "greedy_tour", starts, cost);
        info!(
            event = "solve_end",
            algorithm = self.name(),
            cost,
            nodes = stats.total_nodes_generated,
            duration_ms = stats.execution_time.as_millis() as u64,
        );

        Ok(Solution::new(tour, cost, stats, self.name()))
    }

    fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = ProgressReporter::new(Some(callback), self.config.progress_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_valid_tour, four_city_graph, random_asymmetric_graph};

    #[test]
    fn test_nn_tour_from_other_start() {
        let graph = four_city_graph();
        let (tour, cost) = nearest_neighbor_tour(&graph, 2);
        // 2 → 0 (15) → 1 (10) → 3 (25) → 2 (30)
        assert_eq!(tour, vec![2, 0, 1, 3, 2]);
        assert!((cost - 80.0).abs() < 1e-10);
    }

    #[test]
    fn test_nn_tie_prefers_smallest_index() {
        let graph = Graph::new(&[
            vec![0.0, 5.0, 5.0, 5.0],
            vec![5.0, 0.0, 1.0, 2.0],
            vec![5.0, 1.0, 0.0, 1.0],
            vec![5.0, 2.0, 1.0, 0.0],
        ])
        .unwrap();
        let (tour, _) = nearest_neighbor_tour(&graph, 0);
        assert_eq!(tour, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_rotate_to_origin() {
        assert_eq!(rotate_to_origin(&[2, 0, 1, 3, 2]), vec![0, 1, 3, 2, 0]);
        assert_eq!(rotate_to_origin(&[0, 1, 2, 0]), vec![0, 1, 2, 0]);
        assert_eq!(rotate_to_origin(&[3, 1, 0]), vec![0, 3, 1, 0]);
    }

    #[test]
    fn test_multi_start_not_worse_than_single() {
        let graph = random_asymmetric_graph(14, 100, 5);
        let single = GreedySolver::default()
            .with_multi_start(false)
            .solve(&graph, false)
            .unwrap();
        let multi = GreedySolver::default().solve(&graph, false).unwrap();
        assert_valid_tour(multi.tour(), 14);
        assert!(multi.total_cost() <= single.total_cost() + 1e-9);
        assert_eq!(multi.statistics().nodes_explored, 14 * 14);
        assert!((multi.total_cost() - graph.path_cost(multi.tour())).abs() < 1e-9);
    }

    #[test]
    fn test_multi_start_is_deterministic() {
        let graph = random_asymmetric_graph(12, 20, 9);
        let solver = GreedySolver::new(SolverConfig::default().with_num_threads(4));
        let a = solver.solve(&graph, false).unwrap();
        let b = solver.solve(&graph, false).unwrap();
        assert_eq!(a.tour(), b.tour());
    }

    #[test]
    fn test_precancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let err = GreedySolver::default()
            .solve_with_cancellation(&four_city_graph(), false, &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_reports_progress_once() {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc;

        use crate::solver::ProgressUpdate;

        let calls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&calls);
        let solver = GreedySolver::default().with_progress(Arc::new(move |_: ProgressUpdate| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        solver.solve(&four_city_graph(), false).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

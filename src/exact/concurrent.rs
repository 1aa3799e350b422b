//! Task-parallel branch-and-bound.
//!
//! # Algorithm
//!
//! The search tree is split at the second city: one task per city `1..n`,
//! run on a fixed-size rayon pool. Each task walks its subtree depth-first,
//! extending and restoring a single path buffer in place. Near the root a
//! task with many candidates forks again, handing each child a copy of the
//! path; forked children are ordered by lower bound.
//!
//! Every task prunes against `min(local best, cached global best)`, where the
//! lower bound is the partial cost plus the two-cheapest-edges estimate for
//! the unvisited cities. Complete tours are offered to a shared
//! [`Incumbent`], which only accepts strictly better ones.
//!
//! Counters are kept per task and flushed into shared atomics periodically,
//! so the hot path touches no shared state apart from the incumbent's cost.
//!
//! # Complexity
//!
//! O(n!) nodes in the worst case, O(n) memory per task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{Incumbent, MAX_BITMASK_CITIES};
use crate::bound::{TwoMinEdges, UNUSABLE};
use crate::cancel::CancellationToken;
use crate::config::SolverConfig;
use crate::constructive::{best_of_all_starts, nearest_neighbor_tour};
use crate::error::{Result, TspError};
use crate::models::{Graph, Solution, Statistics};
use crate::solver::{ProgressCallback, ProgressReporter, TspSolver};

/// Parallel branch-and-bound sharing one incumbent across tasks.
///
/// Returns an optimal tour; among equally cheap tours the one returned may
/// vary between runs.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::config::SolverConfig;
/// use u_tsp::exact::ConcurrentBranchAndBound;
/// use u_tsp::TspSolver;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let solver = ConcurrentBranchAndBound::new(SolverConfig::default().with_num_threads(2));
/// let solution = solver.solve(&graph, true).unwrap();
/// assert!((solution.total_cost() - 80.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrentBranchAndBound {
    config: SolverConfig,
    progress: ProgressReporter,
}

impl Default for ConcurrentBranchAndBound {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl ConcurrentBranchAndBound {
    /// Creates a concurrent branch-and-bound solver.
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

impl TspSolver for ConcurrentBranchAndBound {
    fn name(&self) -> &'static str {
        "Concurrent Branch and Bound"
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
        let pool = self.config.thread_pool()?;
        info!(
            event = "solve_start",
            algorithm = self.name(),
            cities = n,
            pruning,
            threads = pool.current_num_threads(),
        );
        token.check()?;

        let (seed_tour, seed_cost) = if self.config.seed_with_greedy {
            pool.install(|| best_of_all_starts(graph, token))?
        } else {
            (Vec::new(), UNUSABLE)
        };
        if !seed_tour.is_empty() {
            stats.initial_bound = seed_cost;
        }

        let shared = Shared {
            graph,
            two_min: TwoMinEdges::compute(graph),
            incumbent: Incumbent::new(seed_cost, seed_tour),
            config: &self.config,
            progress: &self.progress,
            pruning,
            token,
            abort: AtomicBool::new(false),
            explored: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
        };

        let results: Vec<Result<()>> = pool.install(|| {
            (1..n)
                .into_par_iter()
                .map(|second| {
                    let cost = graph.get(0, second);
                    Task::new(&shared, vec![0, second], 1 | (1 << second)).run(cost)
                })
                .collect()
        });
        let outcome = TspError::aggregate(results);

        let Shared {
            incumbent,
            explored,
            pruned,
            ..
        } = shared;
        stats.record_explored_n(explored.into_inner());
        stats.record_pruned_n(pruned.into_inner());
        outcome?;

        let (_, mut tour) = incumbent.into_inner();
        if tour.is_empty() {
            warn!(
                event = "no_tour_closed",
                algorithm = self.name(),
                cities = n,
                "search ended without closing a tour, returning nearest-neighbor tour"
            );
            tour = nearest_neighbor_tour(graph, 0).0;
        }
        let cost = graph.path_cost(&tour);

        let per_task = (n + 1) * std::mem::size_of::<usize>() + std::mem::size_of::<Task<'_>>();
        stats.record_memory(
            (pool.current_num_threads() * per_task + n * std::mem::size_of::<f64>()) as u64,
        );
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

/// State shared read-only (apart from atomics and the incumbent) by all tasks.
struct Shared<'a> {
    graph: &'a Graph,
    two_min: TwoMinEdges,
    incumbent: Incumbent,
    config: &'a SolverConfig,
    progress: &'a ProgressReporter,
    pruning: bool,
    token: &'a CancellationToken,
    abort: AtomicBool,
    explored: AtomicU64,
    pruned: AtomicU64,
}

impl Shared<'_> {
    /// Returns `Err(Cancelled)` on caller cancellation and `Ok(true)` once a
    /// sibling task has failed.
    fn should_stop(&self) -> Result<bool> {
        self.token.check()?;
        Ok(self.abort.load(Ordering::Acquire))
    }

    fn lower_bound(&self, cost: f64, visited: u64) -> f64 {
        let n = self.graph.size();
        let all = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
        cost + self.two_min.bound(!visited & all)
    }
}

/// One depth-first walk over a subtree.
struct Task<'a> {
    shared: &'a Shared<'a>,
    path: Vec<usize>,
    visited: u64,
    local_best: f64,
    cached_global: f64,
    steps: u64,
    since_refresh: u64,
    unflushed_explored: u64,
    unflushed_pruned: u64,
}

impl<'a> Task<'a> {
    fn new(shared: &'a Shared<'a>, path: Vec<usize>, visited: u64) -> Self {
        let global = shared.incumbent.cost();
        let mut buffer = Vec::with_capacity(shared.graph.size() + 1);
        buffer.extend_from_slice(&path);
        Self {
            shared,
            path: buffer,
            visited,
            local_best: global,
            cached_global: global,
            steps: 0,
            since_refresh: 0,
            unflushed_explored: 0,
            unflushed_pruned: 0,
        }
    }

    fn run(mut self, cost: f64) -> Result<()> {
        let result = match self.shared.should_stop() {
            Ok(false) => self.explore(cost),
            Ok(true) => Ok(()),
            Err(err) => Err(err),
        };
        self.flush();
        if let Err(err) = &result {
            if !err.is_cancelled() {
                self.shared.abort.store(true, Ordering::Release);
            }
        }
        result
    }

    fn effective_bound(&self) -> f64 {
        self.local_best.min(self.cached_global)
    }

    fn explore(&mut self, cost: f64) -> Result<()> {
        let shared = self.shared;
        let config = shared.config;

        self.steps += 1;
        if self.steps % config.cancel_check_interval == 0 && shared.should_stop()? {
            return Ok(());
        }

        self.unflushed_explored += 1;
        self.since_refresh += 1;
        if self.since_refresh >= config.bound_refresh_interval {
            self.cached_global = shared.incumbent.cost();
            self.since_refresh = 0;
        }
        if self.unflushed_explored >= config.progress_interval {
            self.flush();
        }

        let n = shared.graph.size();
        if shared.pruning && shared.lower_bound(cost, self.visited) >= self.effective_bound() {
            self.unflushed_pruned += 1;
            return Ok(());
        }

        let last = self.path.last().copied().unwrap_or(0);
        if self.path.len() == n {
            let total = cost + shared.graph.get(last, 0);
            if total < self.local_best {
                self.local_best = total;
                self.path.push(0);
                if shared.incumbent.try_update(total, &self.path) {
                    debug!(event = "incumbent", cost = total);
                    self.cached_global = total;
                }
                self.path.pop();
            }
            return Ok(());
        }

        let candidates: Vec<usize> = (0..n).filter(|&c| self.visited & (1 << c) == 0).collect();
        if candidates.len() > config.fork_min_candidates && self.path.len() <= config.fork_max_depth
        {
            return self.fork(&candidates, cost);
        }

        for next in candidates {
            let next_cost = cost + shared.graph.get(last, next);
            let visited = self.visited | (1 << next);
            if shared.pruning && shared.lower_bound(next_cost, visited) >= self.effective_bound() {
                self.unflushed_pruned += 1;
                continue;
            }
            self.path.push(next);
            self.visited = visited;
            let result = self.explore(next_cost);
            self.visited &= !(1 << next);
            self.path.pop();
            result?;
        }
        Ok(())
    }

    /// Splits the remaining subtree into child tasks run on the pool.
    fn fork(&mut self, candidates: &[usize], cost: f64) -> Result<()> {
        let shared = self.shared;
        let last = self.path.last().copied().unwrap_or(0);
        let bound = self.effective_bound();

        let mut children = Vec::with_capacity(candidates.len());
        for &next in candidates {
            let next_cost = cost + shared.graph.get(last, next);
            let visited = self.visited | (1 << next);
            let lower = shared.lower_bound(next_cost, visited);
            if shared.pruning && lower >= bound {
                self.unflushed_pruned += 1;
                continue;
            }
            let mut path = self.path.clone();
            path.push(next);
            children.push((lower, path, visited, next_cost));
        }
        children.sort_by(|a, b| a.0.total_cmp(&b.0));

        let result = children
            .into_par_iter()
            .try_for_each(|(_, path, visited, next_cost)| {
                Task::new(shared, path, visited).run(next_cost)
            });
        self.cached_global = shared.incumbent.cost();
        result
    }

    fn flush(&mut self) {
        if self.unflushed_explored == 0 && self.unflushed_pruned == 0 {
            return;
        }
        let shared = self.shared;
        let explored =
            shared.explored.fetch_add(self.unflushed_explored, Ordering::Relaxed) + self.unflushed_explored;
        let pruned =
            shared.pruned.fetch_add(self.unflushed_pruned, Ordering::Relaxed) + self.unflushed_pruned;
        self.unflushed_explored = 0;
        self.unflushed_pruned = 0;
        shared
            .progress
            .report(explored, pruned, shared.incumbent.cost());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::exact::{BranchAndBound, HeldKarp};
    use crate::solver::ProgressUpdate;
    use crate::test_utils::{
        assert_valid_tour, four_city_graph, random_asymmetric_graph, random_symmetric_graph,
        triangle_graph,
    };

    fn solver(threads: usize) -> ConcurrentBranchAndBound {
        ConcurrentBranchAndBound::new(SolverConfig::default().with_num_threads(threads))
    }

    #[test]
    fn test_small_fixtures() {
        let sol = solver(2).solve(&triangle_graph(), true).unwrap();
        assert_eq!(sol.tour(), &[0, 1, 2, 0]);
        let sol = solver(2).solve(&four_city_graph(), false).unwrap();
        assert!((sol.total_cost() - 80.0).abs() < 1e-10);
        assert_valid_tour(sol.tour(), 4);
    }

    #[test]
    fn test_matches_sequential() {
        for seed in 0..4 {
            let graph = random_asymmetric_graph(9, 100, 100 + seed);
            let seq = BranchAndBound::default().solve(&graph, true).unwrap();
            let par = solver(4).solve(&graph, true).unwrap();
            assert!(par.total_cost() <= seq.total_cost() + 1e-9);
            assert!((par.total_cost() - seq.total_cost()).abs() < 1e-9);
            assert_valid_tour(par.tour(), 9);
            assert!((graph.path_cost(par.tour()) - par.total_cost()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_forking_path_matches_dp() {
        // 13 cities: root tasks have 11 candidates, so they fork
        let graph = random_symmetric_graph(13, 50, 21);
        let dp = HeldKarp::default().solve(&graph, false).unwrap();
        let par = solver(4).solve(&graph, true).unwrap();
        assert!((par.total_cost() - dp.total_cost()).abs() < 1e-9);
    }

    #[test]
    fn test_pruning_does_not_change_cost() {
        let graph = random_asymmetric_graph(8, 40, 5);
        let on = solver(3).solve(&graph, true).unwrap();
        let off = solver(3).solve(&graph, false).unwrap();
        assert!((on.total_cost() - off.total_cost()).abs() < 1e-9);
        assert_eq!(off.statistics().nodes_pruned, 0);
        assert!(on.statistics().nodes_explored <= off.statistics().nodes_explored);
    }

    #[test]
    fn test_without_seed() {
        let config = SolverConfig::default().with_num_threads(2).with_greedy_seed(false);
        let graph = random_symmetric_graph(7, 30, 6);
        let sol = ConcurrentBranchAndBound::new(config).solve(&graph, true).unwrap();
        let seq = BranchAndBound::default().solve(&graph, true).unwrap();
        assert!((sol.total_cost() - seq.total_cost()).abs() < 1e-9);
        assert_eq!(sol.statistics().initial_bound, 0.0);
    }

    #[test]
    fn test_explored_counts_every_node_without_pruning() {
        // 5 cities, no pruning: 4 + 4·3 + 4·3·2 + 4·3·2·1 nodes below the root
        let graph = random_symmetric_graph(5, 9, 2);
        let sol = solver(2).solve(&graph, false).unwrap();
        assert_eq!(sol.statistics().nodes_explored, 4 + 12 + 24 + 24);
    }

    #[test]
    fn test_memory_estimate_per_worker() {
        let sol = solver(2).solve(&random_symmetric_graph(5, 9, 2), true).unwrap();
        let per_task = 6 * std::mem::size_of::<usize>() + std::mem::size_of::<Task<'_>>();
        let expected = 2 * per_task + 5 * std::mem::size_of::<f64>();
        assert_eq!(sol.statistics().memory_used, expected as u64);
    }

    #[test]
    fn test_precancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let err = solver(2)
            .solve_with_cancellation(&four_city_graph(), true, &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_cancel_from_progress_callback() {
        let token = CancellationToken::new();
        let handle = token.clone();
        let cancelled_at = Arc::new(AtomicU64::new(0));
        let last_seen = Arc::new(AtomicU64::new(0));
        let (at, seen) = (Arc::clone(&cancelled_at), Arc::clone(&last_seen));
        let threads = 2;
        let interval = 100;
        // no forking: at most one running task per worker
        let config = SolverConfig::default()
            .with_num_threads(threads)
            .with_progress_interval(interval)
            .with_fork_policy(usize::MAX, 0);
        let solver = ConcurrentBranchAndBound::new(config).with_progress(Arc::new(
            move |update: ProgressUpdate| {
                seen.fetch_max(update.nodes_explored, Ordering::SeqCst);
                if update.nodes_explored >= 500
                    && at
                        .compare_exchange(0, update.nodes_explored, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    handle.cancel();
                }
            },
        ));
        let graph = random_symmetric_graph(12, 100, 8);
        let err = solver
            .solve_with_cancellation(&graph, false, &token)
            .unwrap_err();
        assert!(err.is_cancelled());

        // every worker polls on each step, so at most its unflushed batch
        // plus one in-flight node lands after the cancel
        let at = cancelled_at.load(Ordering::SeqCst);
        assert!(at >= 500);
        let slack = threads as u64 * (interval + 1);
        assert!(last_seen.load(Ordering::SeqCst) <= at + slack);
    }

    #[test]
    fn test_size_ceiling() {
        let graph = random_symmetric_graph(65, 10, 1);
        let err = solver(2).solve(&graph, true).unwrap_err();
        assert!(err.is_size_ceiling());
    }
}

//! Held–Karp bitmask dynamic programming.
//!
//! # Algorithm
//!
//! Fix city 0 as the origin. For every subset S of cities 1..n−1 and every
//! j ∈ S, `dp[S][j]` is the cheapest path that leaves 0, visits exactly S
//! and ends at j:
//!
//! ```text
//! dp[{j}][j] = c(0, j)
//! dp[S][j]   = min over k ∈ S \ {j} of dp[S \ {j}][k] + c(k, j)
//! optimum    = min over i of dp[Full][i] + c(i, 0)
//! ```
//!
//! Subsets are processed in order of size, so every level only reads the
//! level below it. From a configurable size on, all subsets of one level
//! are evaluated in parallel and committed together before the next level.
//! Ties go to the smallest predecessor and the smallest final city.
//!
//! # Complexity
//!
//! O(n² · 2ⁿ) time, O(n · 2ⁿ) memory.
//!
//! # Reference
//!
//! Held, M. & Karp, R.M. (1962). "A dynamic programming approach to
//! sequencing problems", *Journal of the Society for Industrial and Applied
//! Mathematics* 10(1), 196-210.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::bound::UNUSABLE;
use crate::cancel::CancellationToken;
use crate::config::SolverConfig;
use crate::error::{Result, TspError};
use crate::models::{Graph, Solution, Statistics};
use crate::solver::{ProgressCallback, ProgressReporter, TspSolver};

const NO_PRED: u8 = u8::MAX;

/// Dense DP table over subsets of cities 1..n−1.
///
/// City `c` owns bit `c − 1`; entries are stored row-major by subset.
struct DpTable {
    width: usize,
    cost: Vec<f64>,
    pred: Vec<u8>,
}

impl DpTable {
    fn new(n: usize) -> Self {
        let width = n - 1;
        let len = (1usize << width) * width;
        Self {
            width,
            cost: vec![UNUSABLE; len],
            pred: vec![NO_PRED; len],
        }
    }

    #[inline]
    fn index(&self, subset: u64, city: usize) -> usize {
        subset as usize * self.width + (city - 1)
    }

    #[inline]
    fn cost(&self, subset: u64, city: usize) -> f64 {
        self.cost[self.index(subset, city)]
    }

    fn set(&mut self, subset: u64, city: usize, cost: f64, pred: usize) {
        let i = self.index(subset, city);
        self.cost[i] = cost;
        self.pred[i] = pred as u8;
    }

    fn pred(&self, subset: u64, city: usize) -> Option<usize> {
        match self.pred[self.index(subset, city)] {
            NO_PRED => None,
            p => Some(p as usize),
        }
    }

    fn memory_bytes(&self) -> u64 {
        (self.cost.capacity() * std::mem::size_of::<f64>() + self.pred.capacity()) as u64
    }

    /// Best `(cost, predecessor)` for every city of `subset`, in ascending
    /// city order.
    fn relax(&self, graph: &Graph, subset: u64) -> Vec<(f64, usize)> {
        cities_of(subset)
            .map(|j| {
                let prev = subset & !bit(j);
                let mut best = (UNUSABLE, 0);
                for k in cities_of(prev) {
                    let c = self.cost(prev, k) + graph.get(k, j);
                    if c < best.0 {
                        best = (c, k);
                    }
                }
                best
            })
            .collect()
    }

    fn commit(&mut self, subset: u64, entries: &[(f64, usize)]) {
        for (j, &(cost, pred)) in cities_of(subset).zip(entries) {
            self.set(subset, j, cost, pred);
        }
    }
}

#[inline]
fn bit(city: usize) -> u64 {
    1u64 << (city - 1)
}

/// Cities (1-based) whose bits are set, ascending.
fn cities_of(subset: u64) -> impl Iterator<Item = usize> {
    let mut rest = subset;
    std::iter::from_fn(move || {
        if rest == 0 {
            return None;
        }
        let city = rest.trailing_zeros() as usize + 1;
        rest &= rest - 1;
        Some(city)
    })
}

/// All `size`-element subsets of `width` bits, in increasing numeric order.
fn subsets_of_size(width: usize, size: usize) -> impl Iterator<Item = u64> {
    let limit = 1u64 << width;
    let mut next = (size > 0).then(|| (1u64 << size) - 1);
    std::iter::from_fn(move || {
        let current = next.filter(|&s| s < limit)?;
        // Gosper's hack
        let low = current & current.wrapping_neg();
        let ripple = current + low;
        next = Some((((ripple ^ current) >> 2) / low) | ripple);
        Some(current)
    })
}

/// Exact dynamic-programming solver.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::exact::HeldKarp;
/// use u_tsp::TspSolver;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let solution = HeldKarp::default().solve(&graph, false).unwrap();
/// // ties go to the smallest final city, so the tour ends 1 → 0
/// assert_eq!(solution.tour(), &[0, 2, 3, 1, 0]);
/// assert_eq!(solution.total_cost(), 80.0);
/// ```
#[derive(Debug, Clone)]
pub struct HeldKarp {
    config: SolverConfig,
    progress: ProgressReporter,
}

impl Default for HeldKarp {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl HeldKarp {
    /// Creates a Held–Karp solver.
    pub fn new(config: SolverConfig) -> Self {
        let progress = ProgressReporter::new(None, config.progress_interval);
        Self { config, progress }
    }

    /// Sets the progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.set_progress_callback(callback);
        self
    }

    fn fill_sequential(
        &self,
        graph: &Graph,
        table: &mut DpTable,
        token: &CancellationToken,
        stats: &mut Statistics,
    ) -> Result<()> {
        let interval = self.config.cancel_check_interval;
        let mut processed = 0u64;
        for size in 2..=table.width {
            for subset in subsets_of_size(table.width, size) {
                if processed % interval == 0 {
                    token.check()?;
                }
                processed += 1;
                let entries = table.relax(graph, subset);
                table.commit(subset, &entries);
                stats.record_explored_n(size as u64);
            }
            self.progress.report(stats.nodes_explored, 0, UNUSABLE);
        }
        Ok(())
    }

    fn fill_parallel(
        &self,
        graph: &Graph,
        table: &mut DpTable,
        token: &CancellationToken,
        stats: &mut Statistics,
    ) -> Result<()> {
        let pool = self.config.thread_pool()?;
        let interval = self.config.cancel_check_interval as usize;
        for size in 2..=table.width {
            let subsets: Vec<u64> = subsets_of_size(table.width, size).collect();
            let level = &*table;
            let relaxed = pool.install(|| {
                subsets
                    .par_iter()
                    .enumerate()
                    .map(|(i, &subset)| -> Result<Vec<(f64, usize)>> {
                        if i % interval == 0 {
                            token.check()?;
                        }
                        Ok(level.relax(graph, subset))
                    })
                    .collect::<Result<Vec<_>>>()
            })?;
            for (&subset, entries) in subsets.iter().zip(&relaxed) {
                table.commit(subset, entries);
            }
            stats.record_explored_n((subsets.len() * size) as u64);
            self.progress.report(stats.nodes_explored, 0, UNUSABLE);
            debug!(event = "dp_level", size, subsets = subsets.len());
        }
        Ok(())
    }
}

impl TspSolver for HeldKarp {
    fn name(&self) -> &'static str {
        "Held-Karp"
    }

    fn solve_with_cancellation(
        &self,
        graph: &Graph,
        _pruning: bool,
        token: &CancellationToken,
    ) -> Result<Solution> {
        self.config.validate()?;
        let n = graph.size();
        let limit = self.config.held_karp_max_cities;
        if n > limit {
            return Err(TspError::SizeCeilingExceeded {
                algorithm: self.name(),
                cities: n,
                limit,
            });
        }

        let parallel = n >= self.config.held_karp_parallel_threshold;
        let mut stats = Statistics::started();
        info!(event = "solve_start", algorithm = self.name(), cities = n, parallel);
        token.check()?;

        let mut table = DpTable::new(n);
        stats.record_memory(table.memory_bytes());
        for j in 1..n {
            table.set(bit(j), j, graph.get(0, j), 0);
        }
        stats.record_explored_n((n - 1) as u64);

        if parallel {
            self.fill_parallel(graph, &mut table, token, &mut stats)?;
        } else {
            self.fill_sequential(graph, &mut table, token, &mut stats)?;
        }

        let full = (1u64 << table.width) - 1;
        let mut last = 1;
        let mut best = UNUSABLE;
        for i in 1..n {
            let c = table.cost(full, i) + graph.get(i, 0);
            if c < best {
                best = c;
                last = i;
            }
        }

        let tour = reconstruct(&table, full, last)?;
        let cost = graph.path_cost(&tour);

        stats.finish(cost);
        self.progress.report(stats.nodes_explored, 0, cost);
        info!(
            event = "solve_end",
            algorithm = self.name(),
            cost,
            entries = stats.nodes_explored,
            memory_bytes = stats.memory_used,
            duration_ms = stats.execution_time.as_millis() as u64,
        );

        Ok(Solution::new(tour, cost, stats, self.name()))
    }

    fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = ProgressReporter::new(Some(callback), self.config.progress_interval);
    }
}

/// Follows predecessors back from `(full, last)` to city 0.
fn reconstruct(table: &DpTable, full: u64, last: usize) -> Result<Vec<usize>> {
    let n = table.width + 1;
    let mut reversed = Vec::with_capacity(n + 1);
    reversed.push(0);

    let mut subset = full;
    let mut city = last;
    while subset != 0 {
        if subset & bit(city) == 0 || reversed.len() > n {
            return Err(TspError::InternalInconsistency(format!(
                "dp predecessor chain revisits city {city}"
            )));
        }
        reversed.push(city);
        let pred = table.pred(subset, city).ok_or_else(|| {
            TspError::InternalInconsistency(format!(
                "dp entry ({subset:#b}, {city}) has no predecessor"
            ))
        })?;
        subset &= !bit(city);
        if pred == 0 {
            break;
        }
        city = pred;
    }

    if subset != 0 || reversed.len() != n {
        return Err(TspError::InternalInconsistency(format!(
            "dp predecessor chain ended early with {} cities",
            reversed.len() - 1
        )));
    }
    reversed.push(0);
    reversed.reverse();
    Ok(reversed)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::exact::{BranchAndBound, BruteForce};
    use crate::solver::ProgressUpdate;
    use crate::test_utils::{
        assert_valid_tour, four_city_graph, random_asymmetric_graph, random_symmetric_graph,
        triangle_graph,
    };

    #[test]
    fn test_subsets_of_size() {
        let subsets: Vec<u64> = subsets_of_size(4, 2).collect();
        assert_eq!(subsets, vec![0b0011, 0b0101, 0b0110, 0b1001, 0b1010, 0b1100]);
        assert_eq!(subsets_of_size(5, 5).count(), 1);
        assert_eq!(subsets_of_size(3, 0).count(), 0);
    }

    #[test]
    fn test_cities_of() {
        assert_eq!(cities_of(0b1011).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(cities_of(0).count(), 0);
    }

    #[test]
    fn test_small_fixtures() {
        let sol = HeldKarp::default().solve(&triangle_graph(), false).unwrap();
        assert_eq!(sol.tour(), &[0, 1, 2, 0]);
        assert_eq!(sol.total_cost(), 48.0);
        let sol = HeldKarp::default().solve(&four_city_graph(), false).unwrap();
        assert_eq!(sol.total_cost(), 80.0);
    }

    #[test]
    fn test_matches_brute_force() {
        for n in 3..=9 {
            let graph = random_asymmetric_graph(n, 100, n as u64);
            let dp = HeldKarp::default().solve(&graph, false).unwrap();
            let bf = BruteForce::default().solve(&graph, false).unwrap();
            assert!((dp.total_cost() - bf.total_cost()).abs() < 1e-9, "n = {n}");
            assert_valid_tour(dp.tour(), n);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        for seed in 0..3 {
            let graph = random_symmetric_graph(11, 40, 500 + seed);
            let sequential = HeldKarp::new(SolverConfig::default().with_held_karp_parallel_threshold(20))
                .solve(&graph, false)
                .unwrap();
            let parallel = HeldKarp::new(
                SolverConfig::default()
                    .with_held_karp_parallel_threshold(3)
                    .with_num_threads(4),
            )
            .solve(&graph, false)
            .unwrap();
            assert_eq!(sequential.tour(), parallel.tour());
            assert_eq!(sequential.total_cost(), parallel.total_cost());
            assert_eq!(
                sequential.statistics().nodes_explored,
                parallel.statistics().nodes_explored
            );
        }
    }

    #[test]
    fn test_entry_count_and_memory() {
        // 5 cities: 4 base entries + Σ C(4, s)·s for s = 2..4
        let graph = random_symmetric_graph(5, 10, 3);
        let sol = HeldKarp::default().solve(&graph, false).unwrap();
        assert_eq!(sol.statistics().nodes_explored, 4 + 12 + 12 + 4);
        assert_eq!(sol.statistics().memory_used, (16 * 4 * 9) as u64);
    }

    #[test]
    fn test_size_ceiling() {
        let graph = random_symmetric_graph(21, 10, 1);
        let err = HeldKarp::default().solve(&graph, false).unwrap_err();
        assert!(matches!(
            err,
            TspError::SizeCeilingExceeded { cities: 21, limit: 20, .. }
        ));
    }

    #[test]
    fn test_precancelled() {
        let token = CancellationToken::new();
        token.cancel();
        for threshold in [3, 20] {
            let solver =
                HeldKarp::new(SolverConfig::default().with_held_karp_parallel_threshold(threshold));
            let err = solver
                .solve_with_cancellation(&four_city_graph(), false, &token)
                .unwrap_err();
            assert!(err.is_cancelled());
        }
    }

    #[test]
    fn test_cancel_between_levels() {
        for threshold in [3, 20] {
            let token = CancellationToken::new();
            let handle = token.clone();
            let reports = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&reports);
            let config = SolverConfig::default()
                .with_num_threads(2)
                .with_held_karp_parallel_threshold(threshold);
            let solver = HeldKarp::new(config).with_progress(Arc::new(move |u: ProgressUpdate| {
                sink.lock().unwrap().push(u.nodes_explored);
                handle.cancel();
            }));
            let graph = random_symmetric_graph(12, 50, 9);
            let err = solver
                .solve_with_cancellation(&graph, false, &token)
                .unwrap_err();
            assert!(err.is_cancelled());
            // base entries plus the size-2 level, then the first subset of
            // the next level polls the token
            assert_eq!(*reports.lock().unwrap(), vec![11 + 55 * 2]);
        }
    }

    #[test]
    fn test_matches_branch_and_bound_beyond_brute_force() {
        for n in 14..=16 {
            let graph = random_asymmetric_graph(n, 100, 900 + n as u64);
            let dp = HeldKarp::new(SolverConfig::default().with_num_threads(4))
                .solve(&graph, false)
                .unwrap();
            let bb = BranchAndBound::default().solve(&graph, true).unwrap();
            assert!((dp.total_cost() - bb.total_cost()).abs() < 1e-9, "n = {n}");
            assert_valid_tour(dp.tour(), n);
        }
    }

    #[test]
    fn test_broken_chain_detected() {
        let graph = four_city_graph();
        let table = DpTable::new(graph.size());
        let err = reconstruct(&table, 0b111, 1).unwrap_err();
        assert!(matches!(err, TspError::InternalInconsistency(_)));
    }
}

//! The solve interface shared by every algorithm, and progress reporting.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::models::{Graph, Solution};

/// A snapshot of search progress passed to a [`ProgressCallback`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Nodes explored so far.
    pub nodes_explored: u64,
    /// Nodes pruned so far.
    pub nodes_pruned: u64,
    /// Cost of the best complete tour known so far, or
    /// [`UNUSABLE`](crate::bound::UNUSABLE) while none is known.
    pub best_bound: f64,
}

/// Callback invoked with search progress.
///
/// This is the only coupling point to a monitoring or UI layer. It may be
/// called from worker threads.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// A TSP algorithm.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::exact::BranchAndBound;
/// use u_tsp::TspSolver;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let solution = BranchAndBound::default().solve(&graph, true).unwrap();
/// assert!((solution.total_cost() - 80.0).abs() < 1e-9);
/// assert_eq!(solution.tour().first(), solution.tour().last());
/// ```
pub trait TspSolver: Send + Sync {
    /// Human-readable algorithm name.
    fn name(&self) -> &'static str;

    /// Solves `graph` without a cancellation token.
    fn solve(&self, graph: &Graph, pruning: bool) -> Result<Solution> {
        self.solve_with_cancellation(graph, pruning, &CancellationToken::new())
    }

    /// Solves `graph`, polling `token` at bounded intervals.
    ///
    /// `pruning` only affects the branch-and-bound searches.
    fn solve_with_cancellation(
        &self,
        graph: &Graph,
        pruning: bool,
        token: &CancellationToken,
    ) -> Result<Solution>;

    /// Installs a progress callback.
    fn set_progress_callback(&mut self, callback: ProgressCallback);
}

/// Rate-limited progress emitter owned by a running search.
#[derive(Clone)]
pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
    interval: u64,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressCallback>, interval: u64) -> Self {
        Self {
            callback,
            interval: interval.max(1),
        }
    }

    /// Reports when `nodes_explored` lands on the configured cadence.
    pub(crate) fn tick(&self, nodes_explored: u64, nodes_pruned: u64, best_bound: f64) {
        if nodes_explored % self.interval == 0 {
            debug!(event = "progress", nodes_explored, nodes_pruned, best_bound);
            self.report(nodes_explored, nodes_pruned, best_bound);
        }
    }

    pub(crate) fn report(&self, nodes_explored: u64, nodes_pruned: u64, best_bound: f64) {
        if let Some(callback) = &self.callback {
            callback(ProgressUpdate {
                nodes_explored,
                nodes_pruned,
                best_bound,
            });
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_reporter_cadence() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |u: ProgressUpdate| {
            sink.lock().unwrap().push(u.nodes_explored);
        });
        let reporter = ProgressReporter::new(Some(callback), 3);
        for explored in 1..=10 {
            reporter.tick(explored, 0, 1.0);
        }
        assert_eq!(*seen.lock().unwrap(), vec![3, 6, 9]);
    }

    #[test]
    fn test_reporter_without_callback() {
        let reporter = ProgressReporter::new(None, 0);
        reporter.tick(5, 1, 2.0);
        reporter.report(5, 1, 2.0);
    }
}

//! Search statistics.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Counters and timers accumulated by a solver during one run.
///
/// `total_nodes_generated` always equals `nodes_explored + nodes_pruned`.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Statistics;
///
/// let mut stats = Statistics::default();
/// stats.start();
/// stats.record_explored();
/// stats.record_explored();
/// stats.record_pruned();
/// stats.finish(42.0);
///
/// assert_eq!(stats.nodes_explored, 2);
/// assert_eq!(stats.nodes_pruned, 1);
/// assert_eq!(stats.total_nodes_generated, 3);
/// assert_eq!(stats.best_cost, 42.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(skip)]
    start_time: Option<Instant>,
    /// Search nodes (or DP entries, or permutations) examined.
    pub nodes_explored: u64,
    /// Search nodes discarded by bounding.
    pub nodes_pruned: u64,
    /// `nodes_explored + nodes_pruned`.
    pub total_nodes_generated: u64,
    /// Wall-clock time of the run.
    pub execution_time: Duration,
    /// Estimated peak bytes held by the search structures.
    pub memory_used: u64,
    /// Cost of the returned tour.
    pub best_cost: f64,
    /// Cost of the heuristic tour that seeded the search, or 0 if unseeded.
    pub initial_bound: f64,
}

impl Statistics {
    /// Creates statistics with the clock already running.
    pub fn started() -> Self {
        let mut stats = Self::default();
        stats.start();
        stats
    }

    /// Marks the start of the run.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Returns the elapsed time since [`start`](Self::start).
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Stops the clock and records the final cost.
    pub fn finish(&mut self, best_cost: f64) {
        self.execution_time = self.elapsed();
        self.best_cost = best_cost;
    }

    /// Records one explored node.
    pub fn record_explored(&mut self) {
        self.record_explored_n(1);
    }

    /// Records one pruned node.
    pub fn record_pruned(&mut self) {
        self.record_pruned_n(1);
    }

    /// Records `count` explored nodes.
    pub fn record_explored_n(&mut self, count: u64) {
        self.nodes_explored += count;
        self.total_nodes_generated = self.nodes_explored + self.nodes_pruned;
    }

    /// Records `count` pruned nodes.
    pub fn record_pruned_n(&mut self, count: u64) {
        self.nodes_pruned += count;
        self.total_nodes_generated = self.nodes_explored + self.nodes_pruned;
    }

    /// Keeps the largest memory estimate seen.
    pub fn record_memory(&mut self, bytes: u64) {
        self.memory_used = self.memory_used.max(bytes);
    }

    /// Share of generated nodes that were pruned, in percent.
    pub fn pruning_percentage(&self) -> f64 {
        if self.total_nodes_generated == 0 {
            0.0
        } else {
            self.nodes_pruned as f64 / self.total_nodes_generated as f64 * 100.0
        }
    }

    /// How far the search improved on the seed tour, in percent of
    /// [`initial_bound`](Self::initial_bound). Zero when unseeded.
    pub fn improvement_percentage(&self) -> f64 {
        if self.initial_bound > 0.0 {
            (self.initial_bound - self.best_cost) / self.initial_bound * 100.0
        } else {
            0.0
        }
    }

    /// Generated nodes per second of execution time.
    pub fn nodes_per_second(&self) -> f64 {
        let secs = self.execution_time.as_secs_f64();
        if secs > 0.0 {
            self.total_nodes_generated as f64 / secs
        } else {
            0.0
        }
    }
}

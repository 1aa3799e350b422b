//! Solution type.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Statistics;

/// A closed tour returned by a solver.
///
/// The tour lists the first city again at the end. Every solver in this
/// crate returns tours that start at city 0.
///
/// # Examples
///
/// ```
/// use u_tsp::models::{Solution, Statistics};
///
/// let sol = Solution::new(vec![0, 2, 1, 0], 48.0, Statistics::default(), "Greedy");
/// assert_eq!(sol.num_cities(), 3);
/// assert_eq!(sol.cities(), &[0, 2, 1]);
/// assert_eq!(sol.path_string(), "0 → 2 → 1 → 0");
/// assert!((sol.average_edge_cost() - 16.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    tour: Vec<usize>,
    total_cost: f64,
    statistics: Statistics,
    algorithm: String,
}

impl Solution {
    /// Creates a solution from a closed tour and its cost.
    pub fn new(
        tour: Vec<usize>,
        total_cost: f64,
        statistics: Statistics,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            tour,
            total_cost,
            statistics,
            algorithm: algorithm.into(),
        }
    }

    /// The closed tour, first city repeated at the end.
    pub fn tour(&self) -> &[usize] {
        &self.tour
    }

    /// The tour without the closing city.
    pub fn cities(&self) -> &[usize] {
        match self.tour.split_last() {
            Some((_, open)) if self.is_closed() => open,
            _ => &self.tour,
        }
    }

    /// Total cost of the tour including the return edge.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Statistics collected while solving.
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Name of the algorithm that produced this solution.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Number of distinct cities visited.
    pub fn num_cities(&self) -> usize {
        self.cities().len()
    }

    /// Returns `true` if the tour ends where it starts.
    pub fn is_closed(&self) -> bool {
        self.tour.len() > 1 && self.tour.first() == self.tour.last()
    }

    /// Mean cost per edge of the tour.
    pub fn average_edge_cost(&self) -> f64 {
        let edges = self.tour.len().saturating_sub(1);
        if edges == 0 {
            0.0
        } else {
            self.total_cost / edges as f64
        }
    }

    /// Returns `true` if this tour is strictly cheaper than `other`.
    pub fn is_better_than(&self, other: &Solution) -> bool {
        self.total_cost < other.total_cost
    }

    /// The tour rendered as `0 → 1 → 2 → 0`.
    pub fn path_string(&self) -> String {
        self.tour
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (cost {:.2}, {} nodes in {:?})",
            self.algorithm,
            self.path_string(),
            self.total_cost,
            self.statistics.total_nodes_generated,
            self.statistics.execution_time
        )
    }
}

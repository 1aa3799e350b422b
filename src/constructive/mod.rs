//! Constructive heuristics for building tours.
//!
//! - [`nearest_neighbor_tour`] — Greedy nearest-neighbor tour from one start, O(n²)
//! - [`GreedySolver`] — Single- or multi-start nearest neighbor as a [`TspSolver`](crate::TspSolver)

mod nearest_neighbor;

pub(crate) use nearest_neighbor::best_of_all_starts;
pub use nearest_neighbor::{nearest_neighbor_tour, GreedySolver};

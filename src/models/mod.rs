//! Domain model types for the travelling salesman problem.
//!
//! Provides the validated cost matrix, the solution returned by every
//! solver, and the statistics gathered during a search.

mod graph;
mod solution;
mod statistics;

pub use graph::{Graph, GraphSummary};
pub use solution::Solution;
pub use statistics::Statistics;

//! # u-tsp
//!
//! Travelling salesman solver library providing exact and heuristic
//! algorithms over complete weighted graphs, with cooperative cancellation,
//! progress reporting and search statistics.
//!
//! ## Modules
//!
//! - [`models`] — Domain model types (Graph, Solution, Statistics)
//! - [`bound`] — Admissible lower bounds (matrix reduction, two cheapest edges)
//! - [`constructive`] — Nearest-neighbor heuristic, single- and multi-start
//! - [`exact`] — Branch-and-bound (sequential and concurrent), Held–Karp, brute force
//! - [`selector`] — Algorithm kinds, recommendations and size-ceiling fallback
//! - [`solver`] — The [`TspSolver`] trait and progress callbacks
//! - [`cancel`] — Cooperative cancellation token
//! - [`config`] — Solver tunables, loadable from TOML
//! - [`error`] — Error types
//!
//! ## Example
//!
//! ```
//! use u_tsp::{AlgorithmKind, AlgorithmSelector, CancellationToken, Graph, SolverConfig};
//!
//! let graph = Graph::new(&[
//!     vec![0.0, 10.0, 15.0, 20.0],
//!     vec![10.0, 0.0, 35.0, 25.0],
//!     vec![15.0, 35.0, 0.0, 30.0],
//!     vec![20.0, 25.0, 30.0, 0.0],
//! ]).unwrap();
//!
//! let selector = AlgorithmSelector::new(SolverConfig::default());
//! let token = CancellationToken::new();
//! let solution = selector
//!     .solve(AlgorithmKind::BranchAndBound, &graph, true, &token)
//!     .unwrap();
//!
//! assert_eq!(solution.total_cost(), 80.0);
//! println!("{solution}");
//! ```

pub mod bound;
pub mod cancel;
pub mod config;
pub mod constructive;
pub mod error;
pub mod exact;
pub mod models;
pub mod selector;
pub mod solver;

#[cfg(test)]
mod test_utils;

pub use cancel::CancellationToken;
pub use config::SolverConfig;
pub use error::{Result, TspError};
pub use models::{Graph, Solution, Statistics};
pub use selector::{AlgorithmKind, AlgorithmSelector};
pub use solver::{ProgressCallback, ProgressUpdate, TspSolver};

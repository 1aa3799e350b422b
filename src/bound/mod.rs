//! Admissible lower bounds for partial tours.
//!
//! - [`ReducedMatrix`] — Row/column matrix reduction (Little et al., 1963), O(n²) per node
//! - [`TwoMinEdges`] — Half the two cheapest incident edges per city, O(n) per query

mod reduction;
mod two_min;

pub use reduction::{bounded_add, is_unusable, ReducedMatrix, UNUSABLE};
pub use two_min::TwoMinEdges;

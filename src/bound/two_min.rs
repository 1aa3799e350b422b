//! Two-cheapest-edges lower bound.
//!
//! Every city on a tour has one incoming and one outgoing edge, so half the
//! sum of each remaining city's two cheapest incident edges bounds the cost
//! of finishing a partial tour from below. The per-city minima are computed
//! once per solve and shared read-only by all search tasks.
//!
//! # Complexity
//!
//! O(n²) to compute, O(popcount) per bound query.

use crate::models::Graph;

/// Per-city two-cheapest-edge table.
///
/// On symmetric graphs the minima come from each city's row. Otherwise they
/// are taken over the row and the column together, which keeps the bound
/// admissible when incoming and outgoing costs differ.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::bound::TwoMinEdges;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let table = TwoMinEdges::compute(&graph);
/// assert_eq!(table.city_bound(0), 12.5); // (10 + 15) / 2
/// assert!(table.bound(0b1111) <= 80.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TwoMinEdges {
    half_sums: Vec<f64>,
}

impl TwoMinEdges {
    /// Computes the table for `graph`.
    pub fn compute(graph: &Graph) -> Self {
        let n = graph.size();
        let symmetric = graph.is_symmetric(1e-9);

        let half_sums = (0..n)
            .map(|i| {
                let outgoing = (0..n).filter(|&j| j != i).map(|j| graph.get(i, j));
                let (a, b) = if symmetric {
                    two_smallest(outgoing)
                } else {
                    let incoming = (0..n).filter(|&j| j != i).map(|j| graph.get(j, i));
                    two_smallest(outgoing.chain(incoming))
                };
                (a + b) / 2.0
            })
            .collect();

        Self { half_sums }
    }

    /// Contribution of a single city.
    pub fn city_bound(&self, city: usize) -> f64 {
        self.half_sums[city]
    }

    /// Lower bound for the cities whose bits are set in `unvisited`.
    pub fn bound(&self, unvisited: u64) -> f64 {
        let mut mask = unvisited;
        let mut total = 0.0;
        while mask != 0 {
            let city = mask.trailing_zeros() as usize;
            if city >= self.half_sums.len() {
                break;
            }
            total += self.half_sums[city];
            mask &= mask - 1;
        }
        total
    }
}

fn two_smallest(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut first = f64::INFINITY;
    let mut second = f64::INFINITY;
    for v in values {
        if v < first {
            second = first;
            first = v;
        } else if v < second {
            second = v;
        }
    }
    (first, second)
}

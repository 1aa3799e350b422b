//! Matrix-reduction lower bound.
//!
//! # Algorithm
//!
//! Subtract each row's minimum from that row, then each column's minimum
//! from that column. Every tour uses exactly one entry per row and one per
//! column, so the sum of the subtracted minima is a lower bound on the cost
//! of any tour through the remaining usable entries.
//!
//! Forcing an edge `(from, to)` forbids the rest of row `from`, column `to`
//! and the reverse edge `to → from`. Reducing the resulting matrix again
//! exposes the additional cost that the forced edge implies.
//!
//! # Complexity
//!
//! O(n²) per reduction and per branch.
//!
//! # Reference
//!
//! Little, J.D.C., Murty, K.G., Sweeney, D.W. & Karel, C. (1963). "An
//! algorithm for the traveling salesman problem", *Operations Research*
//! 11(6), 972-989.

use crate::models::Graph;

/// Marks a forbidden or diagonal entry.
///
/// Large but finite, so arithmetic stays well defined.
pub const UNUSABLE: f64 = f64::MAX / 4.0;

/// Returns `true` if `value` is the sentinel (or beyond it).
#[inline]
pub fn is_unusable(value: f64) -> bool {
    value >= UNUSABLE
}

/// Adds two costs, saturating at [`UNUSABLE`].
///
/// # Examples
///
/// ```
/// use u_tsp::bound::{bounded_add, UNUSABLE};
///
/// assert_eq!(bounded_add(2.0, 3.0), 5.0);
/// assert_eq!(bounded_add(UNUSABLE, 1.0), UNUSABLE);
/// assert_eq!(bounded_add(UNUSABLE, UNUSABLE), UNUSABLE);
/// ```
#[inline]
pub fn bounded_add(a: f64, b: f64) -> f64 {
    if is_unusable(a) || is_unusable(b) {
        return UNUSABLE;
    }
    let sum = a + b;
    if is_unusable(sum) {
        UNUSABLE
    } else {
        sum
    }
}

/// Working cost matrix of a branch-and-bound node.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
/// use u_tsp::bound::ReducedMatrix;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let mut root = ReducedMatrix::from_graph(&graph);
/// let bound = root.reduce();
/// assert!(bound <= 80.0); // optimal tour costs 80
///
/// let (child, extra) = root.branch(0, 1);
/// assert!(bound + root.get(0, 1) + extra >= bound);
/// assert!(!child.is_usable(1, 0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedMatrix {
    data: Vec<f64>,
    size: usize,
}

impl ReducedMatrix {
    /// Copies the graph's weights with the diagonal marked unusable.
    pub fn from_graph(graph: &Graph) -> Self {
        let size = graph.size();
        let mut data = Vec::with_capacity(size * size);
        for i in 0..size {
            data.extend(
                graph
                    .row(i)
                    .iter()
                    .enumerate()
                    .map(|(j, &w)| if i == j { UNUSABLE } else { w }),
            );
        }
        Self { data, size }
    }

    /// Number of cities.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current (reduced) entry.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Returns `true` if the entry has not been forbidden.
    #[inline]
    pub fn is_usable(&self, from: usize, to: usize) -> bool {
        !is_unusable(self.get(from, to))
    }

    /// Forbids a single entry.
    pub fn forbid(&mut self, from: usize, to: usize) {
        self.data[from * self.size + to] = UNUSABLE;
    }

    /// Forbids every entry of a row.
    pub fn forbid_row(&mut self, row: usize) {
        let n = self.size;
        self.data[row * n..(row + 1) * n].fill(UNUSABLE);
    }

    /// Forbids every entry of a column.
    pub fn forbid_column(&mut self, col: usize) {
        for i in 0..self.size {
            self.forbid(i, col);
        }
    }

    /// Reduces rows then columns in place and returns the total reduction.
    ///
    /// Rows and columns with no usable entry are left untouched.
    pub fn reduce(&mut self) -> f64 {
        let n = self.size;
        let mut total = 0.0;

        for i in 0..n {
            let row = &mut self.data[i * n..(i + 1) * n];
            let min = row.iter().copied().fold(UNUSABLE, f64::min);
            if is_unusable(min) || min == 0.0 {
                continue;
            }
            for v in row.iter_mut().filter(|v| !is_unusable(**v)) {
                *v -= min;
            }
            total += min;
        }

        for j in 0..n {
            let min = (0..n).map(|i| self.get(i, j)).fold(UNUSABLE, f64::min);
            if is_unusable(min) || min == 0.0 {
                continue;
            }
            for i in 0..n {
                let v = &mut self.data[i * n + j];
                if !is_unusable(*v) {
                    *v -= min;
                }
            }
            total += min;
        }

        total
    }

    /// Forces the edge `from → to` on a copy and reduces it.
    ///
    /// Returns the child matrix and the additional reduction. The child's
    /// lower bound is `parent_bound + self.get(from, to) + additional`.
    pub fn branch(&self, from: usize, to: usize) -> (Self, f64) {
        let mut child = self.clone();
        child.forbid_row(from);
        child.forbid_column(to);
        child.forbid(to, from);
        let additional = child.reduce();
        (child, additional)
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_bytes(&self) -> u64 {
        (self.data.capacity() * std::mem::size_of::<f64>()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{four_city_graph, random_asymmetric_graph, triangle_graph};

    #[test]
    fn test_diagonal_unusable() {
        let m = ReducedMatrix::from_graph(&four_city_graph());
        for i in 0..4 {
            assert!(!m.is_usable(i, i));
        }
        assert_eq!(m.get(0, 1), 10.0);
    }

    #[test]
    fn test_reduce_triangle() {
        // rows give 10 + 12 + 18, then column 2 gives 5
        let mut m = ReducedMatrix::from_graph(&triangle_graph());
        let bound = m.reduce();
        assert!((bound - 45.0).abs() < 1e-10);
        assert_eq!(m.get(0, 2), 0.0);
        assert_eq!(m.get(1, 2), 3.0);
        assert!(bound <= 48.0);
    }

    #[test]
    fn test_reduced_rows_and_columns_have_zero() {
        let mut m = ReducedMatrix::from_graph(&random_asymmetric_graph(7, 50, 3));
        m.reduce();
        for i in 0..7 {
            assert!((0..7).any(|j| m.get(i, j) == 0.0));
            assert!((0..7).any(|j| m.get(j, i) == 0.0));
        }
    }

    #[test]
    fn test_branch_forbids_row_column_and_reverse() {
        let mut root = ReducedMatrix::from_graph(&four_city_graph());
        root.reduce();
        let (child, extra) = root.branch(1, 3);
        assert!(extra >= 0.0);
        for k in 0..4 {
            assert!(!child.is_usable(1, k));
            assert!(!child.is_usable(k, 3));
        }
        assert!(!child.is_usable(3, 1));
        assert!(child.is_usable(3, 2));
        // parent untouched
        assert!(root.is_usable(3, 1));
    }

    #[test]
    fn test_reduce_skips_empty_rows() {
        let mut m = ReducedMatrix::from_graph(&triangle_graph());
        m.forbid_row(0);
        m.forbid_column(1);
        let total = m.reduce();
        assert!(total < UNUSABLE);
        assert!(!m.is_usable(0, 2));
    }

    #[test]
    fn test_bounded_add_saturates() {
        assert_eq!(bounded_add(UNUSABLE * 0.75, UNUSABLE * 0.75), UNUSABLE);
        assert!(is_unusable(UNUSABLE));
        assert!(!is_unusable(1e300));
    }
}

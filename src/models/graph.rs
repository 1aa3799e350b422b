//! Dense, validated cost matrix.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TspError};

/// A complete weighted graph stored as a dense n×n matrix in row-major order.
///
/// Construction validates the matrix (n ≥ 3, square, finite, zero diagonal,
/// strictly positive off-diagonal weights) and copies it, so later changes
/// to the caller's data never reach a running search.
///
/// # Examples
///
/// ```
/// use u_tsp::models::Graph;
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0],
///     vec![12.0, 0.0, 20.0],
///     vec![18.0, 25.0, 0.0],
/// ]).unwrap();
/// assert_eq!(graph.size(), 3);
/// assert_eq!(graph.get(0, 1), 10.0);
/// assert!(!graph.is_symmetric(1e-9));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    data: Vec<f64>,
    size: usize,
}

/// Aggregate figures over the off-diagonal weights of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Number of cities.
    pub cities: usize,
    /// Number of directed edges (n·(n−1)).
    pub edges: usize,
    /// Cheapest edge weight.
    pub min_weight: f64,
    /// Most expensive edge weight.
    pub max_weight: f64,
    /// Mean edge weight.
    pub average_weight: f64,
}

impl Graph {
    /// Validates and copies a matrix given as rows.
    pub fn new(matrix: &[Vec<f64>]) -> Result<Self> {
        let size = matrix.len();
        if size == 0 {
            return Err(TspError::InvalidGraph("matrix is empty".into()));
        }
        if let Some((i, row)) = matrix.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(TspError::InvalidGraph(format!(
                "matrix is not square: row {i} has {} entries, expected {size}",
                row.len()
            )));
        }
        let data = matrix.iter().flatten().copied().collect();
        Self::from_data(size, data)
    }

    /// Validates a matrix given as a flat row-major vector.
    pub fn from_data(size: usize, data: Vec<f64>) -> Result<Self> {
        if size == 0 {
            return Err(TspError::InvalidGraph("matrix is empty".into()));
        }
        if data.len() != size * size {
            return Err(TspError::InvalidGraph(format!(
                "matrix is not square: {} entries for {size} cities",
                data.len()
            )));
        }
        if size < 3 {
            return Err(TspError::InvalidGraph(format!(
                "at least 3 cities are required, got {size}"
            )));
        }
        let graph = Self { data, size };
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<()> {
        for i in 0..self.size {
            for j in 0..self.size {
                let w = self.get(i, j);
                if !w.is_finite() {
                    return Err(TspError::InvalidGraph(format!(
                        "weight ({i}, {j}) is not finite"
                    )));
                }
                if w < 0.0 {
                    return Err(TspError::InvalidGraph(format!(
                        "weight ({i}, {j}) is negative: {w}"
                    )));
                }
                if i == j && w != 0.0 {
                    return Err(TspError::InvalidGraph(format!(
                        "diagonal entry ({i}, {i}) must be zero, got {w}"
                    )));
                }
                if i != j && w == 0.0 {
                    return Err(TspError::InvalidGraph(format!(
                        "edge ({i}, {j}) has zero weight"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the cost of travelling from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Number of cities.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Outgoing weights of city `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// Returns a copy of the matrix as rows.
    pub fn to_matrix(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.size).map(<[f64]>::to_vec).collect()
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Returns the cheapest destination from `from` among `candidates`.
    ///
    /// Ties go to the candidate listed first. Returns `None` if `candidates`
    /// is empty.
    pub fn nearest_neighbor(&self, from: usize, candidates: &[usize]) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .min_by(|&a, &b| self.get(from, a).total_cmp(&self.get(from, b)))
    }

    /// Sum of the edges between consecutive cities of `path`.
    ///
    /// A closed tour must repeat its first city at the end to include the
    /// return edge.
    pub fn path_cost(&self, path: &[usize]) -> f64 {
        path.windows(2).map(|w| self.get(w[0], w[1])).sum()
    }

    /// Returns aggregate figures over the off-diagonal weights.
    pub fn summary(&self) -> GraphSummary {
        let mut min_weight = f64::INFINITY;
        let mut max_weight = 0.0_f64;
        let mut total = 0.0;
        for i in 0..self.size {
            for j in 0..self.size {
                if i == j {
                    continue;
                }
                let w = self.get(i, j);
                min_weight = min_weight.min(w);
                max_weight = max_weight.max(w);
                total += w;
            }
        }
        let edges = self.size * (self.size - 1);
        GraphSummary {
            cities: self.size,
            edges,
            min_weight,
            max_weight,
            average_weight: total / edges as f64,
        }
    }
}

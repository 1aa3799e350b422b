//! Shared fixtures for unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Graph;

/// Symmetric 4-city instance with optimal tour cost 80 (0 → 1 → 3 → 2 → 0).
pub fn four_city_graph() -> Graph {
    Graph::new(&[
        vec![0.0, 10.0, 15.0, 20.0],
        vec![10.0, 0.0, 35.0, 25.0],
        vec![15.0, 35.0, 0.0, 30.0],
        vec![20.0, 25.0, 30.0, 0.0],
    ])
    .unwrap()
}

/// Asymmetric 3-city instance with optimal tour cost 48 (0 → 1 → 2 → 0).
pub fn triangle_graph() -> Graph {
    Graph::new(&[
        vec![0.0, 10.0, 15.0],
        vec![12.0, 0.0, 20.0],
        vec![18.0, 25.0, 0.0],
    ])
    .unwrap()
}

/// Symmetric instance with integer weights in `1..=max`, reproducible per seed.
pub fn random_symmetric_graph(n: usize, max: u32, seed: u64) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let w = f64::from(rng.random_range(1..=max));
            rows[i][j] = w;
            rows[j][i] = w;
        }
    }
    Graph::new(&rows).unwrap()
}

/// Asymmetric instance with integer weights in `1..=max`, reproducible per seed.
pub fn random_asymmetric_graph(n: usize, max: u32, seed: u64) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        0.0
                    } else {
                        f64::from(rng.random_range(1..=max))
                    }
                })
                .collect()
        })
        .collect();
    Graph::new(&rows).unwrap()
}

/// Checks that `tour` is closed at city 0 and visits every city exactly once.
pub fn assert_valid_tour(tour: &[usize], n: usize) {
    assert_eq!(tour.len(), n + 1, "tour {tour:?} has wrong length");
    assert_eq!(tour[0], 0, "tour {tour:?} does not start at 0");
    assert_eq!(tour[n], 0, "tour {tour:?} is not closed");
    let mut seen = vec![false; n];
    for &c in &tour[..n] {
        assert!(c < n, "city {c} out of range");
        assert!(!seen[c], "city {c} visited twice in {tour:?}");
        seen[c] = true;
    }
}

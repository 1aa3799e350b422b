//! Exact TSP solvers.
//!
//! - [`BranchAndBound`] — Best-first branch-and-bound with matrix reduction (Little et al., 1963)
//! - [`ConcurrentBranchAndBound`] — Task-parallel depth-first branch-and-bound with a shared [`Incumbent`]
//! - [`HeldKarp`] — Bitmask dynamic programming (Held & Karp, 1962), O(n² · 2ⁿ)
//! - [`BruteForce`] — Exhaustive enumeration, O(n!)

mod branch_and_bound;
mod brute_force;
mod concurrent;
mod held_karp;
mod incumbent;

pub use branch_and_bound::BranchAndBound;
pub use brute_force::BruteForce;
pub use concurrent::ConcurrentBranchAndBound;
pub use held_karp::HeldKarp;
pub use incumbent::Incumbent;

/// Largest instance the `u64` visited mask of the branch-and-bound searches can hold.
pub const MAX_BITMASK_CITIES: usize = 64;

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::SolverConfig;
    use crate::constructive::GreedySolver;
    use crate::models::Graph;
    use crate::solver::TspSolver;
    use crate::test_utils::assert_valid_tour;

    fn graph_strategy() -> impl Strategy<Value = Graph> {
        (3usize..=7).prop_flat_map(|n| {
            prop::collection::vec(1u32..=100, n * n).prop_map(move |weights| {
                let data = weights
                    .iter()
                    .enumerate()
                    .map(|(k, &w)| if k / n == k % n { 0.0 } else { f64::from(w) })
                    .collect();
                Graph::from_data(n, data).unwrap()
            })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_exact_methods_agree(graph in graph_strategy()) {
            let n = graph.size();
            let config = SolverConfig::default().with_num_threads(2);
            let bf = BruteForce::new(config.clone()).solve(&graph, false).unwrap();
            let dp = HeldKarp::new(config.clone()).solve(&graph, false).unwrap();
            let bb_on = BranchAndBound::new(config.clone()).solve(&graph, true).unwrap();
            let bb_off = BranchAndBound::new(config.clone()).solve(&graph, false).unwrap();
            let par = ConcurrentBranchAndBound::new(config).solve(&graph, true).unwrap();

            for sol in [&dp, &bb_on, &bb_off, &par] {
                prop_assert!((sol.total_cost() - bf.total_cost()).abs() < 1e-9);
                assert_valid_tour(sol.tour(), n);
                prop_assert!((graph.path_cost(sol.tour()) - sol.total_cost()).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_greedy_is_valid_upper_bound(graph in graph_strategy()) {
            let n = graph.size();
            let greedy = GreedySolver::new(SolverConfig::default().with_greedy_parallel_threshold(3))
                .solve(&graph, false)
                .unwrap();
            let dp = HeldKarp::default().solve(&graph, false).unwrap();
            assert_valid_tour(greedy.tour(), n);
            prop_assert!(greedy.total_cost() >= dp.total_cost() - 1e-9);
        }
    }
}

//! Algorithm selection and size-ceiling fallback.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cancel::CancellationToken;
use crate::config::{ConfigError, SolverConfig};
use crate::constructive::GreedySolver;
use crate::error::Result;
use crate::exact::{BranchAndBound, BruteForce, ConcurrentBranchAndBound, HeldKarp};
use crate::models::{Graph, Solution};
use crate::solver::{ProgressCallback, TspSolver};

/// The algorithms this crate provides.
///
/// # Examples
///
/// ```
/// use u_tsp::selector::AlgorithmKind;
///
/// assert_eq!(AlgorithmKind::recommend(6), AlgorithmKind::BruteForce);
/// assert_eq!(AlgorithmKind::recommend(14), AlgorithmKind::HeldKarp);
/// assert_eq!(AlgorithmKind::recommend(200), AlgorithmKind::Greedy);
///
/// let kind: AlgorithmKind = "held_karp".parse().unwrap();
/// assert_eq!(kind.to_string(), "Held-Karp");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    /// Exhaustive enumeration.
    BruteForce,
    /// Bitmask dynamic programming.
    HeldKarp,
    /// Sequential best-first branch-and-bound.
    BranchAndBound,
    /// Task-parallel branch-and-bound.
    ConcurrentBranchAndBound,
    /// Nearest-neighbor heuristic.
    Greedy,
}

impl AlgorithmKind {
    /// Every kind, exact methods first.
    pub const ALL: [AlgorithmKind; 5] = [
        AlgorithmKind::BruteForce,
        AlgorithmKind::HeldKarp,
        AlgorithmKind::BranchAndBound,
        AlgorithmKind::ConcurrentBranchAndBound,
        AlgorithmKind::Greedy,
    ];

    /// Display name, identical to the solver's [`TspSolver::name`].
    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::BruteForce => "Brute Force",
            AlgorithmKind::HeldKarp => "Held-Karp",
            AlgorithmKind::BranchAndBound => "Branch and Bound",
            AlgorithmKind::ConcurrentBranchAndBound => "Concurrent Branch and Bound",
            AlgorithmKind::Greedy => "Greedy",
        }
    }

    /// Stable identifier used in configuration files.
    pub fn key(self) -> &'static str {
        match self {
            AlgorithmKind::BruteForce => "brute_force",
            AlgorithmKind::HeldKarp => "held_karp",
            AlgorithmKind::BranchAndBound => "branch_and_bound",
            AlgorithmKind::ConcurrentBranchAndBound => "concurrent_branch_and_bound",
            AlgorithmKind::Greedy => "greedy",
        }
    }

    /// One-line summary of guarantees and cost.
    pub fn description(self) -> &'static str {
        match self {
            AlgorithmKind::BruteForce => {
                "Exact. Examines every permutation; practical up to about 10 cities. O(n!)"
            }
            AlgorithmKind::HeldKarp => {
                "Exact. Dynamic programming over city subsets; practical up to about 20 cities. O(n² · 2ⁿ)"
            }
            AlgorithmKind::BranchAndBound => {
                "Exact. Best-first search pruned by matrix-reduction bounds; practical up to about 25 cities."
            }
            AlgorithmKind::ConcurrentBranchAndBound => {
                "Exact. Parallel depth-first search sharing the best tour; practical up to about 20 cities."
            }
            AlgorithmKind::Greedy => {
                "Heuristic. Always travels to the nearest unvisited city; no optimality guarantee. O(n²)"
            }
        }
    }

    /// Largest instance the method handles in reasonable time.
    pub fn practical_limit(self) -> usize {
        match self {
            AlgorithmKind::BruteForce => 10,
            AlgorithmKind::HeldKarp => 20,
            AlgorithmKind::BranchAndBound => 25,
            AlgorithmKind::ConcurrentBranchAndBound => 20,
            AlgorithmKind::Greedy => usize::MAX,
        }
    }

    /// Suggests a method for an instance of `cities` cities.
    pub fn recommend(cities: usize) -> Self {
        match cities {
            0..=8 => AlgorithmKind::BruteForce,
            9..=15 => AlgorithmKind::HeldKarp,
            16..=25 => AlgorithmKind::BranchAndBound,
            26..=50 => AlgorithmKind::ConcurrentBranchAndBound,
            _ => AlgorithmKind::Greedy,
        }
    }

    /// Returns `true` if the method always returns an optimal tour.
    pub fn is_exact(self) -> bool {
        !matches!(self, AlgorithmKind::Greedy)
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = ConfigError;

    /// Accepts either the [`key`](Self::key) or the display name, ignoring case.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        AlgorithmKind::ALL
            .into_iter()
            .find(|k| k.key().eq_ignore_ascii_case(wanted) || k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::Invalid(format!("unknown algorithm: {s}")))
    }
}

/// Builds solvers by kind and falls back to greedy on size ceilings.
///
/// # Examples
///
/// ```
/// use u_tsp::cancel::CancellationToken;
/// use u_tsp::config::SolverConfig;
/// use u_tsp::models::Graph;
/// use u_tsp::selector::{AlgorithmKind, AlgorithmSelector};
///
/// let graph = Graph::new(&[
///     vec![0.0, 10.0, 15.0, 20.0],
///     vec![10.0, 0.0, 35.0, 25.0],
///     vec![15.0, 35.0, 0.0, 30.0],
///     vec![20.0, 25.0, 30.0, 0.0],
/// ]).unwrap();
///
/// let selector = AlgorithmSelector::new(SolverConfig::default().with_held_karp_max_cities(3));
/// let token = CancellationToken::new();
///
/// // too large for the configured ceiling, so greedy answers instead
/// let solution = selector.solve(AlgorithmKind::HeldKarp, &graph, true, &token).unwrap();
/// assert_eq!(solution.algorithm(), "Greedy");
/// ```
#[derive(Clone, Default)]
pub struct AlgorithmSelector {
    config: SolverConfig,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for AlgorithmSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmSelector")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl AlgorithmSelector {
    /// Creates a selector whose solvers share `config`.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Installs a progress callback on every solver this selector creates.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// The configuration handed to created solvers.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Builds a solver for `kind`.
    pub fn create(&self, kind: AlgorithmKind) -> Box<dyn TspSolver> {
        let config = self.config.clone();
        let mut solver: Box<dyn TspSolver> = match kind {
            AlgorithmKind::BruteForce => Box::new(BruteForce::new(config)),
            AlgorithmKind::HeldKarp => Box::new(HeldKarp::new(config)),
            AlgorithmKind::BranchAndBound => Box::new(BranchAndBound::new(config)),
            AlgorithmKind::ConcurrentBranchAndBound => {
                Box::new(ConcurrentBranchAndBound::new(config))
            }
            AlgorithmKind::Greedy => Box::new(GreedySolver::new(config)),
        };
        if let Some(callback) = &self.progress {
            solver.set_progress_callback(callback.clone());
        }
        solver
    }

    /// Solves with `kind`, substituting greedy when the instance exceeds the
    /// method's size ceiling.
    pub fn solve(
        &self,
        kind: AlgorithmKind,
        graph: &Graph,
        pruning: bool,
        token: &CancellationToken,
    ) -> Result<Solution> {
        match self.create(kind).solve_with_cancellation(graph, pruning, token) {
            Err(err) if err.is_size_ceiling() => {
                warn!(
                    event = "fallback",
                    requested = kind.key(),
                    cities = graph.size(),
                    reason = %err,
                    "falling back to greedy"
                );
                self.create(AlgorithmKind::Greedy)
                    .solve_with_cancellation(graph, pruning, token)
            }
            other => other,
        }
    }

    /// Solves with the kind [`recommend`](AlgorithmKind::recommend)ed for the
    /// graph's size.
    pub fn solve_recommended(
        &self,
        graph: &Graph,
        pruning: bool,
        token: &CancellationToken,
    ) -> Result<Solution> {
        self.solve(AlgorithmKind::recommend(graph.size()), graph, pruning, token)
    }
}

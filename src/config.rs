//! Solver configuration.
//!
//! Tunables for progress cadence, cancellation polling, fork heuristics and
//! size ceilings. Every field has a default, so a TOML file only needs the
//! keys it changes.
//!
//! # Examples
//!
//! ```
//! use u_tsp::config::SolverConfig;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     num_threads = 4
//!     progress_interval = 500
//!     held_karp_max_cities = 16
//! "#).unwrap();
//!
//! assert_eq!(config.num_threads, Some(4));
//! assert_eq!(config.progress_interval, 500);
//! assert_eq!(config.fork_max_depth, 2); // default
//! ```

use std::path::Path;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TspError;

/// Largest Held–Karp ceiling the dense DP table is allowed to reach.
pub const HELD_KARP_HARD_LIMIT: usize = 24;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables shared by all solvers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SolverConfig {
    /// Worker pool size; `None` lets rayon pick one thread per core.
    pub num_threads: Option<usize>,
    /// Explored nodes between progress callbacks.
    pub progress_interval: u64,
    /// Search steps between cancellation polls in the parallel walk and DP.
    pub cancel_check_interval: u64,
    /// Explored nodes between refreshes of a task's cached global bound.
    pub bound_refresh_interval: u64,
    /// A task forks only when it has more candidates than this.
    pub fork_min_candidates: usize,
    /// A task forks only while the path is at most this long.
    pub fork_max_depth: usize,
    /// Seed branch-and-bound with a nearest-neighbor tour.
    pub seed_with_greedy: bool,
    /// Largest instance Held–Karp accepts.
    pub held_karp_max_cities: usize,
    /// Held–Karp computes each subset level in parallel from this size on.
    pub held_karp_parallel_threshold: usize,
    /// Multi-start greedy runs in parallel from this size on.
    pub greedy_parallel_threshold: usize,
    /// Largest instance brute force accepts.
    pub brute_force_max_cities: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            progress_interval: 1000,
            cancel_check_interval: 1,
            bound_refresh_interval: 1000,
            fork_min_candidates: 8,
            fork_max_depth: 2,
            seed_with_greedy: true,
            held_karp_max_cities: 20,
            held_karp_parallel_threshold: 12,
            greedy_parallel_threshold: 10,
            brute_force_max_cities: 10,
        }
    }
}

impl SolverConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read, contains invalid TOML, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every tunable is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == Some(0) {
            return Err(ConfigError::Invalid("num_threads must be positive".into()));
        }
        for (name, value) in [
            ("progress_interval", self.progress_interval),
            ("cancel_check_interval", self.cancel_check_interval),
            ("bound_refresh_interval", self.bound_refresh_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if self.held_karp_max_cities > HELD_KARP_HARD_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "held_karp_max_cities must be at most {HELD_KARP_HARD_LIMIT}, got {}",
                self.held_karp_max_cities
            )));
        }
        Ok(())
    }

    /// Sets the worker pool size.
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Sets the number of explored nodes between progress callbacks.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Sets the number of steps between cancellation polls.
    pub fn with_cancel_check_interval(mut self, interval: u64) -> Self {
        self.cancel_check_interval = interval;
        self
    }

    /// Sets the number of nodes between global-bound refreshes.
    pub fn with_bound_refresh_interval(mut self, interval: u64) -> Self {
        self.bound_refresh_interval = interval;
        self
    }

    /// Sets the fork heuristic of the concurrent search.
    pub fn with_fork_policy(mut self, min_candidates: usize, max_depth: usize) -> Self {
        self.fork_min_candidates = min_candidates;
        self.fork_max_depth = max_depth;
        self
    }

    /// Enables or disables the nearest-neighbor upper-bound seed.
    pub fn with_greedy_seed(mut self, enabled: bool) -> Self {
        self.seed_with_greedy = enabled;
        self
    }

    /// Sets the Held–Karp size ceiling.
    pub fn with_held_karp_max_cities(mut self, cities: usize) -> Self {
        self.held_karp_max_cities = cities;
        self
    }

    /// Sets the size from which Held–Karp runs each level in parallel.
    pub fn with_held_karp_parallel_threshold(mut self, cities: usize) -> Self {
        self.held_karp_parallel_threshold = cities;
        self
    }

    /// Sets the size from which greedy runs every start city in parallel.
    pub fn with_greedy_parallel_threshold(mut self, cities: usize) -> Self {
        self.greedy_parallel_threshold = cities;
        self
    }

    /// Sets the brute-force size ceiling.
    pub fn with_brute_force_max_cities(mut self, cities: usize) -> Self {
        self.brute_force_max_cities = cities;
        self
    }

    /// Builds the fixed-size worker pool used by the parallel solvers.
    pub(crate) fn thread_pool(&self) -> Result<ThreadPool, TspError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("u-tsp-worker-{i}"));
        if let Some(threads) = self.num_threads {
            builder = builder.num_threads(threads);
        }
        builder
            .build()
            .map_err(|e| TspError::ThreadPool(e.to_string()))
    }
}

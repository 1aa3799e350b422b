//! Error types for TSP solving.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced while validating input or running a solver.
#[derive(Debug, Error)]
pub enum TspError {
    /// The input matrix violates the graph preconditions.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// The instance is too large for the requested exact method.
    #[error("{algorithm} supports at most {limit} cities, got {cities}")]
    SizeCeilingExceeded {
        /// Name of the algorithm that refused the instance.
        algorithm: &'static str,
        /// Number of cities in the instance.
        cities: usize,
        /// Largest supported instance.
        limit: usize,
    },

    /// The search was cancelled through its token.
    #[error("search was cancelled")]
    Cancelled,

    /// The search reached a state that its invariants rule out.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// One or more parallel subtasks failed.
    #[error("{failed} search task(s) failed; first failure: {first}")]
    TaskFailed {
        /// Number of failed subtasks.
        failed: usize,
        /// The first failure observed.
        first: Box<TspError>,
    },

    /// The worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Solver configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TspError {
    /// Returns `true` if this error is a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TspError::Cancelled)
    }

    /// Returns `true` if this error asks the caller to fall back to a heuristic.
    pub fn is_size_ceiling(&self) -> bool {
        matches!(self, TspError::SizeCeilingExceeded { .. })
    }

    /// Folds the results of parallel subtasks into one outcome.
    ///
    /// Cancellation wins over every other failure so callers can render it
    /// as "cancelled" rather than "error".
    pub(crate) fn aggregate<I>(results: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<()>>,
    {
        let mut failed = 0;
        let mut first = None;
        let mut cancelled = false;

        for result in results {
            match result {
                Ok(()) => {}
                Err(TspError::Cancelled) => cancelled = true,
                Err(err) => {
                    failed += 1;
                    first.get_or_insert(err);
                }
            }
        }

        if cancelled {
            return Err(TspError::Cancelled);
        }
        match first {
            None => Ok(()),
            Some(err) => Err(TspError::TaskFailed {
                failed,
                first: Box::new(err),
            }),
        }
    }
}

/// Result type alias for TSP operations.
pub type Result<T> = std::result::Result<T, TspError>;

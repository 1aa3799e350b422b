//! Shared best-known tour for the concurrent search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Best complete tour found so far, shared by all search tasks.
///
/// Cost and tour live together behind one mutex, so a reader never sees a
/// cost paired with another task's tour. The cost is mirrored in an atomic
/// for lock-free pruning reads; the mirror is only written while the lock is
/// held, and only ever decreases.
///
/// # Examples
///
/// ```
/// use u_tsp::exact::Incumbent;
///
/// let best = Incumbent::new(100.0, vec![0, 1, 2, 0]);
/// assert!(best.try_update(90.0, &[0, 2, 1, 0]));
/// assert!(!best.try_update(90.0, &[0, 1, 2, 0])); // must be strictly better
/// assert_eq!(best.cost(), 90.0);
/// assert_eq!(best.snapshot(), (90.0, vec![0, 2, 1, 0]));
/// ```
#[derive(Debug)]
pub struct Incumbent {
    cost_bits: AtomicU64,
    best: Mutex<(f64, Vec<usize>)>,
}

impl Incumbent {
    /// Creates an incumbent holding a seed tour.
    pub fn new(cost: f64, tour: Vec<usize>) -> Self {
        Self {
            cost_bits: AtomicU64::new(cost.to_bits()),
            best: Mutex::new((cost, tour)),
        }
    }

    /// Current best cost, without locking.
    #[inline]
    pub fn cost(&self) -> f64 {
        f64::from_bits(self.cost_bits.load(Ordering::Acquire))
    }

    /// Replaces the incumbent if `cost` is strictly lower.
    ///
    /// Returns `true` if the tour was stored.
    pub fn try_update(&self, cost: f64, tour: &[usize]) -> bool {
        if cost >= self.cost() {
            return false;
        }
        let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        if cost >= best.0 {
            return false;
        }
        best.0 = cost;
        best.1.clear();
        best.1.extend_from_slice(tour);
        self.cost_bits.store(cost.to_bits(), Ordering::Release);
        true
    }

    /// Copies the current cost and tour.
    pub fn snapshot(&self) -> (f64, Vec<usize>) {
        let best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        (best.0, best.1.clone())
    }

    /// Takes the final cost and tour.
    pub fn into_inner(self) -> (f64, Vec<usize>) {
        self.best.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Newtype wrappers and type aliases for domain concepts.
//!
//! Worker identities are newtyped so they cannot be confused with PCB
//! slot indices or tick counts. Plain quantities (ticks, burst lengths)
//! are type aliases.

use std::fmt;

/// Stable identity of a simulated workload. Equal to its PCB index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl WorkerId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical CPU time. Tick 0 is the initialization phase; the first
/// scheduling step is tick 1.
pub type Tick = u64;

/// Ticks of CPU work, signed so a worker's countdown can be compared
/// against zero after decrementing.
pub type Burst = i32;

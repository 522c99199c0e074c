//! Read-path probe cadence.
//!
//! Reads are allowed to run on a possibly stale connection, but every Nth
//! read pays for one cheap role recheck so drift is noticed within a bounded
//! number of statements.

use std::sync::atomic::{AtomicU64, Ordering};

/// Recheck the active connection's role once every this many reads.
pub const CHECK_EVERY_N_READS: u64 = 10;

/// Counts read statements since the router started.
///
/// Never reset; the counter wraps on overflow and only its value modulo the
/// cadence matters.
#[derive(Debug)]
pub struct SelectCounter {
    reads: AtomicU64,
    every: u64,
}

impl SelectCounter {
    /// Create a counter that comes due every `every` reads (at least 1).
    pub fn new(every: u64) -> Self {
        Self {
            reads: AtomicU64::new(0),
            every: every.max(1),
        }
    }

    /// Count one read and report whether a role recheck is due.
    pub fn record_read(&self) -> bool {
        let count = self.reads.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        count % self.every == 0
    }

    /// Reads recorded so far (modulo 2^64).
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// The configured cadence.
    pub fn every(&self) -> u64 {
        self.every
    }
}

impl Default for SelectCounter {
    fn default() -> Self {
        Self::new(CHECK_EVERY_N_READS)
    }
}

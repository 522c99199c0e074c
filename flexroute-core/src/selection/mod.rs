//! Selection policy: which probed host to adopt, and how often reads recheck.

pub mod cadence;
pub mod role;

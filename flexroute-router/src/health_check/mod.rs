//! Host probing.

pub mod prober;

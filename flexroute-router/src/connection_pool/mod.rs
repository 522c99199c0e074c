//! Pooling of router connection slots.

pub mod pool;

//! Failover protocol and the post-failover invalidation hook.

pub mod controller;
pub mod invalidator;

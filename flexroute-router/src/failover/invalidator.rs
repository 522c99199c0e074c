//! Hook for dropping cached schema metadata after a failover.
//!
//! The router does not know how the hosting application caches column and
//! table descriptions. It only guarantees that [`MetadataInvalidator::invalidate_all`]
//! runs exactly once per successful failover, before any statement executes
//! on the new connection.

/// Invalidates all cached schema metadata.
pub trait MetadataInvalidator: Send + Sync {
    /// Drop every cached table and column description.
    fn invalidate_all(&self);
}

impl<F> MetadataInvalidator for F
where
    F: Fn() + Send + Sync,
{
    fn invalidate_all(&self) {
        self()
    }
}

/// Invalidator for applications that keep no metadata cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl MetadataInvalidator for NoopInvalidator {
    fn invalidate_all(&self) {}
}

//! Published view of the host a router is currently bound to.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use crate::domain::host::{HostSpec, RoleMode};

/// A point-in-time view of the active route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSnapshot {
    /// Host the active connection points at
    pub host: HostSpec,
    /// Role the router is configured to seek
    pub mode: RoleMode,
    /// 0 for the initial selection, +1 for every failover since
    pub generation: u64,
}

/// A lock-free holder for the current route.
///
/// Uses `ArcSwapOption` so health endpoints and watchers can read the route
/// from any thread without ever blocking the failover controller, which is
/// the only writer.
#[derive(Debug, Default)]
pub struct ActiveRoute {
    current: ArcSwapOption<RouteSnapshot>,
}

impl ActiveRoute {
    /// Create an empty route; nothing is published until the first selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically publish a newly adopted host and return the snapshot.
    pub fn publish(&self, host: HostSpec, mode: RoleMode) -> Arc<RouteSnapshot> {
        let generation = self
            .current
            .load_full()
            .map_or(0, |previous| previous.generation + 1);

        let snapshot = Arc::new(RouteSnapshot {
            host,
            mode,
            generation,
        });
        self.current.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// The route as of now, or `None` before the first selection and after shutdown.
    pub fn snapshot(&self) -> Option<Arc<RouteSnapshot>> {
        self.current.load_full()
    }

    /// Withdraw the route when the router shuts down.
    pub fn clear(&self) {
        self.current.store(None);
    }
}

/// A shared reference to the lock-free active route.
pub type SharedActiveRoute = Arc<ActiveRoute>;

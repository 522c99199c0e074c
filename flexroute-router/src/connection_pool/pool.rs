//! Lock-free pool of router slots using DashMap and SegQueue.

use std::sync::Arc;

use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use tracing::{debug, warn};

use flexroute_core::{ConfigError, RoleMode, RouterConfig, RouterResult};

use crate::adapter::ConnectionAdapter;
use crate::driver::Connector;
use crate::failover::invalidator::MetadataInvalidator;

/// A pool of idle connection adapters, kept apart per role.
///
/// Each adapter is one logical client connection with its own failover
/// controller. Adapters are handed out whole and never shared.
#[derive(Clone)]
pub struct RouterPool {
    config: Arc<RouterConfig>,
    connector: Arc<dyn Connector>,
    invalidator: Arc<dyn MetadataInvalidator>,
    /// Maps a role to a lock-free queue of idle adapters.
    idle: Arc<DashMap<RoleMode, Arc<SegQueue<ConnectionAdapter>>>>,
}

impl RouterPool {
    /// Creates an empty pool; adapters are connected on demand.
    pub fn new(
        config: RouterConfig,
        connector: Arc<dyn Connector>,
        invalidator: Arc<dyn MetadataInvalidator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            connector,
            invalidator,
            idle: Arc::new(DashMap::new()),
        })
    }

    /// Takes an idle adapter for `mode`, or connects a new one.
    pub async fn checkout(&self, mode: RoleMode) -> RouterResult<ConnectionAdapter> {
        if let Some(adapter) = self.try_pop(mode) {
            return Ok(adapter);
        }

        debug!(mode = %mode, "no idle adapter, connecting a new one");
        let config = self.config.with_role(mode);
        ConnectionAdapter::connect(&config, Arc::clone(&self.connector), Arc::clone(&self.invalidator))
            .await
    }

    /// Tries to pop an idle adapter for `mode`.
    pub fn try_pop(&self, mode: RoleMode) -> Option<ConnectionAdapter> {
        let queue = self.idle.get(&mode)?.value().clone();
        queue.pop()
    }

    /// Returns an adapter to the pool for reuse.
    ///
    /// An adapter with an open transaction is rolled back and closed instead.
    pub async fn checkin(&self, adapter: ConnectionAdapter) {
        if adapter.in_transaction() {
            warn!(host = %adapter.active_host(), "adapter returned with an open transaction, closing it");
            if let Err(err) = adapter.close().await {
                debug!(error = %err, "failed to close adapter");
            }
            return;
        }

        let queue = self
            .idle
            .entry(adapter.mode())
            .or_insert_with(|| Arc::new(SegQueue::new()))
            .value()
            .clone();

        queue.push(adapter);
    }

    /// Number of idle adapters for `mode`.
    pub fn idle_count(&self, mode: RoleMode) -> usize {
        self.idle.get(&mode).map_or(0, |queue| queue.len())
    }

    /// Closes every idle adapter and returns how many were closed.
    pub async fn drain(&self) -> usize {
        let queues: Vec<_> = self.idle.iter().map(|entry| entry.value().clone()).collect();

        let mut closed = 0;
        for queue in queues {
            while let Some(adapter) = queue.pop() {
                if let Err(err) = adapter.close().await {
                    debug!(error = %err, "failed to close adapter");
                }
                closed += 1;
            }
        }
        closed
    }
}

impl std::fmt::Debug for RouterPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterPool")
            .field("hosts", &self.config.hosts)
            .field("primary_idle", &self.idle_count(RoleMode::Primary))
            .field("replica_idle", &self.idle_count(RoleMode::Replica))
            .finish_non_exhaustive()
    }
}

//! Failover controller.
//!
//! Owns the single active connection and decides, per database operation,
//! whether the host behind it must be re-probed:
//!
//! - transaction begin (outside a transaction): recheck the role, and on
//!   drift run a blocking failover bounded by the hold budget;
//! - write statement (outside a transaction) on a host that lost its role:
//!   same as transaction begin;
//! - anything else: count it toward the cadence, and every Nth one do a cheap
//!   recheck followed, on drift, by a single zero-wait failover attempt
//!   whose failure is ignored.
//!
//! The active connection is only replaced once a new valid selection exists;
//! until then the old one stays in place.

use std::sync::Arc;

use rand::RngCore;
use tokio::time;
use tracing::{debug, info, warn};

use flexroute_core::{
    ActiveRoute, DriverError, HostSpec, RetryPolicy, RoleMode, RoleSelector, RouterConfig,
    RouterError, RouterResult, SelectCounter, SharedActiveRoute, StatementKind,
};

use crate::driver::{BoxConnection, ConnectOptions, Connection, Connector};
use crate::failover::invalidator::MetadataInvalidator;
use crate::health_check::prober::HostProber;

struct ActiveConnection {
    host: HostSpec,
    connection: BoxConnection,
}

/// Owns the active connection and drives failovers.
pub struct FailoverController {
    hosts: Vec<HostSpec>,
    prober: HostProber,
    selector: RoleSelector,
    active: ActiveConnection,
    generation: u64,
    route: SharedActiveRoute,
    invalidator: Arc<dyn MetadataInvalidator>,
    reads: SelectCounter,
    retry: RetryPolicy,
}

impl FailoverController {
    /// Run the initial selection and connect.
    ///
    /// Fails with [`RouterError::NoValidHost`] after a single round if no
    /// valid host exists; construction is never retried.
    pub async fn connect(
        config: &RouterConfig,
        connector: Arc<dyn Connector>,
        invalidator: Arc<dyn MetadataInvalidator>,
    ) -> RouterResult<Self> {
        Self::connect_with_selector(config, connector, invalidator, RoleSelector::new(config.role))
            .await
    }

    /// Like [`connect`](Self::connect), drawing replica choices from `rng`.
    pub async fn connect_with_rng<R>(
        config: &RouterConfig,
        connector: Arc<dyn Connector>,
        invalidator: Arc<dyn MetadataInvalidator>,
        rng: R,
    ) -> RouterResult<Self>
    where
        R: RngCore + Send + 'static,
    {
        let selector = RoleSelector::with_rng(config.role, rng);
        Self::connect_with_selector(config, connector, invalidator, selector).await
    }

    async fn connect_with_selector(
        config: &RouterConfig,
        connector: Arc<dyn Connector>,
        invalidator: Arc<dyn MetadataInvalidator>,
        mut selector: RoleSelector,
    ) -> RouterResult<Self> {
        config.validate()?;
        let hosts = config.host_specs()?;
        let prober = HostProber::new(
            connector,
            ConnectOptions::from(config),
            config.connection_timeout(),
        );
        let mode = selector.mode();

        let active = Self::select_round(&prober, &mut selector, &hosts)
            .await
            .ok_or(RouterError::NoValidHost {
                mode,
                candidates: hosts.len(),
                attempts: 1,
            })?;

        let route = Arc::new(ActiveRoute::new());
        let snapshot = route.publish(active.host.clone(), mode);
        info!(host = %active.host, mode = %mode, "selected initial host");

        Ok(Self {
            hosts,
            prober,
            selector,
            active,
            generation: snapshot.generation,
            route,
            invalidator,
            reads: SelectCounter::default(),
            retry: config.retry_policy(),
        })
    }

    /// The role this router seeks.
    pub fn mode(&self) -> RoleMode {
        self.selector.mode()
    }

    /// The fixed candidate set.
    pub fn hosts(&self) -> &[HostSpec] {
        &self.hosts
    }

    /// Host behind the active connection.
    pub fn active_host(&self) -> &HostSpec {
        &self.active.host
    }

    /// Failovers since construction; 0 until the first one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Shared, lock-free view of the active route for other threads.
    pub fn route(&self) -> SharedActiveRoute {
        Arc::clone(&self.route)
    }

    /// Retry policy used by blocking failovers.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Read statements seen so far.
    pub fn reads(&self) -> u64 {
        self.reads.reads()
    }

    /// The active connection, for statement execution.
    pub fn connection_mut(&mut self) -> &mut dyn Connection {
        self.active.connection.as_mut()
    }

    /// Whether the active connection's host still plays the configured role.
    ///
    /// A failed status query counts as a lost role.
    pub async fn role_is_current(&mut self) -> bool {
        match self.active.connection.read_only().await {
            Ok(read_only) => self.mode().accepts(!read_only),
            Err(err) => {
                debug!(host = %self.active.host, error = %err, "role check failed on active connection");
                false
            }
        }
    }

    /// Recheck the role and, on drift, fail over within the hold budget.
    pub async fn ensure_role(&mut self) -> RouterResult<()> {
        if self.role_is_current().await {
            return Ok(());
        }
        self.reprobe_with_retry(self.retry).await
    }

    /// Hook run before a transaction starts.
    ///
    /// Never lets a new transaction start on a host that lost its role.
    pub async fn before_transaction_begin(&mut self, in_transaction: bool) -> RouterResult<()> {
        if in_transaction {
            return Ok(());
        }
        self.ensure_role().await
    }

    /// Hook run before every statement.
    ///
    /// Only a write outside a transaction can fail here, and only when the
    /// active host lost its role. Every other statement counts toward the
    /// periodic recheck, so reads tolerate a stale connection until then.
    pub async fn before_execute(&mut self, statement: &str, in_transaction: bool) -> RouterResult<()> {
        if !in_transaction
            && StatementKind::classify(statement).is_write()
            && !self.role_is_current().await
        {
            return self.reprobe_with_retry(self.retry).await;
        }

        if self.reads.record_read() && !self.role_is_current().await {
            debug!(host = %self.active.host, reads = self.reads.reads(), "role drift noticed on read path");
            if let Err(err) = self.reprobe_with_retry(RetryPolicy::single_attempt()).await {
                debug!(error = %err, "opportunistic failover failed, staying on current host");
            }
        }

        Ok(())
    }

    /// Run selection rounds until one yields a valid host or `policy` runs out.
    ///
    /// The wait between rounds is an async sleep, so dropping the returned
    /// future cancels the failover and leaves the old connection in place.
    pub async fn reprobe_with_retry(&mut self, policy: RetryPolicy) -> RouterResult<()> {
        for attempt in 0..policy.max_tries() {
            if let Some(delay) = policy.delay_before(attempt) {
                time::sleep(delay).await;
            }

            if let Some(next) = Self::select_round(&self.prober, &mut self.selector, &self.hosts).await {
                self.adopt(next).await;
                return Ok(());
            }

            debug!(attempt = attempt + 1, max_tries = policy.max_tries(), "no valid host in round");
        }

        warn!(
            mode = %self.mode(),
            attempts = policy.max_tries(),
            host = %self.active.host,
            "failover budget exhausted, no valid host"
        );
        Err(RouterError::NoValidHost {
            mode: self.mode(),
            candidates: self.hosts.len(),
            attempts: policy.max_tries(),
        })
    }

    /// Close the active connection.
    pub async fn shutdown(mut self) -> Result<(), DriverError> {
        self.route.clear();
        self.active.connection.close().await
    }

    async fn select_round(
        prober: &HostProber,
        selector: &mut RoleSelector,
        hosts: &[HostSpec],
    ) -> Option<ActiveConnection> {
        let results = prober.probe_all(hosts).await;
        let selection = selector.select(results);

        if selection.is_ambiguous() {
            warn!(
                mode = %selector.mode(),
                writers = selection.matching,
                "more than one writable host, refusing to pick one"
            );
        }

        prober.release(selection.rejected).await;

        selection.chosen.map(|chosen| ActiveConnection {
            host: chosen.host,
            connection: chosen.connection,
        })
    }

    async fn adopt(&mut self, next: ActiveConnection) {
        self.invalidator.invalidate_all();

        let mut previous = std::mem::replace(&mut self.active, next);
        let snapshot = self.route.publish(self.active.host.clone(), self.mode());
        self.generation = snapshot.generation;

        info!(
            from = %previous.host,
            to = %self.active.host,
            generation = self.generation,
            "failed over"
        );

        if let Err(err) = previous.connection.close().await {
            debug!(host = %previous.host, error = %err, "failed to close replaced connection");
        }
    }
}

impl std::fmt::Debug for FailoverController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverController")
            .field("mode", &self.mode())
            .field("hosts", &self.hosts)
            .field("active", &self.active.host)
            .field("generation", &self.generation)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

//! Role probes against candidate hosts.
//!
//! A probe opens a connection, asks the server for its read-only flag and
//! hands back the live connection together with the classification. Connect
//! errors, status query errors and timeouts all mean "host unavailable": they
//! are logged and swallowed so one bad host never aborts a round.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::time::{self, Instant};
use tracing::debug;

use flexroute_core::{DriverError, HostSpec, ProbeResult};

use crate::driver::{BoxConnection, ConnectOptions, Connector};

/// Probe result carrying a live driver connection.
pub type ConnectionProbe = ProbeResult<BoxConnection>;

/// Why a single host was classified as unavailable.
#[derive(Debug, Error)]
enum ProbeFailure {
    #[error("connect failed: {0}")]
    Connect(DriverError),
    #[error("status query failed: {0}")]
    StatusQuery(DriverError),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Probes candidate hosts and classifies their current role.
#[derive(Clone)]
pub struct HostProber {
    connector: Arc<dyn Connector>,
    options: Arc<ConnectOptions>,
    timeout: Duration,
}

impl HostProber {
    /// Create a prober; `timeout` bounds each probe's connect plus status query.
    pub fn new(connector: Arc<dyn Connector>, options: ConnectOptions, timeout: Duration) -> Self {
        Self {
            connector,
            options: Arc::new(options),
            timeout,
        }
    }

    /// The per-probe time bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe one host, returning `None` when it is unavailable.
    pub async fn probe(&self, host: &HostSpec) -> Option<ConnectionProbe> {
        match self.try_probe(host).await {
            Ok(result) => {
                debug!(host = %host, writable = result.writable, "probed host");
                Some(result)
            }
            Err(failure) => {
                debug!(host = %host, error = %failure, "host unavailable");
                None
            }
        }
    }

    /// Connect and status query share one deadline. A connection that fails
    /// or stalls on the status query is closed before the host is given up.
    async fn try_probe(&self, host: &HostSpec) -> Result<ConnectionProbe, ProbeFailure> {
        let deadline = Instant::now() + self.timeout;

        let mut connection = time::timeout_at(deadline, self.connector.connect(host, &self.options))
            .await
            .map_err(|_| ProbeFailure::TimedOut(self.timeout))?
            .map_err(ProbeFailure::Connect)?;

        let status = time::timeout_at(deadline, connection.read_only()).await;
        let failure = match status {
            Ok(Ok(read_only)) => return Ok(ProbeResult::new(host.clone(), connection, !read_only)),
            Ok(Err(err)) => ProbeFailure::StatusQuery(err),
            Err(_) => ProbeFailure::TimedOut(self.timeout),
        };

        match time::timeout(self.timeout, connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(host = %host, error = %err, "failed to close probe connection"),
            Err(_) => debug!(host = %host, "timed out closing probe connection"),
        }
        Err(failure)
    }

    /// Probe every candidate concurrently.
    ///
    /// A round takes as long as its slowest probe, never longer than the
    /// per-probe timeout. Unavailable hosts are simply absent from the result.
    pub async fn probe_all(&self, hosts: &[HostSpec]) -> Vec<ConnectionProbe> {
        join_all(hosts.iter().map(|host| self.probe(host)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Close the connections of a round that were not adopted.
    pub async fn release(&self, rejected: Vec<ConnectionProbe>) {
        join_all(rejected.into_iter().map(|mut result| async move {
            if let Err(err) = result.connection.close().await {
                debug!(host = %result.host, error = %err, "failed to close probe connection");
            }
        }))
        .await;
    }
}

impl std::fmt::Debug for HostProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostProber")
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

//! Flexroute command line
//!
//! Probes a replicated MySQL cluster exactly the way the router does and
//! reports where it would route, or keeps a router connected and follows
//! failovers as they happen.

#![deny(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flexroute_core::{RoleMode, RoleSelector, RouterConfig, RouterError};
use flexroute_router::{
    ConnectOptions, ConnectionAdapter, Connector, HostProber, MetadataInvalidator, MySqlConnector,
};

#[derive(Debug, Parser)]
#[command(name = "flexroute", version, about = "Failover-aware MySQL host router")]
struct Cli {
    /// Path to the router's TOML configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Override the configured role (primary, replica, master, slave)
    #[arg(long)]
    role: Option<RoleMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one probe round and print every host's role and the selection
    Probe,
    /// Stay connected and recheck the route periodically
    Watch {
        /// Milliseconds between role checks
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

/// Loads the configuration and runs the requested command.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = RouterConfig::load(&cli.config)?;
    if let Some(role) = cli.role {
        config = config.with_role(role);
    }

    let connector: Arc<dyn Connector> = Arc::new(MySqlConnector::new());

    match cli.command {
        Command::Probe => probe(&config, connector).await?,
        Command::Watch { interval_ms } => {
            watch(&config, connector, Duration::from_millis(interval_ms)).await?
        }
    }

    Ok(())
}

async fn probe(config: &RouterConfig, connector: Arc<dyn Connector>) -> Result<(), RouterError> {
    let hosts = config.host_specs()?;
    let prober = HostProber::new(connector, ConnectOptions::from(config), config.connection_timeout());
    let results = prober.probe_all(&hosts).await;

    for host in &hosts {
        let status = match results.iter().find(|result| &result.host == host) {
            Some(result) if result.writable => "writable",
            Some(_) => "read-only",
            None => "unavailable",
        };
        println!("{host}\t{status}");
    }

    let selection = RoleSelector::new(config.role).select(results);
    prober.release(selection.rejected).await;

    match selection.chosen {
        Some(mut chosen) => {
            println!("selected {} host: {}", config.role, chosen.host);
            chosen.connection.close().await?;
            Ok(())
        }
        None => Err(RouterError::NoValidHost {
            mode: config.role,
            candidates: hosts.len(),
            attempts: 1,
        }),
    }
}

async fn watch(
    config: &RouterConfig,
    connector: Arc<dyn Connector>,
    interval: Duration,
) -> Result<(), RouterError> {
    let invalidator: Arc<dyn MetadataInvalidator> =
        Arc::new(|| info!("route changed, cached metadata invalidated"));
    let mut router = ConnectionAdapter::connect(config, connector, invalidator).await?;
    let route = router.route();
    let mut seen = route.snapshot().map(|snapshot| snapshot.generation);

    let mut ticker = time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        router.ensure_role().await?;

        if let Some(snapshot) = route.snapshot() {
            if seen != Some(snapshot.generation) {
                info!(host = %snapshot.host, generation = snapshot.generation, "now routing");
                seen = Some(snapshot.generation);
            }
        }
    }

    info!("shutting down");
    router.close().await
}

//! Flexroute Core functionality.
//!
//! This crate contains the domain models, selection policy and configuration
//! definitions behind the Flexroute failover router: candidate hosts, the
//! single-writer selection rule, read-path probe cadence, retry budgets and
//! the error taxonomy. Nothing here performs I/O; the async engine lives in
//! `flexroute-router`.

pub mod config;
pub mod domain;
pub mod error;
pub mod retry;
pub mod selection;
pub mod statement;

pub use config::RouterConfig;
pub use domain::host::{HostSpec, RoleMode};
pub use domain::routing::{ActiveRoute, RouteSnapshot, SharedActiveRoute};
pub use error::{ConfigError, DriverError, RouterError, RouterResult};
pub use retry::{RetryPolicy, POLL_INTERVAL};
pub use selection::cadence::{SelectCounter, CHECK_EVERY_N_READS};
pub use selection::role::{ProbeResult, RoleSelector, Selection};
pub use statement::StatementKind;

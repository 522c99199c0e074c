//! Error taxonomy for the router.
//!
//! Only two kinds of failure ever reach a caller: bad configuration at
//! startup, and [`RouterError::NoValidHost`] when no correct host could be
//! identified within the retry budget. Per-host probe failures are absorbed
//! by the prober and never appear here.

use thiserror::Error;

use crate::domain::host::{HostSpec, RoleMode};

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Invalid or unreadable router configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The candidate host list is empty.
    #[error("no candidate hosts configured")]
    NoHosts,

    /// A host entry is not of the form `host` or `host:port`.
    #[error("invalid host specification: {0:?}")]
    InvalidHost(String),

    /// The same host appears more than once in the candidate list.
    #[error("host {0} is listed more than once")]
    DuplicateHost(String),

    /// A timeout is zero, negative or not a finite number of seconds.
    #[error("{name} must be a positive number of seconds, got {value}")]
    InvalidTimeout {
        /// Name of the offending setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A role name other than primary/replica (or master/slave).
    #[error("unknown role {0:?}, expected primary or replica")]
    UnknownRole(String),

    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {message}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },

    /// The configuration text is not valid TOML for a router config.
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Failure reported by a database driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Could not establish a connection.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A statement or status query failed on an open connection.
    #[error("query failed: {0}")]
    Query(String),

    /// Closing the connection failed.
    #[error("close failed: {0}")]
    Close(String),
}

/// Errors surfaced by the router to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouterError {
    /// No single host with the required role could be identified.
    ///
    /// Zero writers and several writers are reported identically.
    #[error("no valid {mode} host among {candidates} candidate(s) after {attempts} attempt(s)")]
    NoValidHost {
        /// Role the router was looking for.
        mode: RoleMode,
        /// Number of configured candidates.
        candidates: usize,
        /// Selection rounds performed before giving up.
        attempts: u32,
    },

    /// The connection a transaction was running on was replaced by a
    /// failover; the transaction is gone and was not replayed.
    #[error("transaction on {host} abandoned after failover")]
    TransactionAbandoned {
        /// Host the transaction was started on.
        host: HostSpec,
    },

    /// Commit or rollback without an open transaction.
    #[error("no open transaction")]
    NoOpenTransaction,

    /// Driver failure while executing a statement on the active connection.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RouterError {
    /// Whether this is a routing failure rather than a statement failure.
    pub fn is_no_valid_host(&self) -> bool {
        matches!(self, Self::NoValidHost { .. })
    }
}

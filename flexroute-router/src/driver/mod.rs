//! Database driver seam.
//!
//! The router never speaks a wire protocol itself. A [`Connector`] opens
//! connections to one candidate host and a [`Connection`] answers the
//! read-only status query and runs statements. The MySQL implementation
//! lives behind the `mysql` feature.

use std::collections::BTreeMap;

use async_trait::async_trait;
use flexroute_core::{DriverError, HostSpec, RouterConfig};

#[cfg(feature = "mysql")]
pub mod mysql;

/// A boxed driver connection.
pub type BoxConnection = Box<dyn Connection>;

/// Shared connection settings, merged with each candidate's address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Login user
    pub username: String,
    /// Login password
    pub password: Option<String>,
    /// Default schema
    pub database: Option<String>,
    /// Driver specific pass-through options
    pub options: BTreeMap<String, String>,
}

impl From<&RouterConfig> for ConnectOptions {
    fn from(config: &RouterConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            options: config.options.clone(),
        }
    }
}

/// One live connection to one host.
#[async_trait]
pub trait Connection: Send {
    /// Run the status query and return the server's read-only flag.
    async fn read_only(&mut self) -> Result<bool, DriverError>;

    /// Execute a statement, returning the number of affected rows.
    async fn execute(&mut self, statement: &str) -> Result<u64, DriverError>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Opens connections to candidate hosts.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `host` using the shared `options`.
    async fn connect(
        &self,
        host: &HostSpec,
        options: &ConnectOptions,
    ) -> Result<BoxConnection, DriverError>;
}

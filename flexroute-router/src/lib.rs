//! Flexroute Router Engine
//!
//! The async engine that probes candidate hosts, keeps a single active
//! connection on the host holding the configured role, and transparently
//! fails over when that host loses its role.
//!
//! ```text
//! ConnectionAdapter -> FailoverController -> RoleSelector -> HostProber -> Connector
//! ```

pub mod adapter;
pub mod connection_pool;
pub mod driver;
pub mod failover;
pub mod health_check;

pub use adapter::ConnectionAdapter;
pub use connection_pool::pool::RouterPool;
pub use driver::{BoxConnection, ConnectOptions, Connection, Connector};
pub use failover::controller::FailoverController;
pub use failover::invalidator::{MetadataInvalidator, NoopInvalidator};
pub use health_check::prober::HostProber;

#[cfg(feature = "mysql")]
pub use driver::mysql::MySqlConnector;

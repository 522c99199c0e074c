//! Router configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! hosts = ["db-a:3306", "db-b:3306"]
//! username = "app"
//! password = "secret"
//! role = "primary"
//! tx_hold_timeout = 5.0
//! connection_timeout = 5.0
//!
//! [options]
//! charset = "utf8mb4"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::host::{HostSpec, RoleMode};
use crate::error::ConfigError;
use crate::retry::{RetryPolicy, POLL_INTERVAL};

/// Settings for one router instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Candidate hosts as `host` or `host:port`
    pub hosts: Vec<String>,
    /// Login user, `root` when omitted
    #[serde(default = "default_username")]
    pub username: String,
    /// Login password
    #[serde(default)]
    pub password: Option<String>,
    /// Default schema
    #[serde(default)]
    pub database: Option<String>,
    /// Role to seek (`primary`/`replica`, or `master`/`slave`)
    #[serde(default = "default_role")]
    pub role: RoleMode,
    /// Seconds a transaction begin or write may block waiting for a failover
    #[serde(default = "default_timeout")]
    pub tx_hold_timeout: f64,
    /// Seconds allowed for each probe's connect and status query
    #[serde(default = "default_timeout")]
    pub connection_timeout: f64,
    /// Other driver options, passed through to the connector
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

fn default_username() -> String {
    "root".to_string()
}

fn default_role() -> RoleMode {
    RoleMode::Primary
}

fn default_timeout() -> f64 {
    5.0
}

impl RouterConfig {
    /// A config for `hosts` with every other setting at its default.
    pub fn new<I, S>(hosts: I, role: RoleMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            username: default_username(),
            password: None,
            database: None,
            role,
            tx_hold_timeout: default_timeout(),
            connection_timeout: default_timeout(),
            options: BTreeMap::new(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Check hosts and timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.host_specs()?;
        check_timeout("tx_hold_timeout", self.tx_hold_timeout)?;
        check_timeout("connection_timeout", self.connection_timeout)?;
        Ok(())
    }

    /// Parse the candidate list, rejecting empty lists and duplicates.
    pub fn host_specs(&self) -> Result<Vec<HostSpec>, ConfigError> {
        if self.hosts.is_empty() {
            return Err(ConfigError::NoHosts);
        }

        let mut seen = HashSet::new();
        self.hosts
            .iter()
            .map(|entry| {
                let spec: HostSpec = entry.parse()?;
                if !seen.insert(spec.clone()) {
                    return Err(ConfigError::DuplicateHost(spec.to_string()));
                }
                Ok(spec)
            })
            .collect()
    }

    /// The transaction hold budget.
    pub fn tx_hold_timeout(&self) -> Duration {
        seconds(self.tx_hold_timeout)
    }

    /// The per-probe connect timeout.
    pub fn connection_timeout(&self) -> Duration {
        seconds(self.connection_timeout)
    }

    /// Retry policy for blocking failovers: the hold budget cut into poll slices.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_budget(self.tx_hold_timeout(), POLL_INTERVAL)
    }

    /// The same config seeking a different role.
    pub fn with_role(&self, role: RoleMode) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }
}

fn check_timeout(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && Duration::try_from_secs_f64(value).is_ok() {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeout { name, value })
    }
}

/// Saturates instead of panicking on values `validate` would have rejected.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

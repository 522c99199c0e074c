//! Candidate host models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A single candidate database host.
///
/// Parsed once from a `host` or `host:port` string and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostSpec {
    /// Hostname or IP address
    pub host: String,
    /// Explicit port, `None` means the driver default
    pub port: Option<u16>,
}

impl HostSpec {
    /// Create a host spec from its parts.
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The port to dial, falling back to `default_port`.
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }
}

impl FromStr for HostSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = match s.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidHost(s.to_string()))?;
                (host, Some(port))
            }
            None => (s, None),
        };

        if host.is_empty() {
            return Err(ConfigError::InvalidHost(s.to_string()));
        }

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

/// The role a router instance is looking for.
///
/// Fixed at construction: a router seeks either the single writable host or
/// any read-only host, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleMode {
    /// The single writable host of the cluster
    #[serde(alias = "master")]
    Primary,
    /// Any read-only host
    #[serde(alias = "slave")]
    Replica,
}

impl RoleMode {
    /// Whether a host with the given writability plays this role.
    pub fn accepts(self, writable: bool) -> bool {
        match self {
            Self::Primary => writable,
            Self::Replica => !writable,
        }
    }

    /// Lowercase name used in config files and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Replica => "replica",
        }
    }
}

impl fmt::Display for RoleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "master" => Ok(Self::Primary),
            "replica" | "slave" => Ok(Self::Replica),
            _ => Err(ConfigError::UnknownRole(s.to_string())),
        }
    }
}

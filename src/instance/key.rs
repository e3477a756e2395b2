//! `host:port` instance keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing an instance key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceKeyError {
    #[error("instance key `{0}` has no port")]
    MissingPort(String),

    #[error("instance key `{0}` has an invalid port")]
    InvalidPort(String),

    #[error("instance key `{0}` has an empty host")]
    EmptyHost(String),
}

/// Identity of a monitored instance.
///
/// Serialized as a `host:port` string. IPv6 hosts are written in brackets
/// (`[::1]:3306`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceKey {
    pub hostname: String,
    pub port: u16,
}

impl InstanceKey {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hostname.contains(':') {
            write!(f, "[{}]:{}", self.hostname, self.port)
        } else {
            write!(f, "{}:{}", self.hostname, self.port)
        }
    }
}

impl FromStr for InstanceKey {
    type Err = InstanceKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| InstanceKeyError::MissingPort(raw.to_string()))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(InstanceKeyError::EmptyHost(raw.to_string()));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| InstanceKeyError::InvalidPort(raw.to_string()))?;

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for InstanceKey {
    type Error = InstanceKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstanceKey> for String {
    fn from(key: InstanceKey) -> Self {
        key.to_string()
    }
}

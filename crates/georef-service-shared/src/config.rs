//! Service configuration read from the environment.
//!
//! # Environment Variables
//!
//! - `GEOREF_DATA_PATH`: Path to the SQLite dataset (default: `/data/georef.db`)
//! - `SERVICE_PORT`: HTTP port (default: `8080`)
//! - `NEAREST_STRATEGY`: `index` (default) or `scan`
//!
//! Logging and metrics read their own variables; see [`crate::logging`] and
//! [`crate::metrics`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default dataset location inside the container image.
pub const DEFAULT_DATA_PATH: &str = "/data/georef.db";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// How `/nearest_city` finds its answer.
///
/// Both strategies return the same city for the same snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearestStrategy {
    /// KD-tree lookup on the request task.
    #[default]
    Index,
    /// Full linear scan on a blocking worker, cancelled if the client goes away.
    Scan,
}

impl NearestStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            NearestStrategy::Index => "index",
            NearestStrategy::Scan => "scan",
        }
    }
}

impl fmt::Display for NearestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised strategy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown nearest strategy '{}'; expected 'index' or 'scan'",
            self.0
        )
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for NearestStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "index" | "kdtree" => Ok(NearestStrategy::Index),
            "scan" | "linear" => Ok(NearestStrategy::Scan),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Startup configuration for the service binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub data_path: PathBuf,
    pub port: u16,
    pub strategy: NearestStrategy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            port: DEFAULT_PORT,
            strategy: NearestStrategy::default(),
        }
    }
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let data_path = lookup("GEOREF_DATA_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);

        let port = match lookup("SERVICE_PORT") {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %value, "invalid SERVICE_PORT, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        let strategy = match lookup("NEAREST_STRATEGY") {
            Some(value) => value.parse().unwrap_or_else(|err: UnknownStrategy| {
                tracing::warn!(error = %err, "using default nearest strategy");
                defaults.strategy
            }),
            None => defaults.strategy,
        };

        Self {
            data_path,
            port,
            strategy,
        }
    }
}

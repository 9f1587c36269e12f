//! Configuration types for Latlab

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::params::EnumPolicy;
use crate::{LabError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Simulation behavior
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Default tracing directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on
    ///
    /// # Errors
    ///
    /// Returns error if `bind_address` is not an IP address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind_address.parse().map_err(|e| {
            LabError::ConfigError(format!(
                "Invalid bind_address '{}': {e}",
                self.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Time allowed for in-flight connections to drain on shutdown
    pub shutdown_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 4096,
            shutdown_timeout_ms: 5000,
        }
    }
}

/// Simulation behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Reject unrecognized `protocol`/`condition` values instead of defaulting
    #[serde(default)]
    pub strict_enums: bool,
    /// Add random jitter to condition-aware delays
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            strict_enums: false,
            jitter: default_jitter(),
        }
    }
}

impl SimulationConfig {
    /// Policy applied to unrecognized enum inputs
    #[must_use]
    pub fn enum_policy(&self) -> EnumPolicy {
        if self.strict_enums {
            EnumPolicy::Strict
        } else {
            EnumPolicy::FailOpen
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LabError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| LabError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        if self.server.port == 0 {
            return Err(LabError::ConfigError("port cannot be 0".to_string()));
        }

        if self.limits.max_connections == 0 {
            return Err(LabError::ConfigError(
                "max_connections must be > 0".to_string(),
            ));
        }

        if self.limits.shutdown_timeout_ms == 0 {
            return Err(LabError::ConfigError(
                "shutdown_timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use crate::load_balancer::pool::GROWTH_CHUNK;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LeastConnConfig {
    /// Director settings.
    pub director: DirectorConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Host-side endpoints to register with the director.
    pub backends: Vec<BackendConfig>,
}

/// Director configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Director identity used in logs, metrics and errors.
    pub name: String,

    /// Slots added each time the pool is full.
    pub growth_chunk: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            name: "leastconn".to_string(),
            growth_chunk: GROWTH_CHUNK,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend identifier.
    pub name: String,

    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Maximum concurrent connections to this backend.
    #[serde(default = "default_max_backend_conns")]
    pub max_connections: usize,

    /// Connections already open when the pool is built.
    #[serde(default)]
    pub connections: usize,

    /// Initial health.
    #[serde(default = "default_healthy")]
    pub healthy: bool,
}

fn default_max_backend_conns() -> usize {
    100
}

fn default_healthy() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: LeastConnConfig = toml::from_str("").unwrap();
        assert_eq!(config.director.name, "leastconn");
        assert_eq!(config.director.growth_chunk, 16);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.backends.is_empty());
    }

    #[test]
    fn test_backend_defaults() {
        let config: LeastConnConfig = toml::from_str(
            r#"
            [[backends]]
            name = "web-1"
            address = "10.0.0.1:80"
            "#,
        )
        .unwrap();
        let backend = &config.backends[0];
        assert_eq!(backend.max_connections, 100);
        assert_eq!(backend.connections, 0);
        assert!(backend.healthy);
    }
}

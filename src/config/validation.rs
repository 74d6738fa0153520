//! Configuration validation.
//!
//! Returns every problem found rather than stopping at the first one.

use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;
use crate::config::schema::{BackendConfig, LeastConnConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("director name must not be empty")]
    EmptyDirectorName,

    #[error("director growth_chunk must be greater than zero")]
    ZeroGrowthChunk,

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("backend #{index} has an empty name")]
    EmptyBackendName { index: usize },

    #[error("backend '{name}' has invalid address '{address}'")]
    InvalidAddress { name: String, address: String },

    #[error("backend '{name}' must allow at least one connection")]
    ZeroMaxConnections { name: String },

    #[error("backend '{name}' starts with {connections} connections, above its limit of {max}")]
    ConnectionsAboveLimit { name: String, connections: usize, max: usize },

    #[error("backend '{name}' is listed again with different settings")]
    ConflictingDuplicate { name: String },
}

pub fn validate_config(config: &LeastConnConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.director.name.trim().is_empty() {
        errors.push(ValidationError::EmptyDirectorName);
    }
    if config.director.growth_chunk == 0 {
        errors.push(ValidationError::ZeroGrowthChunk);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    // Listing a backend twice adds it to the pool twice; both entries must agree.
    let mut first_seen: HashMap<&str, &BackendConfig> = HashMap::new();
    for (index, backend) in config.backends.iter().enumerate() {
        if backend.name.trim().is_empty() {
            errors.push(ValidationError::EmptyBackendName { index });
            continue;
        }
        let first = *first_seen.entry(backend.name.as_str()).or_insert(backend);
        if first != backend {
            errors.push(ValidationError::ConflictingDuplicate {
                name: backend.name.clone(),
            });
        }
        validate_backend(backend, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_backend(backend: &BackendConfig, errors: &mut Vec<ValidationError>) {
    if backend.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            name: backend.name.clone(),
            address: backend.address.clone(),
        });
    }
    if backend.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections {
            name: backend.name.clone(),
        });
    } else if backend.connections > backend.max_connections {
        errors.push(ValidationError::ConnectionsAboveLimit {
            name: backend.name.clone(),
            connections: backend.connections,
            max: backend.max_connections,
        });
    }
}

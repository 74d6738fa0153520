//! Least connections director simulator.
//!
//! Builds a director from a TOML description of host endpoints and runs
//! routing decisions or health checks against it.
//!
//! ```text
//! leastconn --config pool.toml resolve -n 10 --hold
//! leastconn --config pool.toml health --json
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use leastconn::config::{load_config, BackendConfig};
use leastconn::load_balancer::{ConnectionGuard, Endpoint};
use leastconn::observability::logging;
use leastconn::{Backend, LeastConnDirector, ProbeContext, Target};

#[derive(Parser)]
#[command(name = "leastconn")]
#[command(about = "Least connections director simulator", long_about = None)]
struct Cli {
    /// Pool description (TOML).
    #[arg(short, long, default_value = "leastconn.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run routing decisions against the pool
    Resolve {
        /// Number of decisions
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Keep a connection open on every picked backend
        #[arg(long)]
        hold: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show aggregate and per-backend health
    Health {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Decision {
    request_id: Uuid,
    backend: Option<String>,
    connections: Option<usize>,
    held: bool,
}

#[derive(Serialize)]
struct BackendStatus {
    name: String,
    address: String,
    healthy: bool,
    connections: usize,
    max_connections: usize,
}

#[derive(Serialize)]
struct HealthReport {
    director: String,
    healthy: bool,
    changed_unix_secs: u64,
    backends: Vec<BackendStatus>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init(level);

    tracing::info!(
        director = %config.director.name,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    let director = LeastConnDirector::from_config(&config.director);
    let endpoints = build_endpoints(&config.backends)?;
    for backend in &config.backends {
        director.add_backend(Target::backend(&endpoints[&backend.name]))?;
    }

    match cli.command {
        Commands::Resolve { count, hold, json } => {
            let mut guards: Vec<ConnectionGuard> = Vec::new();
            let mut decisions = Vec::with_capacity(count);

            for _ in 0..count {
                let ctx = ProbeContext::for_request(Uuid::new_v4());
                let picked = director.resolve(&ctx);
                let mut held = false;
                if hold {
                    if let Some(guard) = picked
                        .as_ref()
                        .and_then(|b| endpoints.get(b.name()))
                        .and_then(Endpoint::try_acquire)
                    {
                        guards.push(guard);
                        held = true;
                    }
                }
                decisions.push(Decision {
                    request_id: ctx.request_id().unwrap_or_default(),
                    backend: picked.as_ref().map(|b| b.name().to_string()),
                    connections: picked.as_ref().map(|b| b.connections()),
                    held,
                });
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&decisions)?);
            } else {
                for (i, d) in decisions.iter().enumerate() {
                    match (&d.backend, d.connections) {
                        (Some(name), Some(conns)) => {
                            println!("#{:<4} {} -> {} ({} open)", i, d.request_id, name, conns)
                        }
                        _ => println!("#{:<4} {} -> <no backend>", i, d.request_id),
                    }
                }
            }
        }
        Commands::Health { json } => {
            let health = director.healthy(&ProbeContext::new());
            let changed_unix_secs = health
                .changed
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);

            let report = HealthReport {
                director: director.name().to_string(),
                healthy: health.healthy,
                changed_unix_secs,
                backends: config
                    .backends
                    .iter()
                    .map(|b| {
                        let ep = &endpoints[&b.name];
                        BackendStatus {
                            name: b.name.clone(),
                            address: ep.addr.to_string(),
                            healthy: ep.is_healthy(),
                            connections: ep.connections(),
                            max_connections: ep.max_connections,
                        }
                    })
                    .collect(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {} (changed at {})",
                    report.director,
                    if report.healthy { "healthy" } else { "sick" },
                    report.changed_unix_secs
                );
                for b in &report.backends {
                    println!(
                        "  {:<16} {:<22} {:<8} {}/{}",
                        b.name,
                        b.address,
                        if b.healthy { "healthy" } else { "sick" },
                        b.connections,
                        b.max_connections
                    );
                }
            }
        }
    }

    Ok(())
}

/// Create one endpoint per distinct backend name.
///
/// A name listed twice is the same endpoint added twice to the pool;
/// validation has already checked that both entries agree.
fn build_endpoints(
    configs: &[BackendConfig],
) -> Result<HashMap<String, Arc<Endpoint>>, Box<dyn std::error::Error>> {
    let mut endpoints = HashMap::new();
    for config in configs {
        if endpoints.contains_key(&config.name) {
            continue;
        }
        let endpoint = Endpoint::new(config.name.clone(), config.address.parse()?, config.max_connections);
        for _ in 0..config.connections {
            endpoint.inc_connections();
        }
        if !config.healthy {
            endpoint.set_healthy(false);
        }
        endpoints.insert(config.name.clone(), Arc::new(endpoint));
    }
    Ok(endpoints)
}

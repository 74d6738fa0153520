//! Least Connections director.
//!
//! Selects the healthy backend with the fewest open connections. Ties go to
//! the backend added last. When nothing is healthy the first backend in the
//! pool is returned anyway; detecting the failed connection is the host's job.

use std::sync::{Arc, Weak};
use crate::config::DirectorConfig;
use crate::error::DirectorError;
use crate::load_balancer::backend::{Backend, Health, ProbeContext};
use crate::load_balancer::pool::{BackendPool, Snapshot, GROWTH_CHUNK};
use crate::load_balancer::target::Target;
use crate::observability::metrics::{DirectorMetrics, ResolveOutcome};

/// A backend picked by `select`.
#[derive(Debug, Clone)]
struct Selection {
    index: usize,
    connections: usize,
    backend: Arc<dyn Backend>,
}

/// Least connections director over a pool of host-owned backends.
#[derive(Debug)]
pub struct LeastConnDirector {
    name: String,
    pool: BackendPool,
    metrics: DirectorMetrics,
    me: Weak<LeastConnDirector>,
}

impl LeastConnDirector {
    /// Create a director with an empty pool.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_growth(name, GROWTH_CHUNK)
    }

    pub fn with_growth(name: impl Into<String>, growth: usize) -> Arc<Self> {
        let name = name.into();
        tracing::info!(director = %name, growth, "Director created");
        Arc::new_cyclic(|me| Self {
            metrics: DirectorMetrics::new(&name),
            name,
            pool: BackendPool::with_growth(growth),
            me: me.clone(),
        })
    }

    pub fn from_config(config: &DirectorConfig) -> Arc<Self> {
        Self::with_growth(config.name.clone(), config.growth_chunk)
    }

    /// Create a director in an empty host slot.
    ///
    /// # Panics
    /// If the slot already holds a director.
    pub fn init(slot: &mut Option<Arc<Self>>, name: impl Into<String>) -> &Arc<Self> {
        if let Some(existing) = slot.as_ref() {
            panic!("director {} is already initialized", existing.name);
        }
        slot.insert(Self::new(name))
    }

    /// Release the director held in a host slot. Empty slots are left alone.
    pub fn fini(slot: &mut Option<Arc<Self>>) {
        if let Some(director) = slot.take() {
            tracing::info!(director = %director.name, backends = director.pool.len(), "Director released");
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// This director as a routing target for the host.
    pub fn target(&self) -> Target {
        Target::Director(self.me.clone())
    }

    /// Add a plain backend to the pool.
    ///
    /// Dead references and composite targets are rejected and leave the pool
    /// unchanged.
    pub fn add_backend(&self, target: Target) -> Result<(), DirectorError> {
        let result = match target {
            Target::Backend(weak) if weak.strong_count() == 0 => Err(DirectorError::NullBackend {
                director: self.name.clone(),
            }),
            Target::Backend(weak) => {
                let pushed = self.pool.push(weak);
                tracing::debug!(
                    director = %self.name,
                    index = pushed.index,
                    backends = pushed.len,
                    capacity = pushed.capacity,
                    "Backend added"
                );
                self.metrics.record_pool_size(pushed.len);
                Ok(())
            }
            Target::Director(weak) => Err(DirectorError::NotABackend {
                director: self.name.clone(),
                target: weak
                    .upgrade()
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| "<released>".to_string()),
            }),
        };

        if let Err(e) = &result {
            tracing::warn!(director = %self.name, reason = e.reason(), error = %e, "Backend rejected");
            self.metrics.record_rejected(e);
        }
        result
    }

    /// Whether any backend in the pool is healthy, and when health last changed.
    ///
    /// An empty pool is unhealthy with a change time of `UNIX_EPOCH`.
    pub fn healthy(&self, ctx: &ProbeContext) -> Health {
        let health = self.pool.any_healthy(ctx);
        self.metrics.record_healthy(health.healthy);
        health
    }

    /// Pick the backend for one routing decision.
    ///
    /// Returns `None` only when the pool is empty, or when nothing is healthy
    /// and the first backend has been dropped by the host.
    pub fn resolve(&self, ctx: &ProbeContext) -> Option<Arc<dyn Backend>> {
        let snapshot = self.pool.snapshot();
        if snapshot.is_empty() {
            tracing::debug!(director = %self.name, request_id = ?ctx.request_id(), "Resolve on empty pool");
            self.metrics.record_resolve(ResolveOutcome::Empty);
            return None;
        }

        match select(&snapshot, ctx) {
            Some(selection) => {
                tracing::trace!(
                    director = %self.name,
                    request_id = ?ctx.request_id(),
                    index = selection.index,
                    backend = selection.backend.name(),
                    connections = selection.connections,
                    "Backend selected"
                );
                self.metrics.record_resolve(ResolveOutcome::Selected);
                Some(selection.backend)
            }
            None => {
                tracing::debug!(
                    director = %self.name,
                    request_id = ?ctx.request_id(),
                    backends = snapshot.len(),
                    "No healthy backend, falling back to first"
                );
                self.metrics.record_resolve(ResolveOutcome::Fallback);
                snapshot.get(0)
            }
        }
    }
}

/// Healthy backend with the fewest connections, last one winning ties.
fn select(snapshot: &Snapshot, ctx: &ProbeContext) -> Option<Selection> {
    let mut best: Option<Selection> = None;
    let mut least = usize::MAX;

    for (index, slot) in snapshot.iter().enumerate() {
        let Some(backend) = slot.upgrade() else {
            continue;
        };
        if !backend.healthy(ctx).healthy {
            continue;
        }

        let connections = backend.connections();
        if connections <= least {
            least = connections;
            best = Some(Selection {
                index,
                connections,
                backend,
            });
        }
    }
    best
}

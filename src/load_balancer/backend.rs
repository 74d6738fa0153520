//! Backend abstraction.
//!
//! # Responsibilities
//! - Define what a director needs from a backend (`Backend` trait)
//! - Provide a host-side endpoint with its own connection counter
//! - Track health state and the time it last changed, under one lock
//!
//! The director only ever reads through the `Backend` trait. `Endpoint` is the
//! host's side of the contract and is what the CLI and tests plug in.

use std::fmt;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Per-request context handed through to health predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeContext {
    request_id: Option<Uuid>,
}

impl ProbeContext {
    /// Context for a probe that is not tied to a request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a routing decision made on behalf of a request.
    pub fn for_request(request_id: Uuid) -> Self {
        Self {
            request_id: Some(request_id),
        }
    }

    pub fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }
}

/// Health as reported by a backend, or aggregated by a director.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub healthy: bool,
    /// When the health state last changed. `UNIX_EPOCH` means never.
    pub changed: SystemTime,
}

impl Health {
    pub fn new(healthy: bool, changed: SystemTime) -> Self {
        Self { healthy, changed }
    }

    /// Unhealthy with no recorded change.
    pub fn unknown() -> Self {
        Self::new(false, UNIX_EPOCH)
    }
}

/// A single routable endpoint, as seen by a director.
///
/// Implementations own their connection counter and health state; the director
/// only reads them. Both calls must be cheap and must not block on I/O.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Identity used in logs and error messages.
    fn name(&self) -> &str;

    /// Current health and when it last changed.
    fn healthy(&self, ctx: &ProbeContext) -> Health;

    /// Number of currently open connections.
    fn connections(&self) -> usize;
}

/// Health State enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown,
    Healthy,
    Unhealthy,
}

/// A host-owned backend server.
#[derive(Debug)]
pub struct Endpoint {
    name: String,
    /// The address of the backend.
    pub addr: SocketAddr,
    /// Maximum concurrent connections allowed.
    pub max_connections: usize,
    /// Open connections, guarded by the endpoint's own lock.
    connections: Mutex<usize>,

    /// Health state and when it last changed.
    health: Mutex<(HealthState, SystemTime)>,
}

impl Endpoint {
    /// Create a new endpoint in the `Unknown` health state.
    pub fn new(name: impl Into<String>, addr: SocketAddr, max_connections: usize) -> Self {
        Self {
            name: name.into(),
            addr,
            max_connections,
            connections: Mutex::new(0),
            health: Mutex::new((HealthState::Unknown, UNIX_EPOCH)),
        }
    }

    fn counter(&self) -> std::sync::MutexGuard<'_, usize> {
        self.connections.lock().expect("endpoint connection mutex poisoned")
    }

    /// Increment open connection count, ignoring the limit.
    pub fn inc_connections(&self) {
        *self.counter() += 1;
    }

    /// Decrement open connection count.
    pub fn dec_connections(&self) {
        let mut count = self.counter();
        *count = count.saturating_sub(1);
    }

    /// Open a tracked connection, or `None` if the endpoint is at its limit.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        {
            let mut count = self.counter();
            if *count >= self.max_connections {
                return None;
            }
            *count += 1;
        }
        Some(ConnectionGuard {
            endpoint: self.clone(),
        })
    }

    fn health(&self) -> std::sync::MutexGuard<'_, (HealthState, SystemTime)> {
        self.health.lock().expect("endpoint health mutex poisoned")
    }

    pub fn state(&self) -> HealthState {
        self.health().0
    }

    /// Return true if endpoint is considered healthy (Healthy or Unknown).
    pub fn is_healthy(&self) -> bool {
        self.state() != HealthState::Unhealthy
    }

    /// Set the health state, as decided by the host's health checks.
    ///
    /// The change time only moves when the state actually changes.
    pub fn set_healthy(&self, healthy: bool) {
        let next = if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };

        let mut health = self.health();
        let prev = health.0;
        if prev != next {
            *health = (next, SystemTime::now());
            tracing::info!(backend = %self.name, from = ?prev, to = ?next, "Backend health changed");
        }
    }
}

impl Backend for Endpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn healthy(&self, _ctx: &ProbeContext) -> Health {
        let (state, changed) = *self.health();
        Health::new(state != HealthState::Unhealthy, changed)
    }

    fn connections(&self) -> usize {
        *self.counter()
    }
}

/// A RAII guard that holds one open connection on an endpoint.
#[derive(Debug)]
pub struct ConnectionGuard {
    endpoint: Arc<Endpoint>,
}

impl Deref for ConnectionGuard {
    type Target = Endpoint;
    fn deref(&self) -> &Self::Target {
        &self.endpoint
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.endpoint.dec_connections();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn endpoint(max: usize) -> Arc<Endpoint> {
        Arc::new(Endpoint::new("web-1", "127.0.0.1:8080".parse().unwrap(), max))
    }

    #[test]
    fn test_guard_tracks_connections() {
        let ep = endpoint(2);
        let g1 = ep.try_acquire().unwrap();
        let _g2 = ep.try_acquire().unwrap();
        assert_eq!(ep.connections(), 2);
        assert!(ep.try_acquire().is_none());

        drop(g1);
        assert_eq!(ep.connections(), 1);
    }

    #[test]
    fn test_dec_does_not_underflow() {
        let ep = endpoint(1);
        ep.dec_connections();
        assert_eq!(ep.connections(), 0);
    }

    #[test]
    fn test_unknown_counts_as_healthy() {
        let ep = endpoint(1);
        let health = ep.healthy(&ProbeContext::new());
        assert!(health.healthy);
        assert_eq!(health.changed, UNIX_EPOCH);
    }

    #[test]
    fn test_set_healthy_records_change() {
        let ep = endpoint(1);
        ep.set_healthy(false);
        assert_eq!(ep.state(), HealthState::Unhealthy);

        let down = ep.healthy(&ProbeContext::new());
        assert!(!down.healthy);
        assert!(down.changed > UNIX_EPOCH);

        ep.set_healthy(true);
        let up = ep.healthy(&ProbeContext::new());
        assert!(up.healthy);
        assert!(up.changed >= down.changed);
    }

    #[test]
    fn test_health_read_is_consistent_with_change_time() {
        let ep = endpoint(1);
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            let ep = &ep;
            let done = &done;
            s.spawn(move || {
                ep.set_healthy(false);
                done.store(true, Ordering::Release);
            });

            loop {
                let finished = done.load(Ordering::Acquire);
                let health = ep.healthy(&ProbeContext::new());
                // Still Unknown exactly when no change has been recorded.
                assert_eq!(health.healthy, health.changed == UNIX_EPOCH);
                if finished {
                    break;
                }
            }
        });

        assert!(!ep.is_healthy());
    }

    #[test]
    fn test_set_healthy_same_state_keeps_timestamp() {
        let ep = endpoint(1);
        ep.set_healthy(false);
        let first = ep.healthy(&ProbeContext::new()).changed;
        ep.set_healthy(false);
        assert_eq!(ep.healthy(&ProbeContext::new()).changed, first);
    }
}

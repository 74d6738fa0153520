//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use leastconn::{Backend, Health, LeastConnDirector, ProbeContext, Target};
use leastconn::load_balancer::Endpoint;

/// Backend whose health and load are set directly by the test.
#[allow(dead_code)]
#[derive(Debug)]
pub struct StubBackend {
    name: String,
    state: Mutex<(bool, usize, SystemTime)>,
}

#[allow(dead_code)]
impl StubBackend {
    pub fn new(name: impl Into<String>, healthy: bool, connections: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new((healthy, connections, UNIX_EPOCH)),
        })
    }

    pub fn set_healthy(&self, healthy: bool, changed_secs: u64) {
        let mut state = self.state.lock().unwrap();
        state.0 = healthy;
        state.2 = UNIX_EPOCH + Duration::from_secs(changed_secs);
    }

    pub fn set_connections(&self, connections: usize) {
        self.state.lock().unwrap().1 = connections;
    }
}

impl Backend for StubBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn healthy(&self, _ctx: &ProbeContext) -> Health {
        let (healthy, _, changed) = *self.state.lock().unwrap();
        Health::new(healthy, changed)
    }

    fn connections(&self) -> usize {
        self.state.lock().unwrap().1
    }
}

/// Create a director and register every backend in order.
#[allow(dead_code)]
pub fn director_with<B: Backend + 'static>(name: &str, backends: &[Arc<B>]) -> Arc<LeastConnDirector> {
    let director = LeastConnDirector::new(name);
    for b in backends {
        director.add_backend(Target::backend(b)).unwrap();
    }
    director
}

/// Endpoint on a loopback port derived from `i`.
#[allow(dead_code)]
pub fn endpoint(i: usize) -> Arc<Endpoint> {
    let addr: SocketAddr = format!("127.0.0.1:{}", 20_000 + i).parse().unwrap();
    Arc::new(Endpoint::new(format!("ep-{}", i), addr, 1_000_000))
}

/// Name of the backend the director picks right now.
#[allow(dead_code)]
pub fn resolved_name(director: &LeastConnDirector) -> Option<String> {
    director
        .resolve(&ProbeContext::new())
        .map(|b| b.name().to_string())
}

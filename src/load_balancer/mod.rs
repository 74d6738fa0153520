//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Host setup:
//!     Target::backend(&arc) → least_conn.rs add_backend
//!         → reject dead references and composite targets
//!         → pool.rs push (copy snapshot, grow in chunks, swap)
//!
//! Per request:
//!     least_conn.rs resolve
//!         → pool.rs snapshot (no lock)
//!         → backend.rs healthy() / connections() per entry
//!         → fewest connections wins, ties go to the later entry
//!         → nothing healthy: first entry
//! ```
//!
//! # Design Decisions
//! - The pool holds `Weak` references; backends belong to the host
//! - Readers never block writers and never see a half-built pool
//! - Each backend guards its own counter; the pool lock is never held while reading it

pub mod backend;
pub mod least_conn;
pub mod pool;
pub mod target;

pub use backend::{Backend, ConnectionGuard, Endpoint, Health, HealthState, ProbeContext};
pub use least_conn::LeastConnDirector;
pub use pool::{BackendPool, Pushed, Snapshot, GROWTH_CHUNK};
pub use target::{Target, TargetKind};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Director operations produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → Whatever subscriber / recorder the host installs
//! ```
//!
//! # Design Decisions
//! - Structured logging with director and backend fields on every event
//! - Request ID from the probe context flows into resolve events
//! - Metrics are cheap and are no-ops until the host installs a recorder

pub mod logging;
pub mod metrics;

//! Metrics collection.
//!
//! # Metrics
//! - `leastconn_resolve_total` (counter): routing decisions by director, outcome
//! - `leastconn_backends` (gauge): pool size per director
//! - `leastconn_add_rejected_total` (counter): rejected additions by reason
//! - `leastconn_healthy` (gauge): 1=any backend healthy, 0=none
//!
//! Outcomes for `leastconn_resolve_total` are `selected`, `fallback` (nothing
//! healthy, first backend returned) and `empty`.
//!
//! Handles are registered once per director, against the recorder installed
//! at that time. Install the recorder before creating directors.

use std::fmt;
use ::metrics::{counter, gauge, Counter, Gauge};
use crate::error::DirectorError;

/// Outcome of one routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Selected,
    Fallback,
    Empty,
}

/// Metric handles for one director.
#[derive(Clone)]
pub struct DirectorMetrics {
    selected: Counter,
    fallback: Counter,
    empty: Counter,
    rejected_null: Counter,
    rejected_composite: Counter,
    backends: Gauge,
    healthy: Gauge,
}

impl DirectorMetrics {
    pub fn new(director: &str) -> Self {
        let resolve = |outcome: &'static str| {
            counter!(
                "leastconn_resolve_total",
                "director" => director.to_string(),
                "outcome" => outcome
            )
        };
        let rejected = |reason: &'static str| {
            counter!(
                "leastconn_add_rejected_total",
                "director" => director.to_string(),
                "reason" => reason
            )
        };

        Self {
            selected: resolve("selected"),
            fallback: resolve("fallback"),
            empty: resolve("empty"),
            rejected_null: rejected("null_backend"),
            rejected_composite: rejected("composite_target"),
            backends: gauge!("leastconn_backends", "director" => director.to_string()),
            healthy: gauge!("leastconn_healthy", "director" => director.to_string()),
        }
    }

    pub fn record_resolve(&self, outcome: ResolveOutcome) {
        match outcome {
            ResolveOutcome::Selected => self.selected.increment(1),
            ResolveOutcome::Fallback => self.fallback.increment(1),
            ResolveOutcome::Empty => self.empty.increment(1),
        }
    }

    pub fn record_pool_size(&self, backends: usize) {
        self.backends.set(backends as f64);
    }

    pub fn record_rejected(&self, error: &DirectorError) {
        match error {
            DirectorError::NullBackend { .. } => self.rejected_null.increment(1),
            DirectorError::NotABackend { .. } => self.rejected_composite.increment(1),
        }
    }

    pub fn record_healthy(&self, healthy: bool) {
        self.healthy.set(if healthy { 1.0 } else { 0.0 });
    }
}

impl fmt::Debug for DirectorMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::metrics::{
        with_local_recorder, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts handle registrations and hands out no-op handles.
    #[derive(Default)]
    struct Registrations(AtomicUsize);

    impl Recorder for Registrations {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            self.0.fetch_add(1, Ordering::Relaxed);
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            self.0.fetch_add(1, Ordering::Relaxed);
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            self.0.fetch_add(1, Ordering::Relaxed);
            Histogram::noop()
        }
    }

    #[test]
    fn test_handles_registered_once() {
        let recorder = Registrations::default();

        with_local_recorder(&recorder, || {
            let metrics = DirectorMetrics::new("web");
            assert_eq!(recorder.0.load(Ordering::Relaxed), 7);

            for _ in 0..1_000 {
                metrics.record_resolve(ResolveOutcome::Selected);
                metrics.record_resolve(ResolveOutcome::Fallback);
                metrics.record_healthy(true);
            }
            metrics.record_pool_size(3);
            metrics.record_rejected(&DirectorError::NullBackend {
                director: "web".into(),
            });
        });

        assert_eq!(recorder.0.load(Ordering::Relaxed), 7);
    }
}

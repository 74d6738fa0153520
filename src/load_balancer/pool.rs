//! Backend pool management.
//!
//! # Responsibilities
//! - Hold an ordered, growable list of non-owning backend references
//! - Serialize structural mutation (appends)
//! - Give readers a consistent snapshot without blocking on writers
//!
//! # Locking
//! Entries live in an immutable `Snapshot` behind an `ArcSwap`. Writers take
//! `writer`, copy the current snapshot into a new one (growing capacity in
//! fixed chunks when full), append, and swap. Readers load whatever snapshot
//! is current and keep it alive for as long as they iterate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::UNIX_EPOCH;
use arc_swap::{ArcSwap, Guard};
use crate::load_balancer::backend::{Backend, Health, ProbeContext};

/// Slots added each time a full pool grows.
pub const GROWTH_CHUNK: usize = 16;

/// An immutable view of the pool at one point in time.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Vec<Weak<dyn Backend>>,
    capacity: usize,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The backend at `index`, if the slot exists and the host still owns it.
    pub fn get(&self, index: usize) -> Option<Arc<dyn Backend>> {
        self.entries.get(index).and_then(Weak::upgrade)
    }

    /// Slot references in pool order. Dead references are kept in place.
    pub fn iter(&self) -> impl Iterator<Item = &Weak<dyn Backend>> {
        self.entries.iter()
    }
}

/// Where an appended reference landed, as seen in the snapshot that added it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pushed {
    pub index: usize,
    pub len: usize,
    pub capacity: usize,
}

/// Ordered collection of backend references shared by readers and writers.
#[derive(Debug)]
pub struct BackendPool {
    slots: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    growth: usize,
    grows: AtomicUsize,
}

impl BackendPool {
    /// Create an empty pool growing by `GROWTH_CHUNK` slots.
    pub fn new() -> Self {
        Self::with_growth(GROWTH_CHUNK)
    }

    /// Create an empty pool growing by `growth` slots at a time.
    pub fn with_growth(growth: usize) -> Self {
        assert!(growth > 0, "pool growth chunk must be non-zero");
        Self {
            slots: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
            growth,
            grows: AtomicUsize::new(0),
        }
    }

    /// Append a reference.
    pub fn push(&self, backend: Weak<dyn Backend>) -> Pushed {
        let _writer = self.writer.lock().expect("backend pool writer mutex poisoned");
        let current = self.slots.load();

        let mut capacity = current.capacity;
        if current.entries.len() >= capacity {
            capacity += self.growth;
            self.grows.fetch_add(1, Ordering::Relaxed);
        }
        debug_assert!(current.entries.len() < capacity);

        let mut entries = Vec::with_capacity(capacity);
        entries.extend(current.entries.iter().cloned());
        entries.push(backend);
        let pushed = Pushed {
            index: entries.len() - 1,
            len: entries.len(),
            capacity,
        };

        self.slots.store(Arc::new(Snapshot { entries, capacity }));
        pushed
    }

    /// Current snapshot; cheap, never blocks on writers.
    pub fn snapshot(&self) -> Guard<Arc<Snapshot>> {
        self.slots.load()
    }

    pub fn len(&self) -> usize {
        self.slots.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.load().capacity()
    }

    /// Times storage was reallocated to make room, not counting the first allocation.
    pub fn reallocations(&self) -> usize {
        self.grows.load(Ordering::Relaxed).saturating_sub(1)
    }

    /// Walk backends in order until one is healthy.
    ///
    /// The returned timestamp is the latest change seen among all backends
    /// visited, not only the healthy one. Backends dropped by the host are
    /// skipped.
    pub fn any_healthy(&self, ctx: &ProbeContext) -> Health {
        let snapshot = self.snapshot();
        let mut aggregate = Health::new(false, UNIX_EPOCH);

        for backend in snapshot.iter().filter_map(Weak::upgrade) {
            let health = backend.healthy(ctx);
            if health.changed > aggregate.changed {
                aggregate.changed = health.changed;
            }
            if health.healthy {
                aggregate.healthy = true;
                break;
            }
        }
        aggregate
    }

    /// Return a list of all live backends in pool order.
    pub fn all_backends(&self) -> Vec<Arc<dyn Backend>> {
        self.snapshot().iter().filter_map(Weak::upgrade).collect()
    }
}

impl Default for BackendPool {
    fn default() -> Self {
        Self::new()
    }
}

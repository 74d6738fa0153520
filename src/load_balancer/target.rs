//! Routing targets a host can hand to a director.

use std::fmt;
use std::sync::{Arc, Weak};
use crate::load_balancer::backend::Backend;
use crate::load_balancer::least_conn::LeastConnDirector;

/// Whether a target is a leaf backend or fans out to other backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Plain,
    Composite,
}

/// A non-owning handle to something requests can be routed to.
///
/// The host owns the referenced object; dropping the last `Arc` on the host
/// side invalidates every `Target` pointing at it.
#[derive(Clone)]
pub enum Target {
    /// A plain backend with its own connection counter.
    Backend(Weak<dyn Backend>),
    /// Another director.
    Director(Weak<LeastConnDirector>),
}

impl Target {
    /// Reference a host-owned backend without taking ownership.
    pub fn backend<B: Backend + 'static>(backend: &Arc<B>) -> Self {
        let backend: Arc<dyn Backend> = backend.clone();
        Target::Backend(Arc::downgrade(&backend))
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Backend(_) => TargetKind::Plain,
            Target::Director(_) => TargetKind::Composite,
        }
    }

    /// Name of the referenced object, if it is still alive.
    pub fn name(&self) -> Option<String> {
        match self {
            Target::Backend(weak) => weak.upgrade().map(|b| b.name().to_string()),
            Target::Director(weak) => weak.upgrade().map(|d| d.name().to_string()),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

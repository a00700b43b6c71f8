//! Directed, bus-addressed edges between nodes.

use crate::compat::{Arc, AtomicU64, Ordering, RwLock, Weak};
use crate::format::Format;
use crate::node::Node;
use crate::{Error, Result};

/// Stable identifier for a connection, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Endpoints {
    source: Weak<Node>,
    destination: Weak<Node>,
}

/// Edge from an output bus of one node to an input bus of another.
///
/// Bus indices and format are fixed at construction. The endpoint references are weak and can
/// only be cleared, after which the connection is inert.
///
/// Dropping the last owner touches neither node. The nodes' entries stop resolving at once and
/// are pruned the next time each node publishes a kernel.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    source_bus: u32,
    destination_bus: u32,
    format: Format,
    endpoints: RwLock<Endpoints>,
}

impl Connection {
    /// Build a connection. Fails with [`Error::NodeReleased`] if either endpoint is gone.
    ///
    /// The connection is not registered with either node; that is the caller's job.
    pub fn new(
        source: &Weak<Node>,
        source_bus: u32,
        destination: &Weak<Node>,
        destination_bus: u32,
        format: Format,
    ) -> Result<Arc<Self>> {
        if source.strong_count() == 0 || destination.strong_count() == 0 {
            return Err(Error::NodeReleased);
        }
        Ok(Arc::new(Self {
            id: ConnectionId::next(),
            source_bus,
            destination_bus,
            format,
            endpoints: RwLock::new(Endpoints {
                source: source.clone(),
                destination: destination.clone(),
            }),
        }))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn source_bus(&self) -> u32 {
        self.source_bus
    }

    pub fn destination_bus(&self) -> u32 {
        self.destination_bus
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn source_node(&self) -> Option<Arc<Node>> {
        self.endpoints.read().source.upgrade()
    }

    pub fn destination_node(&self) -> Option<Arc<Node>> {
        self.endpoints.read().destination.upgrade()
    }

    /// Both endpoints are still present.
    pub fn is_active(&self) -> bool {
        let endpoints = self.endpoints.read();
        endpoints.source.strong_count() > 0 && endpoints.destination.strong_count() > 0
    }

    pub fn remove_source(&self) {
        self.endpoints.write().source = Weak::new();
    }

    pub fn remove_destination(&self) {
        self.endpoints.write().destination = Weak::new();
    }

    /// Clear both endpoints in one critical section.
    pub fn remove_nodes(&self) {
        let mut endpoints = self.endpoints.write();
        endpoints.source = Weak::new();
        endpoints.destination = Weak::new();
    }

    pub(crate) fn source_is(&self, node: &Node) -> bool {
        core::ptr::eq(self.endpoints.read().source.as_ptr(), node)
    }

    pub(crate) fn destination_is(&self, node: &Node) -> bool {
        core::ptr::eq(self.endpoints.read().destination.as_ptr(), node)
    }

    pub(crate) fn touches(&self, node: &Node) -> bool {
        let endpoints = self.endpoints.read();
        core::ptr::eq(endpoints.source.as_ptr(), node)
            || core::ptr::eq(endpoints.destination.as_ptr(), node)
    }
}
